//! String distance algorithms for fuzzy matching

/// Edit distance between two strings, counted in chars.
///
/// Keeps one row sized to the shorter string.
pub fn distance(a: &str, b: &str) -> usize {
    let (long, short) = if a.chars().count() >= b.chars().count() { (a, b) } else { (b, a) };
    let short: Vec<char> = short.chars().collect();

    // row[j]: edits between the part of `long` consumed so far and short[..j].
    let mut row: Vec<usize> = (0..=short.len()).collect();
    for (i, lc) in long.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &sc) in short.iter().enumerate() {
            let substitute = diagonal + usize::from(lc != sc);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(diagonal + 1).min(row[j] + 1);
        }
    }
    row[short.len()]
}

/// Normalized similarity between two strings, 1.0 for identical strings.
pub fn similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (distance(a, b) as f32 / max_len as f32)
}

/// Best matches for `query` among `candidates`, most similar first.
///
/// Comparison is case-insensitive. At most `limit` entries with a similarity
/// of at least `threshold` are returned.
pub fn find_similar(query: &str, candidates: &[&str], limit: usize, threshold: f32) -> Vec<(String, f32)> {
    let query = query.to_lowercase();
    let mut scored: Vec<(String, f32)> = candidates
        .iter()
        .map(|c| (c.to_string(), similarity(&query, &c.to_lowercase())))
        .filter(|(_, score)| *score >= threshold)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}
