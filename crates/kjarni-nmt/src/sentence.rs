//! Source sentences as seen by the scorers.

use crate::error::{ScorerError, ScorerResult};

/// Separator between parallel input streams in a text line.
pub const TAB_SEPARATOR: &str = "|||";

/// One input sentence, possibly carrying several parallel token streams
/// ("tabs"). Each scorer encodes the stream selected by its `tab` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    id: usize,
    tabs: Vec<Vec<u32>>,
}

impl Sentence {
    pub fn new(id: usize, tabs: Vec<Vec<u32>>) -> Self {
        Self { id, tabs }
    }

    /// A sentence with a single token stream.
    pub fn from_words(id: usize, words: Vec<u32>) -> Self {
        Self::new(id, vec![words])
    }

    /// Parses a line of whitespace-separated token ids, with parallel
    /// streams separated by `|||`, e.g. `"5 9 2 ||| 7 2"`.
    pub fn from_ids_line(id: usize, line: &str) -> ScorerResult<Self> {
        let tabs = line
            .split(TAB_SEPARATOR)
            .map(|tab| {
                tab.split_whitespace()
                    .map(|tok| {
                        tok.parse::<u32>().map_err(|_| {
                            ScorerError::InvalidInput(format!(
                                "sentence {}: '{}' is not a token id",
                                id, tok
                            ))
                        })
                    })
                    .collect::<ScorerResult<Vec<u32>>>()
            })
            .collect::<ScorerResult<Vec<_>>>()?;
        Ok(Self::new(id, tabs))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn num_tabs(&self) -> usize {
        self.tabs.len()
    }

    /// Token ids of input stream `tab`.
    pub fn words(&self, tab: usize) -> ScorerResult<&[u32]> {
        self.tabs.get(tab).map(Vec::as_slice).ok_or_else(|| {
            ScorerError::InvalidInput(format!(
                "sentence {} has {} input stream(s), tab {} requested",
                self.id,
                self.tabs.len(),
                tab
            ))
        })
    }
}
