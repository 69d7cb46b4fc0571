//! Beam search over every scorer in a decoder config.
//!
//! ```text
//! cargo run --example score -- config.json "5 9 2" 4
//! ```

use anyhow::{anyhow, Result};
use kjarni_nmt::{
    BeamEntry, DecodeState, DecoderConfig, HypothesisPtr, LoaderRegistry, Scorer, Sentence,
};
use ndarray::Array2;
use std::path::PathBuf;

const EOS: u32 = 2;

struct Hyp {
    words: Vec<u32>,
    cost: f32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(
        args.next()
            .ok_or_else(|| anyhow!("usage: score <config.json> [\"5 9 2\"] [beam-size]"))?,
    );
    let line = args.next().unwrap_or_else(|| "5 9 2".to_string());
    let beam_size: usize = args.next().map(|s| s.parse::<usize>()).transpose()?.unwrap_or(4).max(1);

    let config = DecoderConfig::from_file(&config_path)?;
    let mut loaders = LoaderRegistry::with_defaults().create_all(&config)?;
    for loader in loaders.iter_mut() {
        loader.load()?;
    }
    // Parameters are copied out on load; the mappings are no longer needed.
    kjarni_nmt::weights::clear_mmap_cache();

    let mut scorers: Vec<Box<dyn Scorer>> = loaders
        .iter()
        .map(|l| l.new_scorer(0))
        .collect::<Result<_, _>>()?;

    let sentence = Sentence::from_ids_line(0, &line)?;
    let mut states: Vec<Box<dyn DecodeState>> = Vec::with_capacity(scorers.len());
    for scorer in scorers.iter_mut() {
        scorer.set_source(&sentence)?;
        let mut state = scorer.new_state();
        scorer.begin_sentence_state(state.as_mut())?;
        states.push(state);
    }

    let max_len = 3 * sentence.words(0)?.len();
    let mut alive = vec![Hyp { words: Vec::new(), cost: 0.0 }];
    let mut finished: Vec<Hyp> = Vec::new();

    for _ in 0..max_len {
        // Weighted sum of negative log-probabilities across scorers.
        let mut costs: Option<Array2<f32>> = None;
        let mut stepped = Vec::with_capacity(scorers.len());
        for (scorer, state) in scorers.iter_mut().zip(&states) {
            let mut probs = Array2::zeros((0, 0));
            let mut next = scorer.new_state();
            scorer.score(state.as_ref(), &mut probs, next.as_mut())?;
            let weighted = probs.mapv(|p| -scorer.weight() * p.max(f32::MIN_POSITIVE).ln());
            costs = Some(match costs {
                Some(total) => total + weighted,
                None => weighted,
            });
            stepped.push(next);
        }
        let costs = costs.ok_or_else(|| anyhow!("no scorers configured"))?;

        let mut candidates: Vec<(usize, u32, f32)> = costs
            .indexed_iter()
            .map(|((row, word), &c)| (row, word as u32, alive[row].cost + c))
            .collect();
        candidates.sort_by(|a, b| a.2.total_cmp(&b.2));
        candidates.truncate(beam_size - finished.len().min(beam_size - 1));

        let mut beam: Vec<HypothesisPtr> = Vec::new();
        let mut next_alive = Vec::new();
        for (row, word, cost) in candidates {
            let mut words = alive[row].words.clone();
            words.push(word);
            if word == EOS {
                finished.push(Hyp { words, cost });
            } else {
                beam.push(BeamEntry::new(word, row, cost).into_ptr());
                next_alive.push(Hyp { words, cost });
            }
        }
        if beam.is_empty() || finished.len() >= beam_size {
            alive = next_alive;
            break;
        }

        for ((scorer, state), prev) in scorers.iter().zip(states.iter_mut()).zip(&stepped) {
            scorer.assemble_beam_state(prev.as_ref(), &beam, state.as_mut())?;
        }
        alive = next_alive;
    }

    finished.extend(alive);
    finished.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    for hyp in finished.iter().take(beam_size) {
        let ids: Vec<String> = hyp.words.iter().map(u32::to_string).collect();
        println!("{:>8.4}  {}", hyp.cost, ids.join(" "));
    }
    Ok(())
}
