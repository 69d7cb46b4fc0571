//! Hypothesis accessors consumed by `Scorer::assemble_beam_state`.
//!
//! Ranking and pruning belong to the search driver; the scorer only needs
//! each surviving hypothesis's chosen word and the state row it extends.

use std::sync::Arc;

/// One candidate continuation tracked by the search.
pub trait Hypothesis: Send + Sync {
    /// The output token chosen at this step.
    fn word(&self) -> u32;

    /// Row of the previous decode state this hypothesis extends.
    fn prev_state_index(&self) -> usize;
}

pub type HypothesisPtr = Arc<dyn Hypothesis>;

/// The ordered hypotheses kept at one step.
pub type Beam = Vec<HypothesisPtr>;

/// Plain hypothesis record for drivers that don't need their own type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamEntry {
    pub word: u32,
    pub prev_state_index: usize,
    pub cost: f32,
}

impl BeamEntry {
    pub fn new(word: u32, prev_state_index: usize, cost: f32) -> Self {
        Self {
            word,
            prev_state_index,
            cost,
        }
    }

    pub fn into_ptr(self) -> HypothesisPtr {
        Arc::new(self)
    }
}

impl Hypothesis for BeamEntry {
    fn word(&self) -> u32 {
        self.word
    }

    fn prev_state_index(&self) -> usize {
        self.prev_state_index
    }
}

/// Builds a beam from parallel word and backpointer lists.
///
/// # Panics
/// Panics if the two lists have different lengths.
pub fn beam_from_parts(words: &[u32], backpointers: &[usize]) -> Beam {
    assert_eq!(
        words.len(),
        backpointers.len(),
        "words ({}) and backpointers ({}) must have the same length",
        words.len(),
        backpointers.len()
    );
    words
        .iter()
        .zip(backpointers)
        .map(|(&w, &p)| BeamEntry::new(w, p, 0.0).into_ptr())
        .collect()
}
