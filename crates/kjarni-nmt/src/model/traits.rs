//! Network runtime seams used by the encoder-decoder scorer.

use anyhow::Result;
use ndarray::{Array2, ArrayView2};
use std::any::Any;

/// Result of one decoder step for a batch of hypotheses.
#[derive(Debug, Clone)]
pub struct DecoderStepOutput {
    /// New recurrent state, one row per input row.
    pub states: Array2<f32>,
    /// Output distribution, one row per input row. Columns cover the full
    /// vocabulary, or only the filtered ids when a filter is active.
    pub probs: Array2<f32>,
}

pub trait EncoderOps: Send + Sync {
    /// Encodes a token sequence into a `[seq_len, context_size]` matrix.
    fn encode(&self, words: &[u32]) -> Result<Array2<f32>>;

    /// Source vocabulary size.
    fn vocab_size(&self) -> usize;

    /// Width of each context row.
    fn context_size(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
}

pub trait DecoderOps: Send {
    /// Initial recurrent state for `batch_size` rows, derived from the
    /// source context. Also prepares any per-sentence attention caches.
    fn empty_state(&mut self, context: &Array2<f32>, batch_size: usize) -> Result<Array2<f32>>;

    /// Embedding rows standing for "no previous word".
    fn empty_embedding(&self, batch_size: usize) -> Array2<f32>;

    /// Advances every row by one step. Row *i* of the output depends only
    /// on row *i* of the inputs and the shared context.
    fn make_step(
        &mut self,
        prev_states: ArrayView2<'_, f32>,
        prev_embeddings: ArrayView2<'_, f32>,
        context: &Array2<f32>,
    ) -> Result<DecoderStepOutput>;

    /// Target embeddings for `words`, one row per word.
    fn lookup(&self, words: &[u32]) -> Result<Array2<f32>>;

    /// Attention weights of the most recent step, `[rows, src_len]`.
    fn attention(&self) -> &Array2<f32>;

    /// Restricts the output layer to `ids`; an empty list removes the
    /// restriction.
    fn filter(&mut self, ids: &[usize]) -> Result<()>;

    fn filtered_ids(&self) -> Option<&[usize]>;

    /// Full target vocabulary size, regardless of filtering.
    fn vocab_size(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
}
