use super::traits::EncoderOps;
use super::weights::Weights;
use anyhow::{bail, Result};
use ndarray::{s, Array2, Axis};
use std::any::Any;
use std::sync::Arc;

/// Bidirectional GRU encoder.
///
/// Row *t* of the context is the forward state after reading token *t*
/// concatenated with the backward state after reading token *t* from the
/// right.
pub struct Encoder {
    weights: Arc<Weights>,
}

impl Encoder {
    pub fn new(weights: Arc<Weights>) -> Self {
        Self { weights }
    }
}

impl EncoderOps for Encoder {
    fn encode(&self, words: &[u32]) -> Result<Array2<f32>> {
        if words.is_empty() {
            bail!("Cannot encode an empty sentence");
        }
        let vocab = self.vocab_size();
        let mut ids = Vec::with_capacity(words.len());
        for &w in words {
            if w as usize >= vocab {
                bail!("Source token {} out of range for vocabulary of {}", w, vocab);
            }
            ids.push(w as usize);
        }

        let enc = &self.weights.encoder;
        let hidden = enc.forward.hidden_size();
        let embedded = enc.embeddings.select(Axis(0), &ids);
        let len = ids.len();

        let mut context = Array2::<f32>::zeros((len, 2 * hidden));

        let mut state = Array2::<f32>::zeros((1, hidden));
        for t in 0..len {
            state = enc.forward.step(embedded.slice(s![t..t + 1, ..]), state.view());
            context.slice_mut(s![t, ..hidden]).assign(&state.row(0));
        }

        let mut state = Array2::<f32>::zeros((1, hidden));
        for t in (0..len).rev() {
            state = enc.backward.step(embedded.slice(s![t..t + 1, ..]), state.view());
            context.slice_mut(s![t, hidden..]).assign(&state.row(0));
        }

        Ok(context)
    }

    fn vocab_size(&self) -> usize {
        self.weights.dims().src_vocab
    }

    fn context_size(&self) -> usize {
        self.weights.dims().context()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
