use super::traits::{DecoderOps, DecoderStepOutput};
use super::weights::Weights;
use crate::utils::{softmax_1d_inplace, softmax_rows_inplace};
use anyhow::{anyhow, bail, ensure, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::any::Any;
use std::sync::Arc;

/// Output projection restricted to a subset of the vocabulary.
struct OutputFilter {
    ids: Vec<usize>,
    w: Array2<f32>,
    b: Array1<f32>,
}

/// Conditional GRU decoder with additive attention.
///
/// One step runs a GRU over the previous word, attends over the source
/// context with the intermediate state, runs a second GRU over the attended
/// context, and projects onto the target vocabulary.
pub struct Decoder {
    weights: Arc<Weights>,
    /// `context · Wc_att + b_att`, computed once per sentence.
    projected_context: Option<Array2<f32>>,
    attention: Array2<f32>,
    filter: Option<OutputFilter>,
}

impl Decoder {
    pub fn new(weights: Arc<Weights>) -> Self {
        Self {
            weights,
            projected_context: None,
            attention: Array2::zeros((0, 0)),
            filter: None,
        }
    }

    fn hidden_size(&self) -> usize {
        self.weights.dims().hidden
    }

    /// Returns the attended context `[n, C]` and the alignment `[n, S]`.
    fn attend(
        &self,
        states: &Array2<f32>,
        projected: &Array2<f32>,
        context: &Array2<f32>,
    ) -> (Array2<f32>, Array2<f32>) {
        let att = &self.weights.decoder.attention;
        let projected_states = states.dot(&att.state_w);
        let u = att.u.column(0);

        let mut alignment = Array2::<f32>::zeros((states.nrows(), context.nrows()));
        for (i, mut row) in alignment.axis_iter_mut(Axis(0)).enumerate() {
            let energy = (projected + &projected_states.row(i)).mapv(f32::tanh);
            let mut scores = energy.dot(&u) + att.c;
            softmax_1d_inplace(&mut scores);
            row.assign(&scores);
        }

        (alignment.dot(context), alignment)
    }

    fn output_probs(
        &self,
        states: &Array2<f32>,
        prev_embeddings: ArrayView2<'_, f32>,
        attended: &Array2<f32>,
    ) -> Array2<f32> {
        let out = &self.weights.decoder.output;
        let mut hidden = states.dot(&out.state_w)
            + &out.state_b
            + prev_embeddings.dot(&out.prev_w)
            + &out.prev_b
            + attended.dot(&out.ctx_w)
            + &out.ctx_b;
        hidden.mapv_inplace(f32::tanh);

        let mut logits = match &self.filter {
            Some(f) => hidden.dot(&f.w) + &f.b,
            None => hidden.dot(&out.w) + &out.b,
        };
        softmax_rows_inplace(&mut logits);
        logits
    }
}

impl DecoderOps for Decoder {
    fn empty_state(&mut self, context: &Array2<f32>, batch_size: usize) -> Result<Array2<f32>> {
        let dims = *self.weights.dims();
        ensure!(
            context.ncols() == dims.context(),
            "Context width {} does not match model context size {}",
            context.ncols(),
            dims.context()
        );
        let mean = context
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow!("Cannot derive a start state from an empty context"))?;

        let dec = &self.weights.decoder;
        let init = (mean.dot(&dec.init_w) + &dec.init_b).mapv(f32::tanh);

        let att = &dec.attention;
        self.projected_context = Some(context.dot(&att.context_w) + &att.b);
        self.attention = Array2::zeros((0, context.nrows()));

        Ok(Array2::from_shape_fn((batch_size, dims.hidden), |(_, j)| init[j]))
    }

    fn empty_embedding(&self, batch_size: usize) -> Array2<f32> {
        Array2::zeros((batch_size, self.weights.dims().emb))
    }

    fn make_step(
        &mut self,
        prev_states: ArrayView2<'_, f32>,
        prev_embeddings: ArrayView2<'_, f32>,
        context: &Array2<f32>,
    ) -> Result<DecoderStepOutput> {
        let dims = *self.weights.dims();
        ensure!(
            prev_states.nrows() == prev_embeddings.nrows(),
            "State has {} rows but embeddings have {}",
            prev_states.nrows(),
            prev_embeddings.nrows()
        );
        ensure!(
            prev_states.ncols() == self.hidden_size() && prev_embeddings.ncols() == dims.emb,
            "State/embedding widths {}/{} do not match model {}/{}",
            prev_states.ncols(),
            prev_embeddings.ncols(),
            dims.hidden,
            dims.emb
        );
        let projected = self
            .projected_context
            .as_ref()
            .ok_or_else(|| anyhow!("Decoder has no source context; call empty_state first"))?;
        ensure!(
            projected.nrows() == context.nrows(),
            "Context has {} rows but the decoder was prepared for {}",
            context.nrows(),
            projected.nrows()
        );

        let dec = &self.weights.decoder;
        let intermediate = dec.gru.step(prev_embeddings, prev_states);
        let (attended, alignment) = self.attend(&intermediate, projected, context);
        let states = dec.conditional_gru.step(attended.view(), intermediate.view());
        let probs = self.output_probs(&states, prev_embeddings, &attended);

        self.attention = alignment;
        Ok(DecoderStepOutput { states, probs })
    }

    fn lookup(&self, words: &[u32]) -> Result<Array2<f32>> {
        let vocab = self.vocab_size();
        let mut ids = Vec::with_capacity(words.len());
        for &w in words {
            if w as usize >= vocab {
                bail!("Target token {} out of range for vocabulary of {}", w, vocab);
            }
            ids.push(w as usize);
        }
        Ok(self.weights.decoder.embeddings.select(Axis(0), &ids))
    }

    fn attention(&self) -> &Array2<f32> {
        &self.attention
    }

    fn filter(&mut self, ids: &[usize]) -> Result<()> {
        if ids.is_empty() {
            self.filter = None;
            return Ok(());
        }
        let vocab = self.vocab_size();
        if let Some(&bad) = ids.iter().find(|&&id| id >= vocab) {
            bail!("Filter id {} out of range for vocabulary of {}", bad, vocab);
        }
        let out = &self.weights.decoder.output;
        self.filter = Some(OutputFilter {
            ids: ids.to_vec(),
            w: out.w.select(Axis(1), ids),
            b: out.b.select(Axis(0), ids),
        });
        Ok(())
    }

    fn filtered_ids(&self) -> Option<&[usize]> {
        self.filter.as_ref().map(|f| f.ids.as_slice())
    }

    fn vocab_size(&self) -> usize {
        self.weights.dims().trg_vocab
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
