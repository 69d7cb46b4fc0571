//! Device-bound parameter set of an attentional encoder-decoder.

use super::layout::{Dl4mtLayout, GruLayout, ModelDims};
use crate::weights::ModelWeights;
use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use std::path::Path;

/// Parameters of one GRU transition.
#[derive(Debug, Clone, PartialEq)]
pub struct GruWeights {
    /// Input to reset/update gates, `[input, 2H]`.
    pub w: Array2<f32>,
    pub b: Array1<f32>,
    /// State to reset/update gates, `[H, 2H]`.
    pub u: Array2<f32>,
    /// Input to candidate state, `[input, H]`.
    pub wx: Array2<f32>,
    pub bx: Array1<f32>,
    /// State to candidate state, `[H, H]`.
    pub ux: Array2<f32>,
}

impl GruWeights {
    fn load(weights: &ModelWeights, layout: &GruLayout) -> Result<Self> {
        Ok(Self {
            w: weights.get_array2(&layout.w)?,
            b: weights.get_array1(&layout.b)?,
            u: weights.get_array2(&layout.u)?,
            wx: weights.get_array2(&layout.wx)?,
            bx: weights.get_array1(&layout.bx)?,
            ux: weights.get_array2(&layout.ux)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncoderWeights {
    pub embeddings: Array2<f32>,
    pub forward: GruWeights,
    pub backward: GruWeights,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttentionWeights {
    /// Context projection, `[C, A]`.
    pub context_w: Array2<f32>,
    pub b: Array1<f32>,
    /// Decoder state projection, `[H, A]`.
    pub state_w: Array2<f32>,
    /// Scoring vector, `[A, 1]`.
    pub u: Array2<f32>,
    pub c: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputWeights {
    pub state_w: Array2<f32>,
    pub state_b: Array1<f32>,
    pub prev_w: Array2<f32>,
    pub prev_b: Array1<f32>,
    pub ctx_w: Array2<f32>,
    pub ctx_b: Array1<f32>,
    /// Final projection onto the target vocabulary, `[E, V]`.
    pub w: Array2<f32>,
    pub b: Array1<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecoderWeights {
    pub embeddings: Array2<f32>,
    pub init_w: Array2<f32>,
    pub init_b: Array1<f32>,
    pub gru: GruWeights,
    pub attention: AttentionWeights,
    pub conditional_gru: GruWeights,
    pub output: OutputWeights,
}

/// Immutable parameters resident on one device.
///
/// Loaded once per device and shared by every scorer bound to it, so
/// nothing in here is ever mutated after [`Weights::load`] returns.
#[derive(Debug, Clone)]
pub struct Weights {
    device: usize,
    dims: ModelDims,
    pub encoder: EncoderWeights,
    pub decoder: DecoderWeights,
}

impl Weights {
    /// Reads and validates a dl4mt parameter file for `device`.
    pub fn load(path: &Path, device: usize) -> Result<Self> {
        let weights = ModelWeights::new(path)?;
        Self::from_model_weights(&weights, &Dl4mtLayout::dl4mt(), device)
    }

    pub fn from_model_weights(
        weights: &ModelWeights,
        layout: &Dl4mtLayout,
        device: usize,
    ) -> Result<Self> {
        let dims = layout.infer_dims(weights)?;
        layout
            .check_shapes(weights, &dims)
            .with_context(|| format!("Invalid parameter file {:?}", weights.path()))?;

        log::debug!(
            "Device {}: src_vocab={} trg_vocab={} emb={} hidden={} att={}",
            device,
            dims.src_vocab,
            dims.trg_vocab,
            dims.emb,
            dims.hidden,
            dims.att
        );

        let encoder = EncoderWeights {
            embeddings: weights.get_array2(&layout.src_embedding)?,
            forward: GruWeights::load(weights, &layout.encoder)?,
            backward: GruWeights::load(weights, &layout.encoder_reverse)?,
        };

        let attention = AttentionWeights {
            context_w: weights.get_array2(&layout.att_context_w)?,
            b: weights.get_array1(&layout.att_b)?,
            state_w: weights.get_array2(&layout.att_state_w)?,
            u: weights.get_array2(&layout.att_u)?,
            c: weights.get_array1(&layout.att_c)?[0],
        };

        let output = OutputWeights {
            state_w: weights.get_array2(&layout.logit_state_w)?,
            state_b: weights.get_array1(&layout.logit_state_b)?,
            prev_w: weights.get_array2(&layout.logit_prev_w)?,
            prev_b: weights.get_array1(&layout.logit_prev_b)?,
            ctx_w: weights.get_array2(&layout.logit_ctx_w)?,
            ctx_b: weights.get_array1(&layout.logit_ctx_b)?,
            w: weights.get_array2(&layout.logit_w)?,
            b: weights.get_array1(&layout.logit_b)?,
        };

        let decoder = DecoderWeights {
            embeddings: weights.get_array2(&layout.trg_embedding)?,
            init_w: weights.get_array2(&layout.init_state_w)?,
            init_b: weights.get_array1(&layout.init_state_b)?,
            gru: GruWeights::load(weights, &layout.decoder)?,
            attention,
            conditional_gru: GruWeights::load(weights, &layout.decoder_conditional)?,
            output,
        };

        Ok(Self { device, dims, encoder, decoder })
    }

    pub fn device(&self) -> usize {
        self.device
    }

    pub fn dims(&self) -> &ModelDims {
        &self.dims
    }
}
