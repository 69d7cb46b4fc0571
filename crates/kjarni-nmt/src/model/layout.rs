//! Tensor naming and shape templates for dl4mt-style parameter files.

use crate::weights::ModelWeights;
use anyhow::{anyhow, ensure, Result};

/// Sizes that fully determine every parameter shape of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDims {
    pub src_vocab: usize,
    pub trg_vocab: usize,
    pub emb: usize,
    pub hidden: usize,
    pub att: usize,
}

impl ModelDims {
    /// Width of an encoder context row (forward and backward states side by side).
    pub fn context(&self) -> usize {
        2 * self.hidden
    }
}

/// Naming templates for one GRU transition.
#[derive(Debug, Clone)]
pub struct GruLayout {
    pub w: String,
    pub b: String,
    pub u: String,
    pub wx: String,
    pub bx: String,
    pub ux: String,
}

impl GruLayout {
    /// Plain GRU: `{prefix}_W`, `{prefix}_b`, `{prefix}_U`, `{prefix}_Wx`, ...
    pub fn plain(prefix: &str) -> Self {
        Self {
            w: format!("{prefix}_W"),
            b: format!("{prefix}_b"),
            u: format!("{prefix}_U"),
            wx: format!("{prefix}_Wx"),
            bx: format!("{prefix}_bx"),
            ux: format!("{prefix}_Ux"),
        }
    }

    /// Second transition of a conditional GRU, fed by the attended context.
    pub fn conditional(prefix: &str) -> Self {
        Self {
            w: format!("{prefix}_Wc"),
            b: format!("{prefix}_b_nl"),
            u: format!("{prefix}_U_nl"),
            wx: format!("{prefix}_Wcx"),
            bx: format!("{prefix}_bx_nl"),
            ux: format!("{prefix}_Ux_nl"),
        }
    }

    fn shapes(&self, input: usize, hidden: usize) -> Vec<(String, Vec<usize>)> {
        vec![
            (self.w.clone(), vec![input, 2 * hidden]),
            (self.b.clone(), vec![2 * hidden]),
            (self.u.clone(), vec![hidden, 2 * hidden]),
            (self.wx.clone(), vec![input, hidden]),
            (self.bx.clone(), vec![hidden]),
            (self.ux.clone(), vec![hidden, hidden]),
        ]
    }
}

/// Every tensor name the encoder-decoder reads.
#[derive(Debug, Clone)]
pub struct Dl4mtLayout {
    pub src_embedding: String,
    pub encoder: GruLayout,
    pub encoder_reverse: GruLayout,

    pub trg_embedding: String,
    pub init_state_w: String,
    pub init_state_b: String,
    pub decoder: GruLayout,
    pub att_context_w: String,
    pub att_b: String,
    pub att_state_w: String,
    pub att_u: String,
    pub att_c: String,
    pub decoder_conditional: GruLayout,

    pub logit_state_w: String,
    pub logit_state_b: String,
    pub logit_prev_w: String,
    pub logit_prev_b: String,
    pub logit_ctx_w: String,
    pub logit_ctx_b: String,
    pub logit_w: String,
    pub logit_b: String,
}

impl Default for Dl4mtLayout {
    fn default() -> Self {
        Self::dl4mt()
    }
}

impl Dl4mtLayout {
    /// Names as written by dl4mt and early Nematus.
    pub fn dl4mt() -> Self {
        Self {
            src_embedding: "Wemb".into(),
            encoder: GruLayout::plain("encoder"),
            encoder_reverse: GruLayout::plain("encoder_r"),

            trg_embedding: "Wemb_dec".into(),
            init_state_w: "ff_state_W".into(),
            init_state_b: "ff_state_b".into(),
            decoder: GruLayout::plain("decoder"),
            att_context_w: "decoder_Wc_att".into(),
            att_b: "decoder_b_att".into(),
            att_state_w: "decoder_W_comb_att".into(),
            att_u: "decoder_U_att".into(),
            att_c: "decoder_c_tt".into(),
            decoder_conditional: GruLayout::conditional("decoder"),

            logit_state_w: "ff_logit_lstm_W".into(),
            logit_state_b: "ff_logit_lstm_b".into(),
            logit_prev_w: "ff_logit_prev_W".into(),
            logit_prev_b: "ff_logit_prev_b".into(),
            logit_ctx_w: "ff_logit_ctx_W".into(),
            logit_ctx_b: "ff_logit_ctx_b".into(),
            logit_w: "ff_logit_W".into(),
            logit_b: "ff_logit_b".into(),
        }
    }

    /// Expected shape of every parameter for the given sizes.
    pub fn expected_shapes(&self, dims: &ModelDims) -> Vec<(String, Vec<usize>)> {
        let ModelDims { src_vocab, trg_vocab, emb, hidden, att } = *dims;
        let ctx = dims.context();

        let mut shapes = vec![(self.src_embedding.clone(), vec![src_vocab, emb])];
        shapes.extend(self.encoder.shapes(emb, hidden));
        shapes.extend(self.encoder_reverse.shapes(emb, hidden));

        shapes.push((self.trg_embedding.clone(), vec![trg_vocab, emb]));
        shapes.push((self.init_state_w.clone(), vec![ctx, hidden]));
        shapes.push((self.init_state_b.clone(), vec![hidden]));
        shapes.extend(self.decoder.shapes(emb, hidden));
        shapes.push((self.att_context_w.clone(), vec![ctx, att]));
        shapes.push((self.att_b.clone(), vec![att]));
        shapes.push((self.att_state_w.clone(), vec![hidden, att]));
        shapes.push((self.att_u.clone(), vec![att, 1]));
        shapes.push((self.att_c.clone(), vec![1]));
        shapes.extend(self.decoder_conditional.shapes(ctx, hidden));

        shapes.push((self.logit_state_w.clone(), vec![hidden, emb]));
        shapes.push((self.logit_state_b.clone(), vec![emb]));
        shapes.push((self.logit_prev_w.clone(), vec![emb, emb]));
        shapes.push((self.logit_prev_b.clone(), vec![emb]));
        shapes.push((self.logit_ctx_w.clone(), vec![ctx, emb]));
        shapes.push((self.logit_ctx_b.clone(), vec![emb]));
        shapes.push((self.logit_w.clone(), vec![emb, trg_vocab]));
        shapes.push((self.logit_b.clone(), vec![trg_vocab]));
        shapes
    }

    /// Reads the model sizes off the embedding and attention matrices.
    pub fn infer_dims(&self, weights: &ModelWeights) -> Result<ModelDims> {
        let src = matrix_shape(weights, &self.src_embedding)?;
        let trg = matrix_shape(weights, &self.trg_embedding)?;
        let ux = matrix_shape(weights, &self.encoder.ux)?;
        let att = matrix_shape(weights, &self.att_context_w)?;
        Ok(ModelDims {
            src_vocab: src[0],
            trg_vocab: trg[0],
            emb: src[1],
            hidden: ux[0],
            att: att[1],
        })
    }

    /// Fails with the first missing or mis-shaped parameter.
    pub fn check_shapes(&self, weights: &ModelWeights, dims: &ModelDims) -> Result<()> {
        for (name, expected) in self.expected_shapes(dims) {
            ensure!(weights.contains(&name), "Missing parameter '{}'", name);
            let actual = weights.tensor_shape(&name)?;
            ensure!(
                actual == expected,
                "Parameter '{}' has shape {:?}, expected {:?}",
                name,
                actual,
                expected
            );
        }
        Ok(())
    }
}

fn matrix_shape(weights: &ModelWeights, name: &str) -> Result<[usize; 2]> {
    if !weights.contains(name) {
        return Err(anyhow!("Missing parameter '{}'", name));
    }
    match weights.tensor_shape(name)?.as_slice() {
        [rows, cols] => Ok([*rows, *cols]),
        other => Err(anyhow!("Parameter '{}' should be a matrix, got shape {:?}", name, other)),
    }
}
