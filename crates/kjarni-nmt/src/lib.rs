//! Kjarni NMT: beam-search scoring for attentional encoder-decoder models
//!
//! Loads dl4mt/Nematus parameter files onto one or more devices, and drives
//! them one decoding step at a time for every live hypothesis in a beam.

pub mod beam;
pub mod config;
pub mod error;
pub mod model;
pub mod scorer;
pub mod sentence;
pub mod tensor;
pub mod utils;
pub mod weights;

pub use crate::{
    beam::{Beam, BeamEntry, Hypothesis, HypothesisPtr},
    config::{DecoderConfig, ScorerConfig},
    error::{ScorerError, ScorerResult},
    model::{Weights, DecoderOps, EncoderOps},
    scorer::{
        DecodeState, EncoderDecoder, EncoderDecoderLoader, EncoderDecoderState, Loader,
        LoaderRegistry, Scorer,
    },
    sentence::Sentence,
};

pub mod prelude {
    pub use crate::beam::{BeamEntry, Hypothesis, HypothesisPtr};
    pub use crate::scorer::{DecodeState, Loader, LoaderRegistry, Scorer};
    pub use crate::sentence::Sentence;
}

#[cfg(test)]
pub mod tests;
