//! Attentional GRU encoder-decoder (dl4mt/Nematus family) on the CPU.
//!
//! This is the network runtime behind the `EncoderDecoder` scorer: an
//! [`Encoder`] that turns a source sentence into a context matrix, and a
//! [`Decoder`] that advances one step for every live hypothesis at once.
//! Both read from a shared, immutable [`Weights`] instance bound to one
//! device.

mod decoder;
mod encoder;
mod gru;
mod layout;
mod traits;
mod weights;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use layout::{Dl4mtLayout, GruLayout, ModelDims};
pub use traits::{DecoderOps, DecoderStepOutput, EncoderOps};
pub use weights::{AttentionWeights, DecoderWeights, EncoderWeights, GruWeights, OutputWeights, Weights};
