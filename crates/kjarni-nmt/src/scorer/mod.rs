//! The step/score/assemble protocol driven by beam search.
//!
//! A [`Loader`] owns one [`Weights`](crate::model::Weights) per device and
//! hands out [`Scorer`]s bound to them. Each scorer keeps its own source
//! context and works on [`DecodeState`]s, one row per live hypothesis.

mod encoder_decoder;
mod loader;
mod registry;

pub use encoder_decoder::{EncoderDecoder, EncoderDecoderState, ScorerPhase};
pub use loader::EncoderDecoderLoader;
pub use registry::{LoaderFactory, LoaderRegistry};

use crate::beam::HypothesisPtr;
use crate::error::{ScorerError, ScorerResult};
use crate::sentence::Sentence;
use ndarray::Array2;
use std::any::Any;

/// Type-erased per-hypothesis recurrent state for one sentence.
pub trait DecodeState: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Number of live hypotheses this state holds rows for.
    fn num_rows(&self) -> usize;
    /// True when every tensor in the state has the same, non-zero row count.
    fn is_well_formed(&self) -> bool;
    fn clone_box(&self) -> Box<dyn DecodeState>;
}

/// One model instance bound to one device, driven one step at a time.
///
/// Calls must follow `set_source` -> `begin_sentence_state` -> repeated
/// `score`/`assemble_beam_state`. `set_source` may be called again to
/// start the next sentence.
pub trait Scorer: Send {
    fn name(&self) -> &str;

    /// Device whose weights this scorer reads.
    fn device(&self) -> usize;

    /// Log-linear weight the search applies to this scorer's costs.
    fn weight(&self) -> f32;

    /// Encodes the sentence and replaces the source context.
    fn set_source(&mut self, source: &Sentence) -> ScorerResult<()>;

    fn new_state(&self) -> Box<dyn DecodeState>;

    /// Resets `state` to the single start hypothesis.
    fn begin_sentence_state(&mut self, state: &mut dyn DecodeState) -> ScorerResult<()>;

    /// Advances every row of `in_state` by one step.
    ///
    /// `out_prob` receives one distribution per row and `out_state` the new
    /// recurrent state. `in_state` is left untouched.
    fn score(
        &mut self,
        in_state: &dyn DecodeState,
        out_prob: &mut Array2<f32>,
        out_state: &mut dyn DecodeState,
    ) -> ScorerResult<()>;

    /// Gathers the rows of `in_state` the surviving hypotheses extend, in
    /// beam order, and embeds each hypothesis's chosen word.
    fn assemble_beam_state(
        &self,
        in_state: &dyn DecodeState,
        beam: &[HypothesisPtr],
        out_state: &mut dyn DecodeState,
    ) -> ScorerResult<()>;

    /// Copies the most recent step's attention weights into `out`.
    fn attention(&self, out: &mut Array2<f32>) -> ScorerResult<()>;

    /// Full output vocabulary size.
    fn vocab_size(&self) -> usize;

    /// Restricts subsequent steps to `ids`; an empty slice lifts the
    /// restriction.
    fn filter(&mut self, ids: &[usize]) -> ScorerResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Loads parameters onto every configured device and creates scorers.
pub trait Loader: Send + Sync {
    fn name(&self) -> &str;

    /// Loads one weight set per device in parallel. Blocks until every
    /// device has finished; any failure leaves the loader unloaded.
    fn load(&mut self) -> ScorerResult<()>;

    /// A fresh scorer on device `task_id mod num_loaded_devices`.
    fn new_scorer(&self, task_id: usize) -> ScorerResult<Box<dyn Scorer>>;

    /// Number of configured devices.
    fn num_devices(&self) -> usize;

    fn is_loaded(&self) -> bool;

    /// Device a scorer for `task_id` would be bound to.
    fn device_for_task(&self, task_id: usize) -> ScorerResult<usize>;
}

pub fn downcast_state<T: DecodeState + 'static>(state: &dyn DecodeState) -> ScorerResult<&T> {
    state.as_any().downcast_ref::<T>().ok_or_else(|| {
        ScorerError::InvalidState(format!(
            "expected a {} decode state",
            std::any::type_name::<T>()
        ))
    })
}

pub fn downcast_state_mut<T: DecodeState + 'static>(
    state: &mut dyn DecodeState,
) -> ScorerResult<&mut T> {
    state.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
        ScorerError::InvalidState(format!(
            "expected a {} decode state",
            std::any::type_name::<T>()
        ))
    })
}
