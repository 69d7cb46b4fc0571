use super::{downcast_state, downcast_state_mut, DecodeState, Scorer};
use crate::beam::HypothesisPtr;
use crate::error::{ScorerError, ScorerResult};
use crate::model::{Decoder, DecoderOps, Encoder, EncoderOps, ModelDims, Weights};
use crate::sentence::Sentence;
use crate::utils::assemble_rows;
use ndarray::Array2;
use std::any::Any;
use std::sync::Arc;

/// Hidden states and previous-word embeddings, row *i* of each belonging to
/// hypothesis *i*.
#[derive(Debug, Clone, Default)]
pub struct EncoderDecoderState {
    states: Array2<f32>,
    embeddings: Array2<f32>,
}

impl EncoderDecoderState {
    /// An empty state; populated by `begin_sentence_state` or
    /// `assemble_beam_state`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> &Array2<f32> {
        &self.states
    }

    /// Callers must keep the row count equal to `embeddings()`.
    pub fn states_mut(&mut self) -> &mut Array2<f32> {
        &mut self.states
    }

    pub fn embeddings(&self) -> &Array2<f32> {
        &self.embeddings
    }

    /// Callers must keep the row count equal to `states()`.
    pub fn embeddings_mut(&mut self) -> &mut Array2<f32> {
        &mut self.embeddings
    }

    fn set(&mut self, states: Array2<f32>, embeddings: Array2<f32>) {
        debug_assert_eq!(states.nrows(), embeddings.nrows());
        self.states = states;
        self.embeddings = embeddings;
    }

    /// Row count, or `InvalidState` if the state is empty, ragged, or sized
    /// for a model other than `dims`.
    fn validate(&self, what: &str, dims: &ModelDims) -> ScorerResult<usize> {
        let rows = self.states.nrows();
        if rows != self.embeddings.nrows() {
            return Err(ScorerError::InvalidState(format!(
                "{}: states have {} rows but embeddings have {}",
                what,
                rows,
                self.embeddings.nrows()
            )));
        }
        if rows == 0 {
            return Err(ScorerError::InvalidState(format!("{}: state has no rows", what)));
        }
        if self.states.ncols() != dims.hidden || self.embeddings.ncols() != dims.emb {
            return Err(ScorerError::InvalidState(format!(
                "{}: state is {}x{} with embeddings {}x{}, model expects hidden {} and emb {}",
                what,
                rows,
                self.states.ncols(),
                rows,
                self.embeddings.ncols(),
                dims.hidden,
                dims.emb
            )));
        }
        Ok(rows)
    }
}

impl DecodeState for EncoderDecoderState {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn num_rows(&self) -> usize {
        self.states.nrows()
    }

    fn is_well_formed(&self) -> bool {
        self.states.nrows() > 0 && self.states.nrows() == self.embeddings.nrows()
    }

    fn clone_box(&self) -> Box<dyn DecodeState> {
        Box::new(self.clone())
    }
}

/// Where a scorer is in the per-sentence protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerPhase {
    /// No source sentence yet.
    Unbound,
    /// Source encoded, no start state handed out.
    SourceReady,
    /// Start state handed out; steps may be issued.
    Stepping,
}

/// Scorer backed by an attentional encoder-decoder.
pub struct EncoderDecoder {
    name: String,
    tab: usize,
    weight: f32,
    weights: Arc<Weights>,
    encoder: Box<dyn EncoderOps>,
    decoder: Box<dyn DecoderOps>,
    source_context: Option<Array2<f32>>,
    phase: ScorerPhase,
}

impl EncoderDecoder {
    pub fn new(name: impl Into<String>, tab: usize, weight: f32, weights: Arc<Weights>) -> Self {
        Self {
            name: name.into(),
            tab,
            weight,
            encoder: Box::new(Encoder::new(Arc::clone(&weights))),
            decoder: Box::new(Decoder::new(Arc::clone(&weights))),
            weights,
            source_context: None,
            phase: ScorerPhase::Unbound,
        }
    }

    pub fn encoder(&self) -> &dyn EncoderOps {
        self.encoder.as_ref()
    }

    pub fn decoder(&self) -> &dyn DecoderOps {
        self.decoder.as_ref()
    }

    pub fn decoder_mut(&mut self) -> &mut dyn DecoderOps {
        self.decoder.as_mut()
    }

    pub fn weights(&self) -> &Arc<Weights> {
        &self.weights
    }

    /// Input stream this scorer encodes.
    pub fn tab(&self) -> usize {
        self.tab
    }

    pub fn phase(&self) -> ScorerPhase {
        self.phase
    }

    pub fn source_context(&self) -> Option<&Array2<f32>> {
        self.source_context.as_ref()
    }
}

impl Scorer for EncoderDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn device(&self) -> usize {
        self.weights.device()
    }

    fn weight(&self) -> f32 {
        self.weight
    }

    fn set_source(&mut self, source: &Sentence) -> ScorerResult<()> {
        let words = source.words(self.tab)?;
        if words.is_empty() {
            return Err(ScorerError::InvalidInput(format!(
                "sentence {} has no tokens in tab {}",
                source.id(),
                self.tab
            )));
        }
        let vocab = self.encoder.vocab_size();
        if let Some(&bad) = words.iter().find(|&&w| w as usize >= vocab) {
            return Err(ScorerError::InvalidInput(format!(
                "sentence {}: token {} outside source vocabulary of {}",
                source.id(),
                bad,
                vocab
            )));
        }

        if self.phase == ScorerPhase::Stepping {
            log::debug!("{}: replacing source with sentence {}", self.name, source.id());
        }
        self.source_context = Some(self.encoder.encode(words)?);
        self.phase = ScorerPhase::SourceReady;
        Ok(())
    }

    fn new_state(&self) -> Box<dyn DecodeState> {
        Box::new(EncoderDecoderState::new())
    }

    fn begin_sentence_state(&mut self, state: &mut dyn DecodeState) -> ScorerResult<()> {
        let context = match (&self.source_context, self.phase) {
            (Some(context), ScorerPhase::SourceReady | ScorerPhase::Stepping) => context,
            _ => {
                return Err(ScorerError::ProtocolOrder(
                    "begin_sentence_state called before set_source".into(),
                ))
            }
        };
        let state = downcast_state_mut::<EncoderDecoderState>(state)?;

        let states = self.decoder.empty_state(context, 1)?;
        let embeddings = self.decoder.empty_embedding(1);
        state.set(states, embeddings);

        self.phase = ScorerPhase::Stepping;
        Ok(())
    }

    fn score(
        &mut self,
        in_state: &dyn DecodeState,
        out_prob: &mut Array2<f32>,
        out_state: &mut dyn DecodeState,
    ) -> ScorerResult<()> {
        let context = match (&self.source_context, self.phase) {
            (Some(context), ScorerPhase::Stepping) => context,
            (_, ScorerPhase::Unbound) => {
                return Err(ScorerError::ProtocolOrder("score called before set_source".into()))
            }
            _ => {
                return Err(ScorerError::ProtocolOrder(
                    "score called before begin_sentence_state".into(),
                ))
            }
        };
        let input = downcast_state::<EncoderDecoderState>(in_state)?;
        input.validate("score input", self.weights.dims())?;
        let output = downcast_state_mut::<EncoderDecoderState>(out_state)?;

        let step = self.decoder.make_step(
            input.states().view(),
            input.embeddings().view(),
            context,
        )?;

        *out_prob = step.probs;
        output.set(step.states, input.embeddings().clone());
        Ok(())
    }

    fn assemble_beam_state(
        &self,
        in_state: &dyn DecodeState,
        beam: &[HypothesisPtr],
        out_state: &mut dyn DecodeState,
    ) -> ScorerResult<()> {
        let input = downcast_state::<EncoderDecoderState>(in_state)?;
        let rows = input.validate("assemble input", self.weights.dims())?;
        if beam.is_empty() {
            return Err(ScorerError::InvalidState("cannot assemble an empty beam".into()));
        }

        let vocab = self.decoder.vocab_size();
        let mut indices = Vec::with_capacity(beam.len());
        let mut words = Vec::with_capacity(beam.len());
        for (i, hyp) in beam.iter().enumerate() {
            let prev = hyp.prev_state_index();
            if prev >= rows {
                return Err(ScorerError::InvalidState(format!(
                    "hypothesis {} extends row {} but the state has {} rows",
                    i, prev, rows
                )));
            }
            let word = hyp.word();
            if word as usize >= vocab {
                return Err(ScorerError::InvalidInput(format!(
                    "hypothesis {} chose word {} outside vocabulary of {}",
                    i, word, vocab
                )));
            }
            indices.push(prev);
            words.push(word);
        }

        let states = assemble_rows(input.states(), &indices);
        let embeddings = self.decoder.lookup(&words)?;
        downcast_state_mut::<EncoderDecoderState>(out_state)?.set(states, embeddings);
        Ok(())
    }

    fn attention(&self, out: &mut Array2<f32>) -> ScorerResult<()> {
        out.clone_from(self.decoder.attention());
        Ok(())
    }

    fn vocab_size(&self) -> usize {
        self.decoder.vocab_size()
    }

    fn filter(&mut self, ids: &[usize]) -> ScorerResult<()> {
        let vocab = self.decoder.vocab_size();
        if let Some(&bad) = ids.iter().find(|&&id| id >= vocab) {
            return Err(ScorerError::InvalidInput(format!(
                "filter id {} outside vocabulary of {}",
                bad, vocab
            )));
        }
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != ids.len() {
            log::warn!(
                "{}: filter list has {} duplicate ids; duplicated columns will split probability mass",
                self.name,
                ids.len() - sorted.len()
            );
        }

        self.decoder.filter(ids)?;
        log::debug!("{}: output filter set to {} ids", self.name, ids.len());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
