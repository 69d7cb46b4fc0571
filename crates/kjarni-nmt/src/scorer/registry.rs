//! Loader factories keyed by model type.

use super::{EncoderDecoderLoader, Loader};
use crate::config::{DecoderConfig, ScorerConfig};
use crate::error::{ScorerError, ScorerResult};
use crate::utils::levenshtein;
use std::collections::BTreeMap;

/// Builds a loader for one configured scorer.
pub type LoaderFactory = fn(name: &str, config: &ScorerConfig, devices: &[usize]) -> Box<dyn Loader>;

fn encoder_decoder_factory(name: &str, config: &ScorerConfig, devices: &[usize]) -> Box<dyn Loader> {
    Box::new(EncoderDecoderLoader::new(name, config.clone(), devices.to_vec()))
}

/// Maps model-type names (case-insensitive) to loader factories.
pub struct LoaderRegistry {
    factories: BTreeMap<String, LoaderFactory>,
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl LoaderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in model families.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("dl4mt", encoder_decoder_factory);
        registry.register("nematus", encoder_decoder_factory);
        registry
    }

    /// Adds or replaces the factory for `kind`.
    pub fn register(&mut self, kind: &str, factory: LoaderFactory) {
        self.factories.insert(kind.to_lowercase(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(&kind.to_lowercase())
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Creates an unloaded loader for one scorer.
    pub fn create(
        &self,
        name: &str,
        config: &ScorerConfig,
        devices: &[usize],
    ) -> ScorerResult<Box<dyn Loader>> {
        let kind = config.kind.to_lowercase();
        let factory = self.factories.get(&kind).ok_or_else(|| {
            let suggestions = levenshtein::find_similar(&kind, &self.kinds(), 3, 0.4)
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            ScorerError::UnknownScorerType {
                kind: config.kind.clone(),
                suggestions,
            }
        })?;
        Ok(factory(name, config, devices))
    }

    /// One unloaded loader per configured scorer, ordered by scorer name.
    pub fn create_all(&self, config: &DecoderConfig) -> ScorerResult<Vec<Box<dyn Loader>>> {
        config.validate()?;
        config
            .scorers
            .iter()
            .map(|(name, scorer)| self.create(name, scorer, &config.devices))
            .collect()
    }
}
