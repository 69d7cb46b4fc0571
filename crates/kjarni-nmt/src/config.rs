//! Decoder configuration consumed by the loaders.
//!
//! ```json
//! {
//!   "devices": [0, 1],
//!   "scorers": {
//!     "F0": { "type": "dl4mt", "path": "/models/en-de", "tab": 0 }
//!   }
//! }
//! ```

use crate::error::{ScorerError, ScorerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings for one scorer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScorerConfig {
    /// Model family, used to pick a loader from the registry.
    #[serde(rename = "type")]
    pub kind: String,
    /// Parameter file or directory.
    pub path: PathBuf,
    /// Which parallel input stream of a sentence this scorer encodes.
    #[serde(default)]
    pub tab: usize,
    /// Log-linear weight for combining this scorer with others.
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

impl ScorerConfig {
    pub fn new(kind: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            kind: kind.into(),
            path: path.into(),
            tab: 0,
            weight: default_weight(),
        }
    }

    pub fn with_tab(mut self, tab: usize) -> Self {
        self.tab = tab;
        self
    }
}

/// Top-level configuration: devices plus named scorers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DecoderConfig {
    /// Device ordinals; one independent copy of every model is loaded per
    /// entry.
    pub devices: Vec<usize>,
    pub scorers: BTreeMap<String, ScorerConfig>,
}

impl DecoderConfig {
    pub fn from_json_str(json: &str) -> ScorerResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ScorerError::InvalidConfig(format!("malformed JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ScorerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScorerError::InvalidConfig(format!("cannot read {:?}: {}", path, e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> ScorerResult<()> {
        if self.devices.is_empty() {
            return Err(ScorerError::InvalidConfig(
                "'devices' must list at least one device".into(),
            ));
        }
        if self.scorers.is_empty() {
            return Err(ScorerError::InvalidConfig(
                "'scorers' must define at least one scorer".into(),
            ));
        }
        for (name, scorer) in &self.scorers {
            if scorer.path.as_os_str().is_empty() {
                return Err(ScorerError::InvalidConfig(format!(
                    "scorer '{}' has an empty 'path'",
                    name
                )));
            }
            if !scorer.weight.is_finite() {
                return Err(ScorerError::InvalidConfig(format!(
                    "scorer '{}' has a non-finite weight",
                    name
                )));
            }
        }
        Ok(())
    }
}
