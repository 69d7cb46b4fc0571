//! Error types for the scoring core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the search driver and to whoever calls `Loader::load`.
#[derive(Debug, Error)]
pub enum ScorerError {
    /// A device-loading task could not construct its weights.
    #[error("Failed to load model {path:?} onto device {device}: {source:#}")]
    LoadFailed {
        path: PathBuf,
        device: usize,
        #[source]
        source: anyhow::Error,
    },

    /// `new_scorer` was called before `load` completed.
    #[error("Loader '{0}' has no loaded weights; call load() before new_scorer()")]
    NotLoaded(String),

    /// A decode state or beam has the wrong shape for the requested step.
    #[error("Invalid decode state: {0}")]
    InvalidState(String),

    /// Scorer operations were issued out of order.
    #[error("Protocol order violation: {0}")]
    ProtocolOrder(String),

    /// A sentence, filter list or hypothesis refers to something the model
    /// does not have.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No loader is registered for the configured model type.
    #[error("Unknown scorer type '{kind}'{}", format_suggestions(.suggestions))]
    UnknownScorerType {
        kind: String,
        suggestions: Vec<String>,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The network runtime failed while computing a step.
    #[error("Network runtime failed: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(". Did you mean: {}?", suggestions.join(", "))
    }
}

/// Result type for scorer and loader operations.
pub type ScorerResult<T> = Result<T, ScorerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failed_names_device_and_path() {
        let err = ScorerError::LoadFailed {
            path: PathBuf::from("/models/en-de.safetensors"),
            device: 3,
            source: anyhow::anyhow!("tensor 'Wemb' not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("device 3"));
        assert!(msg.contains("en-de.safetensors"));
        assert!(msg.contains("Wemb"));
    }

    #[test]
    fn test_unknown_type_lists_suggestions() {
        let err = ScorerError::UnknownScorerType {
            kind: "nematsu".into(),
            suggestions: vec!["nematus".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown scorer type 'nematsu'. Did you mean: nematus?"
        );

        let bare = ScorerError::UnknownScorerType {
            kind: "xyz".into(),
            suggestions: vec![],
        };
        assert_eq!(bare.to_string(), "Unknown scorer type 'xyz'");
    }
}
