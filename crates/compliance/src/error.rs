//! Error types for the compliance engine.
//!
//! Data-level problems never show up here: checks turn them into findings.
//! These errors cover what happens before or around a validation run.

use thiserror::Error;

/// Result type alias using ValidatorError.
pub type Result<T> = std::result::Result<T, ValidatorError>;

#[derive(Debug, Error)]
pub enum ValidatorError {
    // === Usage Errors ===
    #[error("Unknown stage '{0}'")]
    UnknownStage(String),

    #[error("Unknown product '{product}' for stage '{stage}'")]
    UnknownProduct { stage: String, product: String },

    #[error("Unknown version '{version}' of {stage}/{product} (available: {available})")]
    UnknownVersion {
        stage: String,
        product: String,
        version: String,
        available: String,
    },

    // === Loading Errors ===
    #[error("Failed to load dataset: {0}")]
    Load(String),

    // === Catalog Errors ===
    #[error("Catalog error: {0}")]
    Catalog(String),

    // === Finding Construction ===
    #[error("Invalid status '{0}'. Valid levels are: PASS, WARNING, FAIL")]
    InvalidStatus(String),
}

impl ValidatorError {
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }

    /// Whether this error was caused by the caller naming something that
    /// does not exist.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::UnknownStage(_) | Self::UnknownProduct { .. } | Self::UnknownVersion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_classification() {
        assert!(ValidatorError::UnknownStage("x".into()).is_usage());
        assert!(!ValidatorError::catalog("bad rule").is_usage());
        assert!(!ValidatorError::Load("gone".into()).is_usage());
    }

    #[test]
    fn test_messages() {
        let err = ValidatorError::UnknownVersion {
            stage: "source_data".into(),
            product: "radar_precipitation".into(),
            version: "9.9.9".into(),
            available: "0.1.0, 0.2.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown version '9.9.9' of source_data/radar_precipitation (available: 0.1.0, 0.2.0)"
        );
    }
}
