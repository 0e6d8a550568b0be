//! Error types shared by the store, the indexes and the query engine.

use std::fmt;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Pipeline stage an error (or a cancellation) originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Extract,
    Embed,
    AnchorSearch,
    Expansion,
    Fusion,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Validate => "validate",
            Stage::Extract => "extract",
            Stage::Embed => "embed",
            Stage::AnchorSearch => "anchor search",
            Stage::Expansion => "expansion",
            Stage::Fusion => "fusion",
            Stage::Persist => "persist",
        };
        f.write_str(label)
    }
}

/// Errors surfaced by the retrieval engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input rejected at the boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A numeric parameter outside its permitted range.
    #[error("Parameter '{name}' out of range: {value} (allowed: {bound})")]
    OutOfRange {
        name: &'static str,
        value: String,
        bound: String,
    },

    /// An external embedding or extraction provider failed.
    #[error("Provider failure during {stage}: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    /// The caller cancelled the operation at a checkpoint.
    #[error("Cancelled during {stage}")]
    Cancelled { stage: Stage },

    /// Snapshot read/write failure.
    #[error("Persistence error: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn out_of_range(
        name: &'static str,
        value: impl fmt::Display,
        bound: impl Into<String>,
    ) -> Self {
        Error::OutOfRange {
            name,
            value: value.to_string(),
            bound: bound.into(),
        }
    }

    pub(crate) fn provider(stage: Stage, source: anyhow::Error) -> Self {
        Error::Provider { stage, source }
    }

    /// Stage this error is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            Error::InvalidInput(_) | Error::OutOfRange { .. } => Stage::Validate,
            Error::Provider { stage, .. } | Error::Cancelled { stage } => *stage,
            Error::Persistence(_) => Stage::Persist,
        }
    }

    /// Whether the caller must fix its input (no point retrying as-is).
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::OutOfRange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = Error::out_of_range("max_hops", 5, "0..=2");
        assert_eq!(
            err.to_string(),
            "Parameter 'max_hops' out of range: 5 (allowed: 0..=2)"
        );
        assert!(err.is_validation());
        assert_eq!(err.stage(), Stage::Validate);
    }

    #[test]
    fn test_provider_error_keeps_stage() {
        let err = Error::provider(Stage::Embed, anyhow::anyhow!("connection refused"));
        assert_eq!(err.stage(), Stage::Embed);
        assert!(!err.is_validation());
        assert!(err.to_string().contains("embed"));
        assert!(err.to_string().contains("connection refused"));
    }
}
