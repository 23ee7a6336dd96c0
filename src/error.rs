//! Error types for registry startup and per-request prediction.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::classifier::ClassifierId;

/// Integrity failures that must stop the process before it serves traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read {what} at {path}: {source}")]
    Io {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what} at {path}: {source}")]
    Parse {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {what}: {reason}")]
    InvalidSchema { what: &'static str, reason: String },

    #[error("classifier '{classifier}' artifact is invalid: {reason}")]
    InvalidArtifact {
        classifier: ClassifierId,
        reason: String,
    },

    #[error(
        "classifier '{classifier}' was trained against a different {schema} schema \
         (artifact {artifact}, loaded {loaded})"
    )]
    SchemaMismatch {
        classifier: ClassifierId,
        schema: &'static str,
        artifact: String,
        loaded: String,
    },

    #[error("classifier '{classifier}' carries no {schema} schema checksum")]
    MissingChecksum {
        classifier: ClassifierId,
        schema: &'static str,
    },

    #[error("classifier '{0}' registered more than once")]
    DuplicateClassifier(ClassifierId),

    #[error("no classifiers loaded from {0}")]
    NoClassifiers(PathBuf),
}

/// Failure of a single classifier invocation.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("model produced no output")]
    EmptyOutput,

    #[error("model emitted negative ordinal {0}")]
    NegativeOrdinal(i64),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Request-scoped failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("classifier '{classifier}' emitted ordinal {ordinal} but only {labels} labels are loaded")]
    LabelResolution {
        classifier: ClassifierId,
        ordinal: usize,
        labels: usize,
    },

    #[error("no classifier voted")]
    NoVotes,

    #[error("classifier '{classifier}' failed: {source}")]
    Classifier {
        classifier: ClassifierId,
        #[source]
        source: ClassifierError,
    },
}

impl PredictError {
    /// Whether the caller, rather than the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::MalformedRequest(_))
    }

    /// Stable machine-readable kind for error replies.
    pub fn kind(&self) -> &'static str {
        if self.is_client_error() {
            "malformed_request"
        } else {
            "internal"
        }
    }

    /// HTTP-equivalent status carried in error replies.
    pub fn status(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let malformed = PredictError::MalformedRequest("payload is not an object".into());
        assert!(malformed.is_client_error());
        assert_eq!(malformed.kind(), "malformed_request");
        assert_eq!(malformed.status(), 400);

        let label = PredictError::LabelResolution {
            classifier: ClassifierId::DecisionTree,
            ordinal: 7,
            labels: 2,
        };
        assert!(!label.is_client_error());
        assert_eq!(label.kind(), "internal");
        assert_eq!(label.status(), 500);
        assert!(label.to_string().contains("ordinal 7"));
    }
}
