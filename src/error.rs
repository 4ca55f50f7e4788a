use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can abort a synthesis run or the registry calls feeding it.
///
/// Every variant carries the offending name or path so the declarative input
/// can be fixed without re-running with extra logging.
#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SynthError {
    #[error("compute unit '{name}' is already registered")]
    DuplicateUnit { name: String },

    #[error("compute unit '{unit}' is not registered (referenced by {referrer})")]
    UnboundReference { unit: String, referrer: String },

    #[error("method {method} is already bound on '{path}'")]
    DuplicateMethod { path: String, method: String },

    #[error("compute unit '{unit}' referenced by {referrer} is missing from the registry")]
    IncompleteGraph { unit: String, referrer: String },

    #[error("path segment '{segment}' already exists under '{parent}'")]
    DuplicatePathSegment { parent: String, segment: String },

    #[error("unknown resource node #{0}")]
    UnknownNode(usize),

    #[error("logical id '{0}' is produced by more than one resource")]
    DuplicateLogicalId(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("invalid stack description: {0}")]
    InvalidDescription(String),

    #[error("failed to serialize template: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SynthError {
    fn from(err: serde_json::Error) -> Self {
        SynthError::InvalidDescription(err.to_string())
    }
}
