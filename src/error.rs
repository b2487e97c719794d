//! Error types for the digits-eval crate.

use decision_tree::TreeError;
use svc::SvcError;
use thiserror::Error;

/// Top-level error type for the evaluation pipeline.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported classifier family: {0}")]
    UnsupportedFamily(String),

    #[error("No viable candidate: all {candidates} candidates scored below the quality floor {floor}")]
    NoViableCandidate { candidates: usize, floor: f64 },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("SVC error: {0}")]
    Svc(#[from] SvcError),

    #[error("Decision tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl EvalError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
