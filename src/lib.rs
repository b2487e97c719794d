//! Tuning and comparing support-vector and decision-tree classifiers on
//! handwritten digit images.
//!
//! The pipeline is linear: load images ([`dataset`]), flatten them
//! ([`preprocess`]), split three ways ([`split`]), sweep each family's
//! hyperparameter by validation F1 ([`sweep`]), then compare both families at
//! their chosen values over repeated random splits ([`compare`]).

pub mod compare;
pub mod config;
pub mod dataset;
mod error;
pub mod experiment;
pub mod metrics;
#[cfg(feature = "serde")]
pub mod persist;
pub mod preprocess;
pub mod report;
pub mod split;
pub mod sweep;
pub mod trainer;

pub use compare::{compare, Comparison, FamilyTrials};
pub use config::ExperimentConfig;
pub use dataset::{Dataset, LabeledImages};
pub use error::{EvalError, Result};
pub use metrics::{evaluate, score, MetricVector};
pub use split::{split, Split, SplitFractions};
pub use sweep::{sweep, CandidateOutcome, Evaluation, SweepOutcome};
pub use trainer::{train, Classifier, Family, FittedClassifier, TrialResult};
