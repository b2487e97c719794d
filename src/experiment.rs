//! The full pipeline: tuning split, both sweeps, then the repeated comparison.

use crate::compare::{compare, Comparison};
use crate::config::ExperimentConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::split::{split, Split};
use crate::sweep::{sweep, SweepOutcome};
use crate::trainer::{Family, FittedClassifier};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ExperimentReport {
    pub tuning: Split,
    pub svm: SweepOutcome<FittedClassifier>,
    pub tree: SweepOutcome<FittedClassifier>,
    pub comparison: Comparison,
}

/// Runs the experiment on an already preprocessed dataset.
///
/// A single generator seeded from `config.seed` drives the tuning split and
/// every comparison split, so a seed fully determines the report.
pub fn run(config: &ExperimentConfig, dataset: &Dataset) -> Result<ExperimentReport> {
    config.validate()?;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);

    let tuning = split(dataset, &config.tuning_split, &mut rng)?;

    info!("tuning gamma for the support-vector classifier");
    let svm = sweep(
        Family::SupportVector,
        &tuning.train,
        &tuning.val,
        &tuning.test,
        &config.gammas,
        config.svm_quality_floor,
    )?;

    info!("tuning max_depth for the decision-tree classifier");
    let tree = sweep(
        Family::DecisionTree,
        &tuning.train,
        &tuning.val,
        &tuning.test,
        &config.depth_candidates(),
        None,
    )?;

    let families = [
        (Family::SupportVector, svm.best_hyperparameter),
        (Family::DecisionTree, tree.best_hyperparameter),
    ];
    let comparison = compare(
        dataset,
        &families,
        config.n_trials,
        &config.comparison_split,
        &mut rng,
    )?;

    Ok(ExperimentReport {
        tuning,
        svm,
        tree,
        comparison,
    })
}
