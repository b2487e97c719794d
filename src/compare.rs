//! Repeated random splits comparing families at fixed hyperparameters.

use crate::dataset::Dataset;
use crate::error::{EvalError, Result};
use crate::metrics::MetricVector;
use crate::split::{split, SplitFractions};
use crate::trainer::{evaluate, Family};
use ndarray::{Array2, Axis};
use rand::Rng;
use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Test-set scores of one family over every trial, with column summaries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct FamilyTrials {
    pub family: Family,
    pub hyperparameter: f64,
    /// One row per trial, in trial order.
    pub test_scores: Vec<MetricVector>,
    pub mean: MetricVector,
    /// Population standard deviation (divisor = number of trials).
    pub std_dev: MetricVector,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Comparison {
    pub n_trials: usize,
    pub fractions: SplitFractions,
    /// In the order the families were requested.
    pub families: Vec<FamilyTrials>,
}

/// Column-wise mean and population standard deviation of metric rows.
pub fn summarize(rows: &[MetricVector]) -> Result<(MetricVector, MetricVector)> {
    let flat: Vec<f64> = rows.iter().flat_map(|m| m.to_array()).collect();
    let table = Array2::from_shape_vec((rows.len(), MetricVector::LEN), flat)
        .map_err(|e| EvalError::dataset(e.to_string()))?;
    let mean = table
        .mean_axis(Axis(0))
        .ok_or_else(|| EvalError::configuration("cannot summarize zero trials"))?;
    let std_dev = table.std_axis(Axis(0), 0.0);

    let to_vector = |a: &ndarray::Array1<f64>| MetricVector::from_array([a[0], a[1], a[2], a[3]]);
    Ok((to_vector(&mean), to_vector(&std_dev)))
}

/// Runs `n_trials` fresh splits. On each split every family is trained with
/// its fixed hyperparameter and only its test scores are kept.
pub fn compare<R: Rng + ?Sized>(
    dataset: &Dataset,
    families: &[(Family, f64)],
    n_trials: usize,
    fractions: &SplitFractions,
    rng: &mut R,
) -> Result<Comparison> {
    if n_trials == 0 {
        return Err(EvalError::configuration("n_trials must be at least 1"));
    }
    if families.is_empty() {
        return Err(EvalError::configuration("no classifier families to compare"));
    }
    fractions.validate()?;

    let mut rows: Vec<Vec<MetricVector>> = vec![Vec::with_capacity(n_trials); families.len()];
    for trial in 0..n_trials {
        let split = split(dataset, fractions, rng)?;
        for (slot, &(family, hyperparameter)) in rows.iter_mut().zip(families) {
            let result = evaluate(family, hyperparameter, &split)?;
            debug!(trial, %family, hyperparameter, test = %result.test, "trial finished");
            slot.push(result.test);
        }
    }

    let families = families
        .iter()
        .zip(rows)
        .map(|(&(family, hyperparameter), test_scores)| {
            let (mean, std_dev) = summarize(&test_scores)?;
            info!(%family, hyperparameter, %mean, %std_dev, "comparison summary");
            Ok(FamilyTrials {
                family,
                hyperparameter,
                test_scores,
                mean,
                std_dev,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Comparison {
        n_trials,
        fractions: *fractions,
        families,
    })
}
