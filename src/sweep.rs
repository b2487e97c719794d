//! Hyperparameter sweep: pick the candidate with the best validation F1.

use crate::dataset::Dataset;
use crate::error::{EvalError, Result};
use crate::metrics::{score, MetricVector};
use crate::trainer::{train, Classifier, Family, FittedClassifier, TrialResult};
use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Train and validation scores for one candidate that passed the quality floor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Evaluation {
    pub hyperparameter: f64,
    pub train: MetricVector,
    pub validation: MetricVector,
}

/// What happened to one candidate during a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub enum CandidateOutcome {
    Evaluated(Evaluation),
    /// Dropped by the quality floor; it cannot win.
    Skipped { hyperparameter: f64, validation_f1: f64 },
}

impl CandidateOutcome {
    pub fn hyperparameter(&self) -> f64 {
        match self {
            CandidateOutcome::Evaluated(eval) => eval.hyperparameter,
            CandidateOutcome::Skipped { hyperparameter, .. } => *hyperparameter,
        }
    }
}

/// Result of a sweep over a candidate list.
#[derive(Debug, Clone)]
pub struct SweepOutcome<C> {
    pub best_hyperparameter: f64,
    pub best_validation_f1: f64,
    /// Scores of the winner on train, validation and test.
    pub best: TrialResult,
    /// Every candidate, in evaluation order.
    pub candidates: Vec<CandidateOutcome>,
    /// The fitted winning model.
    pub model: C,
}

impl<C> SweepOutcome<C> {
    /// Candidates that passed the quality floor, in evaluation order.
    pub fn evaluated(&self) -> impl Iterator<Item = &Evaluation> {
        self.candidates.iter().filter_map(|c| match c {
            CandidateOutcome::Evaluated(eval) => Some(eval),
            CandidateOutcome::Skipped { .. } => None,
        })
    }

    /// Hyperparameters dropped by the quality floor, in evaluation order.
    pub fn skipped(&self) -> Vec<f64> {
        self.candidates
            .iter()
            .filter(|c| matches!(c, CandidateOutcome::Skipped { .. }))
            .map(CandidateOutcome::hyperparameter)
            .collect()
    }
}

/// Sweeps `candidates` for one classifier family.
///
/// Each candidate is trained on `train` and scored on `train` and `val`. With a
/// `quality_floor`, candidates whose validation F1 is strictly below it are
/// skipped and can never win. The winner is the first candidate with the
/// highest validation F1; it alone is scored on `test`.
///
/// # Errors
///
/// `EvalError::Configuration` for an empty candidate list,
/// `EvalError::NoViableCandidate` when the floor rejects every candidate, and
/// any training error.
pub fn sweep(
    family: Family,
    train_set: &Dataset,
    val_set: &Dataset,
    test_set: &Dataset,
    candidates: &[f64],
    quality_floor: Option<f64>,
) -> Result<SweepOutcome<FittedClassifier>> {
    info!(%family, candidates = candidates.len(), ?quality_floor, "starting sweep");
    sweep_with(
        |h| train(family, train_set, h),
        train_set,
        val_set,
        test_set,
        candidates,
        quality_floor,
    )
}

/// The selection loop behind [`sweep`], generic over how a candidate is fitted.
pub fn sweep_with<C, T>(
    mut fit: T,
    train_set: &Dataset,
    val_set: &Dataset,
    test_set: &Dataset,
    candidates: &[f64],
    quality_floor: Option<f64>,
) -> Result<SweepOutcome<C>>
where
    C: Classifier,
    T: FnMut(f64) -> Result<C>,
{
    if candidates.is_empty() {
        return Err(EvalError::configuration("hyperparameter candidate list is empty"));
    }

    let mut best_f1 = f64::NEG_INFINITY;
    let mut best: Option<(f64, C, MetricVector, MetricVector)> = None;
    let mut outcomes = Vec::with_capacity(candidates.len());

    for &candidate in candidates {
        let model = fit(candidate)?;
        let train = score(&model, train_set)?;
        let validation = score(&model, val_set)?;

        if let Some(floor) = quality_floor {
            if validation.f1 < floor {
                info!(
                    candidate,
                    val_f1 = validation.f1,
                    floor,
                    "skipping candidate below quality floor"
                );
                outcomes.push(CandidateOutcome::Skipped {
                    hyperparameter: candidate,
                    validation_f1: validation.f1,
                });
                continue;
            }
        }

        debug!(candidate, %train, %validation, "evaluated candidate");
        outcomes.push(CandidateOutcome::Evaluated(Evaluation {
            hyperparameter: candidate,
            train,
            validation,
        }));

        if validation.f1 > best_f1 {
            best_f1 = validation.f1;
            best = Some((candidate, model, train, validation));
        }
    }

    let Some((best_hyperparameter, model, train, validation)) = best else {
        return Err(EvalError::NoViableCandidate {
            candidates: candidates.len(),
            floor: quality_floor.unwrap_or(f64::NEG_INFINITY),
        });
    };

    let test = score(&model, test_set)?;
    info!(
        best_hyperparameter,
        best_validation_f1 = best_f1,
        %test,
        "sweep finished"
    );

    Ok(SweepOutcome {
        best_hyperparameter,
        best_validation_f1: best_f1,
        best: TrialResult {
            train,
            validation,
            test,
        },
        candidates: outcomes,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, ArrayView1};

    /// Predicts class 1 when `x[0] > cut`, otherwise class 0.
    struct Threshold {
        cut: f64,
    }

    impl Classifier for Threshold {
        fn predict(&self, features: ArrayView1<f64>) -> Result<usize> {
            Ok(usize::from(features[0] > self.cut))
        }

        fn name(&self) -> String {
            format!("threshold({})", self.cut)
        }
    }

    fn line(values: &[(f64, usize)]) -> Dataset {
        let mut ds = Dataset::default();
        for &(x, label) in values {
            ds.push(array![x], label).unwrap();
        }
        ds
    }

    fn subsets() -> (Dataset, Dataset, Dataset) {
        let train = line(&[(0.0, 0), (1.0, 0), (4.0, 1), (5.0, 1)]);
        let val = line(&[(0.5, 0), (2.0, 0), (3.0, 1), (4.5, 1)]);
        let test = line(&[(1.5, 0), (3.5, 1)]);
        (train, val, test)
    }

    #[test]
    fn test_best_validation_f1_wins() {
        let (train, val, test) = subsets();
        let candidates = [-1.0, 0.75, 2.5, 10.0];
        let outcome = sweep_with(|cut| Ok(Threshold { cut }), &train, &val, &test, &candidates, None).unwrap();

        assert_eq!(outcome.best_hyperparameter, 2.5);
        assert_eq!(outcome.best_validation_f1, 1.0);
        assert_eq!(outcome.best.test.f1, 1.0);
        assert_eq!(outcome.evaluated().count(), candidates.len());
        assert!(
            outcome
                .evaluated()
                .all(|e| e.validation.f1 <= outcome.best_validation_f1)
        );
    }

    #[test]
    fn test_first_candidate_wins_ties() {
        let (train, val, test) = subsets();
        let outcome = sweep_with(
            |cut| Ok(Threshold { cut }),
            &train,
            &val,
            &test,
            &[2.1, 2.9, 2.5],
            None,
        )
        .unwrap();
        assert_eq!(outcome.best_hyperparameter, 2.1);
    }

    #[test]
    fn test_quality_floor_skips_candidates() {
        let (train, val, test) = subsets();
        let outcome = sweep_with(
            |cut| Ok(Threshold { cut }),
            &train,
            &val,
            &test,
            &[10.0, 2.5],
            Some(0.5),
        )
        .unwrap();
        assert_eq!(outcome.skipped(), vec![10.0]);
        assert_eq!(outcome.evaluated().count(), 1);
        assert_eq!(outcome.best_hyperparameter, 2.5);
    }

    #[test]
    fn test_candidates_keep_evaluation_order() {
        let (train, val, test) = subsets();
        let outcome = sweep_with(
            |cut| Ok(Threshold { cut }),
            &train,
            &val,
            &test,
            &[2.5, 10.0, 0.75, -1.0],
            Some(0.5),
        )
        .unwrap();
        let order: Vec<f64> = outcome.candidates.iter().map(CandidateOutcome::hyperparameter).collect();
        assert_eq!(order, vec![2.5, 10.0, 0.75, -1.0]);
        assert!(matches!(outcome.candidates[0], CandidateOutcome::Evaluated(_)));
        assert!(matches!(
            outcome.candidates[1],
            CandidateOutcome::Skipped { validation_f1, .. } if validation_f1 < 0.5
        ));
        assert!(matches!(outcome.candidates[2], CandidateOutcome::Evaluated(_)));
        assert_eq!(outcome.skipped(), vec![10.0, -1.0]);
    }

    #[test]
    fn test_floor_above_everything_fails() {
        let (train, val, test) = subsets();
        let result = sweep_with(
            |cut| Ok(Threshold { cut }),
            &train,
            &val,
            &test,
            &[0.75, 2.5],
            Some(1.01),
        );
        assert!(matches!(
            result,
            Err(EvalError::NoViableCandidate { candidates: 2, .. })
        ));
    }

    #[test]
    fn test_empty_candidates_is_configuration_error() {
        let (train, val, test) = subsets();
        let result = sweep_with(|cut| Ok(Threshold { cut }), &train, &val, &test, &[], None);
        assert!(matches!(result, Err(EvalError::Configuration(_))));
    }

    #[test]
    fn test_training_errors_propagate() {
        let (train, val, test) = subsets();
        let result = sweep(Family::DecisionTree, &train, &val, &test, &[2.0, 0.5], None);
        assert!(matches!(result, Err(EvalError::Configuration(_))));
    }
}
