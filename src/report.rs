//! Human-readable tables for sweeps and comparisons.

use crate::compare::Comparison;
use crate::split::Split;
use crate::sweep::{CandidateOutcome, Evaluation, SweepOutcome};
use crate::trainer::Family;
use std::fmt::Write;

/// One line with the sample count of each subset.
pub fn split_sizes(split: &Split) -> String {
    format!(
        "train: {} samples, test: {} samples, val: {} samples",
        split.train.len(),
        split.test.len(),
        split.val.len()
    )
}

/// The hyperparameter followed by indented train and validation scores.
pub fn evaluation(family: Family, eval: &Evaluation) -> String {
    format!(
        "{}: {}\n\t{:<15} {}\n\t{:<15} {}\n",
        family.parameter_name(),
        eval.hyperparameter,
        "train scores:",
        eval.train,
        "val scores:",
        eval.validation
    )
}

/// Every candidate in the order it was tried, then the winner's scores on
/// all three subsets.
pub fn sweep<C>(family: Family, outcome: &SweepOutcome<C>) -> String {
    let mut out = String::new();
    for candidate in &outcome.candidates {
        match candidate {
            CandidateOutcome::Evaluated(eval) => {
                out.push_str(&evaluation(family, eval));
                out.push('\n');
            }
            CandidateOutcome::Skipped {
                hyperparameter,
                validation_f1,
            } => {
                let _ = writeln!(
                    out,
                    ">> skipping {} {}: validation f1 {:.4} is below the quality floor",
                    family.parameter_name(),
                    hyperparameter,
                    validation_f1
                );
            }
        }
    }
    let _ = writeln!(
        out,
        "best validation f1 score is {:.4} for optimal {} {}",
        outcome.best_validation_f1,
        family.parameter_name(),
        outcome.best_hyperparameter
    );
    let _ = writeln!(out, "\t{:<15} {}", "train scores:", outcome.best.train);
    let _ = writeln!(out, "\t{:<15} {}", "val scores:", outcome.best.validation);
    let _ = writeln!(out, "\t{:<15} {}", "test scores:", outcome.best.test);
    out
}

/// One row per split with every family side by side, then mean and std dev rows.
pub fn comparison(comparison: &Comparison) -> String {
    let mut out = String::new();
    let header: Vec<String> = comparison
        .families
        .iter()
        .map(|f| format!("{} ({}={})", f.family, f.family.parameter_name(), f.hyperparameter))
        .collect();
    let _ = writeln!(
        out,
        "test scores [accuracy, precision, recall, f1] over {} splits of {}",
        comparison.n_trials, comparison.fractions
    );
    let _ = writeln!(out, "{:<12} {}", "", header.join("    "));

    for trial in 0..comparison.n_trials {
        let cells: Vec<String> = comparison
            .families
            .iter()
            .map(|f| f.test_scores[trial].rounded().to_string())
            .collect();
        let _ = writeln!(out, "{:<12} {}", format!("split {}:", trial), cells.join("    "));
    }

    let means: Vec<String> = comparison.families.iter().map(|f| f.mean.rounded().to_string()).collect();
    let stds: Vec<String> = comparison
        .families
        .iter()
        .map(|f| f.std_dev.rounded().to_string())
        .collect();
    let _ = writeln!(out, "{:<12} {}", "mean:", means.join("    "));
    let _ = writeln!(out, "{:<12} {}", "std dev:", stds.join("    "));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::FamilyTrials;
    use crate::metrics::MetricVector;
    use crate::split::SplitFractions;
    use crate::trainer::TrialResult;

    #[test]
    fn test_comparison_table_layout() {
        let row = MetricVector::from_array([0.98766, 0.5, 0.25, 0.125]);
        let trials = FamilyTrials {
            family: Family::SupportVector,
            hyperparameter: 0.001,
            test_scores: vec![row, row],
            mean: row,
            std_dev: MetricVector::from_array([0.0; 4]),
        };
        let cmp = Comparison {
            n_trials: 2,
            fractions: SplitFractions::new(0.6, 0.3, 0.1),
            families: vec![trials],
        };
        let text = comparison(&cmp);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[1].contains("support-vector (gamma=0.001)"));
        assert!(lines[2].starts_with("split 0:"));
        assert!(lines[2].contains("[0.9877, 0.5000, 0.2500, 0.1250]"));
        assert!(lines[4].starts_with("mean:"));
        assert!(lines[5].contains("[0.0000, 0.0000, 0.0000, 0.0000]"));
    }

    #[test]
    fn test_sweep_lists_candidates_in_order() {
        let scores = |v: f64| MetricVector::from_array([v; 4]);
        let outcome = SweepOutcome {
            best_hyperparameter: 0.001,
            best_validation_f1: 0.9,
            best: TrialResult {
                train: scores(1.0),
                validation: scores(0.9),
                test: scores(0.8),
            },
            candidates: vec![
                CandidateOutcome::Skipped {
                    hyperparameter: 0.000005,
                    validation_f1: 0.02,
                },
                CandidateOutcome::Evaluated(Evaluation {
                    hyperparameter: 0.001,
                    train: scores(1.0),
                    validation: scores(0.9),
                }),
                CandidateOutcome::Skipped {
                    hyperparameter: 0.1,
                    validation_f1: 0.05,
                },
            ],
            model: (),
        };
        let text = sweep(Family::SupportVector, &outcome);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            ">> skipping gamma 0.000005: validation f1 0.0200 is below the quality floor"
        );
        assert_eq!(lines[1], "gamma: 0.001");
        assert!(lines[5].starts_with(">> skipping gamma 0.1:"));
        assert!(lines[6].starts_with("best validation f1 score is 0.9000 for optimal gamma 0.001"));
        assert!(lines[9].contains("test scores:"));
    }

    #[test]
    fn test_evaluation_lines() {
        let eval = Evaluation {
            hyperparameter: 12.0,
            train: MetricVector::from_array([1.0; 4]),
            validation: MetricVector::from_array([0.5; 4]),
        };
        let text = evaluation(Family::DecisionTree, &eval);
        assert!(text.starts_with("max_depth: 12\n"));
        assert!(text.contains("\ttrain scores:   [1.0000"));
        assert!(text.contains("\tval scores:     [0.5000"));
    }
}
