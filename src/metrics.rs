//! Accuracy and macro-averaged precision / recall / F1.

use crate::dataset::Dataset;
use crate::error::{EvalError, Result};
use crate::trainer::Classifier;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Rounds to 4 decimal places, the precision every reported score uses.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Scores of one classifier on one labeled subset.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct MetricVector {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl MetricVector {
    pub const LEN: usize = 4;
    pub const NAMES: [&'static str; 4] = ["accuracy", "precision", "recall", "f1"];

    pub fn to_array(&self) -> [f64; 4] {
        [self.accuracy, self.precision, self.recall, self.f1]
    }

    pub fn from_array([accuracy, precision, recall, f1]: [f64; 4]) -> Self {
        Self {
            accuracy,
            precision,
            recall,
            f1,
        }
    }

    pub fn rounded(&self) -> Self {
        Self::from_array(self.to_array().map(round4))
    }
}

impl Display for MetricVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}, {:.4}]",
            self.accuracy, self.precision, self.recall, self.f1
        )
    }
}

/// Compares predictions against ground truth.
///
/// Macro averages run over every label that occurs in either `truth` or
/// `predicted`; a class whose precision, recall or F1 would divide by zero
/// contributes 0. All four values are rounded to 4 decimals.
pub fn evaluate(truth: &[usize], predicted: &[usize]) -> Result<MetricVector> {
    if truth.len() != predicted.len() {
        return Err(EvalError::dataset(format!(
            "{} labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.is_empty() {
        return Err(EvalError::configuration("cannot score an empty subset"));
    }

    let classes: BTreeSet<usize> = truth.iter().chain(predicted).copied().collect();
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
    for &class in &classes {
        let mut tp = 0;
        let mut fp = 0;
        let mut fn_ = 0;
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t == class, p == class) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
        let p = ratio(tp, tp + fp);
        let r = ratio(tp, tp + fn_);
        precision += p;
        recall += r;
        f1 += if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
    }

    let n_classes = classes.len() as f64;
    Ok(MetricVector {
        accuracy: ratio(correct, truth.len()),
        precision: precision / n_classes,
        recall: recall / n_classes,
        f1: f1 / n_classes,
    }
    .rounded())
}

/// Runs `classifier` over every sample of `dataset` and scores the predictions.
pub fn score<C: Classifier + ?Sized>(classifier: &C, dataset: &Dataset) -> Result<MetricVector> {
    let predicted = dataset
        .features()
        .map(|x| classifier.predict(x))
        .collect::<Result<Vec<usize>>>()?;
    evaluate(&dataset.labels(), &predicted)
}
