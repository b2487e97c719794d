//! Random three-way train / test / validation partitioning.

use crate::dataset::Dataset;
use crate::error::{EvalError, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt::{Display, Formatter};
use tracing::debug;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

const SUM_TOLERANCE: f64 = 1e-6;

/// Requested proportions of the train, test and validation subsets.
///
/// The three fractions must each lie in (0, 1) and sum to 1; nothing is
/// renormalised.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct SplitFractions {
    pub train: f64,
    pub test: f64,
    pub val: f64,
}

impl SplitFractions {
    pub fn new(train: f64, test: f64, val: f64) -> Self {
        Self { train, test, val }
    }

    /// Each fraction must lie in (0, 1) and together they must sum to 1
    /// within `1e-6`; otherwise `EvalError::Configuration`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("train", self.train), ("test", self.test), ("val", self.val)] {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(EvalError::configuration(format!(
                    "{} fraction must lie in (0, 1), got {}",
                    name, value
                )));
            }
        }
        let total = self.train + self.test + self.val;
        if (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(EvalError::configuration(format!(
                "train:test:val fractions must sum to 1, got {} ({})",
                total, self
            )));
        }
        Ok(())
    }

    /// Subset sizes `(train, test, val)` for `n` samples.
    ///
    /// The holdout (test + val) gets `round(n * (test + val))` samples and val
    /// gets `round(holdout * val / (test + val))` of those.
    pub fn sizes(&self, n: usize) -> Result<(usize, usize, usize)> {
        self.validate()?;
        let holdout_fraction = self.test + self.val;
        let n_holdout = (n as f64 * holdout_fraction).round() as usize;
        let n_val = (n_holdout as f64 * self.val / holdout_fraction).round() as usize;
        let n_test = n_holdout - n_val.min(n_holdout);
        let n_train = n - n_holdout.min(n);
        if n_train == 0 || n_test == 0 || n_val == 0 {
            return Err(EvalError::configuration(format!(
                "split {} of {} samples leaves an empty subset (train {}, test {}, val {})",
                self, n, n_train, n_test, n_val
            )));
        }
        Ok((n_train, n_test, n_val))
    }
}

impl Display for SplitFractions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.train, self.test, self.val)
    }
}

/// Disjoint train / test / validation subsets of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
    pub val: Dataset,
}

/// Draws index sets `(train, test, val)` covering `0..n` exactly once.
///
/// The first shuffle separates train from the holdout, the second separates
/// test from val inside the holdout.
pub fn split_indices<R: Rng + ?Sized>(
    n: usize,
    fractions: &SplitFractions,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>, Vec<usize>)> {
    let (n_train, _, n_val) = fractions.sizes(n)?;

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let train = order.split_off(n - n_train);
    let mut holdout = order;

    holdout.shuffle(rng);
    let test = holdout.split_off(n_val);
    let val = holdout;

    Ok((train, test, val))
}

/// Partitions `dataset` into train, test and val subsets by `fractions`.
///
/// # Errors
///
/// `EvalError::Configuration` for invalid fractions or when a subset would be
/// empty.
pub fn split<R: Rng + ?Sized>(dataset: &Dataset, fractions: &SplitFractions, rng: &mut R) -> Result<Split> {
    let (train, test, val) = split_indices(dataset.len(), fractions, rng)?;
    let split = Split {
        train: dataset.select(&train),
        test: dataset.select(&test),
        val: dataset.select(&val),
    };
    debug!(
        total = dataset.len(),
        train = split.train.len(),
        test = split.test.len(),
        val = split.val.len(),
        "split dataset"
    );
    Ok(split)
}
