//! Experiment settings.

use crate::error::{EvalError, Result};
use crate::split::SplitFractions;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Everything one run of the experiment needs besides the data.
///
/// The defaults are tuned for the 8x8 digits collection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", default)
)]
pub struct ExperimentConfig {
    /// RBF kernel widths tried for the support-vector family.
    pub gammas: Vec<f64>,
    /// Maximum depths tried for the decision-tree family.
    pub depths: Vec<usize>,
    /// Split used for both hyperparameter sweeps.
    pub tuning_split: SplitFractions,
    /// Split redrawn on every comparison trial.
    pub comparison_split: SplitFractions,
    pub n_trials: usize,
    /// Minimum validation F1 a gamma needs to be considered.
    pub svm_quality_floor: Option<f64>,
    /// Image rescale factor applied before flattening; 1 leaves images as is.
    pub scale_factor: f64,
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            gammas: vec![0.000005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1],
            depths: vec![10, 12, 14, 16, 18, 20],
            tuning_split: SplitFractions::new(0.7, 0.2, 0.1),
            comparison_split: SplitFractions::new(0.6, 0.3, 0.1),
            n_trials: 5,
            svm_quality_floor: Some(0.11),
            scale_factor: 1.0,
            seed: 42,
        }
    }
}

impl ExperimentConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_trials(mut self, n_trials: usize) -> Self {
        self.n_trials = n_trials;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_gammas(mut self, gammas: Vec<f64>) -> Self {
        self.gammas = gammas;
        self
    }

    pub fn with_depths(mut self, depths: Vec<usize>) -> Self {
        self.depths = depths;
        self
    }

    pub fn with_quality_floor(mut self, floor: Option<f64>) -> Self {
        self.svm_quality_floor = floor;
        self
    }

    pub fn depth_candidates(&self) -> Vec<f64> {
        self.depths.iter().map(|&d| d as f64).collect()
    }

    /// Checks the settings before any data is touched.
    pub fn validate(&self) -> Result<()> {
        self.tuning_split.validate()?;
        self.comparison_split.validate()?;
        if self.gammas.is_empty() || self.depths.is_empty() {
            return Err(EvalError::configuration("candidate lists must not be empty"));
        }
        if let Some(g) = self.gammas.iter().find(|g| !g.is_finite() || **g <= 0.0) {
            return Err(EvalError::configuration(format!("gamma {} is not positive", g)));
        }
        if self.depths.contains(&0) {
            return Err(EvalError::configuration("max_depth candidates must be at least 1"));
        }
        if self.n_trials == 0 {
            return Err(EvalError::configuration("n_trials must be at least 1"));
        }
        if let Some(floor) = self.svm_quality_floor {
            if !(0.0..=1.0).contains(&floor) {
                return Err(EvalError::configuration(format!(
                    "quality floor {} is outside [0, 1]",
                    floor
                )));
            }
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(EvalError::configuration(format!(
                "scale factor {} is not positive",
                self.scale_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.depth_candidates()[0], 10.0);
    }

    #[test]
    fn test_invalid_settings() {
        let base = ExperimentConfig::default();
        assert!(base.clone().with_trials(0).validate().is_err());
        assert!(base.clone().with_gammas(vec![]).validate().is_err());
        assert!(base.clone().with_gammas(vec![0.01, -1.0]).validate().is_err());
        assert!(base.clone().with_depths(vec![0, 3]).validate().is_err());
        assert!(base.clone().with_quality_floor(Some(1.5)).validate().is_err());
        assert!(base.clone().with_scale_factor(0.0).validate().is_err());

        let mut bad_split = base;
        bad_split.comparison_split = SplitFractions::new(0.6, 0.3, 0.3);
        assert!(matches!(bad_split.validate(), Err(EvalError::Configuration(_))));
    }
}
