//! Classifier families and the adapters that fit them from one hyperparameter.

use crate::dataset::Dataset;
use crate::error::{EvalError, Result};
use crate::metrics::{score, MetricVector};
use crate::split::Split;
use decision_tree::{DecisionTree, TreeParams};
use digits_helpers::L2Dist;
use ndarray::ArrayView1;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use svc::{Svc, SvcParams};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// The minimal contract the evaluation loop needs from a fitted model.
pub trait Classifier {
    /// Predict the digit class for a single sample.
    fn predict(&self, features: ArrayView1<f64>) -> Result<usize>;

    /// Return the name of the classifier (e.g., "support-vector (gamma=0.001)").
    fn name(&self) -> String;
}

/// The classifier families the experiment compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "kebab-case")
)]
pub enum Family {
    SupportVector,
    DecisionTree,
}

impl Family {
    /// What the single hyperparameter of this family controls.
    pub fn parameter_name(&self) -> &'static str {
        match self {
            Family::SupportVector => "gamma",
            Family::DecisionTree => "max_depth",
        }
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::SupportVector => write!(f, "support-vector"),
            Family::DecisionTree => write!(f, "decision-tree"),
        }
    }
}

impl FromStr for Family {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "support-vector" | "svm" | "svc" => Ok(Family::SupportVector),
            "decision-tree" | "decision" | "tree" => Ok(Family::DecisionTree),
            other => Err(EvalError::UnsupportedFamily(other.to_string())),
        }
    }
}

/// A fitted model of either family.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub enum FittedClassifier {
    SupportVector(Svc<usize, f64, L2Dist>),
    DecisionTree {
        max_depth: usize,
        tree: DecisionTree<usize, f64>,
    },
}

impl FittedClassifier {
    pub fn family(&self) -> Family {
        match self {
            FittedClassifier::SupportVector(_) => Family::SupportVector,
            FittedClassifier::DecisionTree { .. } => Family::DecisionTree,
        }
    }
}

impl Classifier for FittedClassifier {
    fn predict(&self, features: ArrayView1<f64>) -> Result<usize> {
        match self {
            FittedClassifier::SupportVector(svc) => Ok(svc.predict(features)?),
            FittedClassifier::DecisionTree { tree, .. } => Ok(tree.predict(features)?),
        }
    }

    fn name(&self) -> String {
        match self {
            FittedClassifier::SupportVector(svc) => format!("support-vector (gamma={})", svc.gamma()),
            FittedClassifier::DecisionTree { max_depth, .. } => {
                format!("decision-tree (max_depth={})", max_depth)
            }
        }
    }
}

/// Interprets a sweep candidate as a tree depth. It must be a positive integer.
pub fn max_depth_from(hyperparameter: f64) -> Result<usize> {
    if !hyperparameter.is_finite() || hyperparameter < 1.0 || hyperparameter.fract() != 0.0 {
        return Err(EvalError::configuration(format!(
            "max_depth must be a positive integer, got {}",
            hyperparameter
        )));
    }
    Ok(hyperparameter as usize)
}

/// Fits a classifier of `family` on `dataset`.
///
/// For the support-vector family `hyperparameter` is the RBF `gamma`; for the
/// decision-tree family it is the maximum depth, which the fitted tree never
/// exceeds.
pub fn train(family: Family, dataset: &Dataset, hyperparameter: f64) -> Result<FittedClassifier> {
    match family {
        Family::SupportVector => {
            if !hyperparameter.is_finite() || hyperparameter <= 0.0 {
                return Err(EvalError::configuration(format!(
                    "gamma must be finite and positive, got {}",
                    hyperparameter
                )));
            }
            let svc = SvcParams::new(hyperparameter, L2Dist).fit(dataset.points())?;
            Ok(FittedClassifier::SupportVector(svc))
        }
        Family::DecisionTree => {
            let max_depth = max_depth_from(hyperparameter)?;
            let tree = TreeParams::new(Some(max_depth)).fit(dataset.points())?;
            Ok(FittedClassifier::DecisionTree { max_depth, tree })
        }
    }
}

/// Same as [`train`], with the family given by name.
pub fn train_named(family: &str, dataset: &Dataset, hyperparameter: f64) -> Result<FittedClassifier> {
    train(family.parse()?, dataset, hyperparameter)
}

/// Train / validation / test scores of one model on one split.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct TrialResult {
    pub train: MetricVector,
    pub validation: MetricVector,
    pub test: MetricVector,
}

/// Fits on the split's train subset and scores all three subsets.
pub fn evaluate(family: Family, hyperparameter: f64, split: &Split) -> Result<TrialResult> {
    let model = train(family, &split.train, hyperparameter)?;
    Ok(TrialResult {
        train: score(&model, &split.train)?,
        validation: score(&model, &split.val)?,
        test: score(&model, &split.test)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Two classes that need two splits along the first feature.
    fn banded() -> Dataset {
        let mut ds = Dataset::default();
        for (x, label) in [(0.0, 0), (1.0, 0), (2.0, 1), (3.0, 1), (4.0, 0), (5.0, 0)] {
            ds.push(array![x, 0.0], label).unwrap();
            ds.push(array![x + 0.1, 1.0], label).unwrap();
        }
        ds
    }

    #[test]
    fn test_family_names() {
        assert_eq!("support-vector".parse::<Family>().unwrap(), Family::SupportVector);
        assert_eq!("svm".parse::<Family>().unwrap(), Family::SupportVector);
        assert_eq!("decision".parse::<Family>().unwrap(), Family::DecisionTree);
        assert_eq!(Family::DecisionTree.to_string(), "decision-tree");
        assert!(matches!(
            "random-forest".parse::<Family>(),
            Err(EvalError::UnsupportedFamily(name)) if name == "random-forest"
        ));
        assert!(matches!(
            train_named("knn", &banded(), 1.0),
            Err(EvalError::UnsupportedFamily(_))
        ));
    }

    #[test]
    fn test_tree_honours_candidate_depth() {
        let ds = banded();
        for depth in 1..=4 {
            let model = train(Family::DecisionTree, &ds, depth as f64).unwrap();
            match &model {
                FittedClassifier::DecisionTree { max_depth, tree } => {
                    assert_eq!(*max_depth, depth);
                    assert!(tree.depth() <= depth);
                }
                other => panic!("unexpected model {:?}", other.family()),
            }
        }

        let stump = train(Family::DecisionTree, &ds, 1.0).unwrap();
        let deep = train(Family::DecisionTree, &ds, 3.0).unwrap();
        assert!(score(&stump, &ds).unwrap().f1 < 1.0);
        assert_eq!(score(&deep, &ds).unwrap().f1, 1.0);
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let ds = banded();
        for bad in [0.0, -1.0, 2.5, f64::NAN] {
            assert!(matches!(
                train(Family::DecisionTree, &ds, bad),
                Err(EvalError::Configuration(_))
            ));
        }
        for bad in [0.0, -0.1, f64::INFINITY] {
            assert!(matches!(
                train(Family::SupportVector, &ds, bad),
                Err(EvalError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_svc_adapter_fits() {
        let ds = banded();
        let model = train(Family::SupportVector, &ds, 2.0).unwrap();
        assert_eq!(model.family(), Family::SupportVector);
        assert_eq!(model.name(), "support-vector (gamma=2)");
        assert!(model.predict(array![0.5, 0.5].view()).is_ok());
        assert!(matches!(
            model.predict(array![0.5].view()),
            Err(EvalError::Svc(_))
        ));
    }
}
