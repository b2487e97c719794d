use digits_helpers::{group_by_label, DataPoint, Float};
use ndarray::ArrayView1;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Errors that can occur when growing or querying a decision tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    /// The training data is empty.
    EmptyDataSet,
    /// Feature vectors of different lengths were mixed.
    MismatchedDimensions { expected: usize, found: usize },
    /// `max_depth` must be at least 1 when given.
    InvalidMaxDepth,
    /// `min_samples_split` must be at least 2 and `min_samples_leaf` at least 1.
    InvalidMinSamples,
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::EmptyDataSet => write!(f, "Training data is empty"),
            TreeError::MismatchedDimensions { expected, found } => write!(
                f,
                "Feature dimension mismatch: expected {}, found {}",
                expected, found
            ),
            TreeError::InvalidMaxDepth => write!(f, "max_depth must be at least 1"),
            TreeError::InvalidMinSamples => write!(
                f,
                "min_samples_split must be at least 2 and min_samples_leaf at least 1"
            ),
        }
    }
}

impl Error for TreeError {}

/// Growth limits for a CART classification tree using Gini impurity.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl TreeParams {
    /// Default limits with the given depth cap; `None` grows until leaves are pure.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Grows a tree on `data`.
    ///
    /// Nodes stop splitting when they are pure, when `max_depth` is reached,
    /// when they hold fewer than `min_samples_split` samples, or when no
    /// threshold leaves `min_samples_leaf` samples on both sides.
    ///
    /// # Arguments
    ///
    /// * `data`: Labeled training samples, all with the same number of features.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::InvalidMaxDepth` for `Some(0)`,
    /// `TreeError::InvalidMinSamples` for limits below their minimum,
    /// `TreeError::EmptyDataSet` for empty input and
    /// `TreeError::MismatchedDimensions` for ragged features.
    pub fn fit<L, F>(&self, data: &[DataPoint<L, F>]) -> Result<DecisionTree<L, F>, TreeError>
    where
        L: Clone + Eq + Hash + Debug + Ord,
        F: Float,
    {
        if self.max_depth == Some(0) {
            return Err(TreeError::InvalidMaxDepth);
        }
        if self.min_samples_split < 2 || self.min_samples_leaf < 1 {
            return Err(TreeError::InvalidMinSamples);
        }
        if data.is_empty() {
            return Err(TreeError::EmptyDataSet);
        }
        let n_features = data[0].dim();
        if let Some(dp) = data.iter().find(|dp| dp.dim() != n_features) {
            return Err(TreeError::MismatchedDimensions {
                expected: n_features,
                found: dp.dim(),
            });
        }

        let groups = group_by_label(data);
        let classes: Vec<L> = groups.keys().cloned().collect();
        let mut class_of = vec![0usize; data.len()];
        for (class_idx, members) in groups.values().enumerate() {
            for &i in members {
                class_of[i] = class_idx;
            }
        }

        let builder = Builder {
            params: self,
            data,
            class_of: &class_of,
            n_classes: classes.len(),
            n_features,
        };
        let indices: Vec<usize> = (0..data.len()).collect();
        let root = builder.grow(indices, 0);

        Ok(DecisionTree {
            root,
            classes,
            n_features,
        })
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
enum Node<F> {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: F,
        left: Box<Node<F>>,
        right: Box<Node<F>>,
    },
}

impl<F> Node<F> {
    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

struct Builder<'a, L, F>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    params: &'a TreeParams,
    data: &'a [DataPoint<L, F>],
    class_of: &'a [usize],
    n_classes: usize,
    n_features: usize,
}

struct Candidate<F> {
    feature: usize,
    threshold: F,
    impurity: f64,
}

impl<L, F> Builder<'_, L, F>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    fn grow(&self, indices: Vec<usize>, depth: usize) -> Node<F> {
        let counts = self.class_counts(&indices);
        let majority = majority_class(&counts);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_reached || indices.len() < self.params.min_samples_split {
            return Node::Leaf { class: majority };
        }

        let Some(best) = self.best_split(&indices, &counts) else {
            return Node::Leaf { class: majority };
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.data[i].features[best.feature] <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(left, depth + 1)),
            right: Box::new(self.grow(right, depth + 1)),
        }
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.class_of[i]] += 1;
        }
        counts
    }

    /// Scans every feature for the threshold with the lowest weighted Gini
    /// impurity. Earlier features win ties.
    fn best_split(&self, indices: &[usize], counts: &[usize]) -> Option<Candidate<F>> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let mut best: Option<Candidate<F>> = None;
        let mut order = indices.to_vec();

        for feature in 0..self.n_features {
            let value = |i: usize| self.data[i].features[feature];
            order.sort_by(|&a, &b| value(a).partial_cmp(&value(b)).unwrap_or(Ordering::Equal));

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();
            for pos in 0..(n - 1) {
                let class = self.class_of[order[pos]];
                left[class] += 1;
                right[class] -= 1;

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let lo = value(order[pos]);
                let hi = value(order[pos + 1]);
                if !(lo < hi) {
                    continue;
                }

                let impurity = weighted_gini(&left, n_left) + weighted_gini(&right, n_right);
                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    let mut threshold = (lo + hi) / (F::one() + F::one());
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(Candidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

/// `n * gini(counts)`, i.e. the Gini impurity weighted by node size.
fn weighted_gini(counts: &[usize], n: usize) -> f64 {
    let n = n as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
    n - sum_sq / n
}

fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0;
    for (idx, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = idx;
        }
    }
    best
}

/// A fitted CART classification tree.
///
/// # Type Parameters
///
/// * `L`: The type of the label (e.g., `usize` digit classes).
/// * `F`: The float type for the features and thresholds.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct DecisionTree<L, F>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    root: Node<F>,
    classes: Vec<L>,
    n_features: usize,
}

impl<L, F> DecisionTree<L, F>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    /// Length of the longest root-to-leaf path; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    /// Class labels seen during training, in ascending order.
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    /// Walks the tree from the root; a sample equal to a threshold goes left.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::MismatchedDimensions` if `features` has a different
    /// length than the training samples.
    pub fn predict(&self, features: ArrayView1<F>) -> Result<L, TreeError> {
        if features.len() != self.n_features {
            return Err(TreeError::MismatchedDimensions {
                expected: self.n_features,
                found: features.len(),
            });
        }
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { class } => return Ok(self.classes[*class].clone()),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}
