use crate::Float;
use ndarray::Array1;
use std::collections::BTreeMap;
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A single labeled sample: a flat feature vector and its class.
///
/// L: The type of the label (e.g., usize digit classes).
/// F: The float type for the features (e.g., f32, f64).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct DataPoint<L, F>
where
    L: Clone + Eq + std::hash::Hash + Debug,
    F: Float,
{
    pub features: Array1<F>,
    pub label: L,
}

impl<L, F> DataPoint<L, F>
where
    L: Clone + Eq + std::hash::Hash + Debug,
    F: Float,
{
    pub fn new(features: Array1<F>, label: L) -> Self {
        DataPoint { features, label }
    }

    pub fn dim(&self) -> usize {
        self.features.len()
    }
}

/// Groups sample indices by label. Labels come back in ascending order.
pub fn group_by_label<L, F>(data: &[DataPoint<L, F>]) -> BTreeMap<L, Vec<usize>>
where
    L: Clone + Eq + std::hash::Hash + Debug + Ord,
    F: Float,
{
    let mut groups: BTreeMap<L, Vec<usize>> = BTreeMap::new();
    for (i, dp) in data.iter().enumerate() {
        groups.entry(dp.label.clone()).or_default().push(i);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_group_by_label_sorted() {
        let data = vec![
            DataPoint::new(array![0.0], 3usize),
            DataPoint::new(array![1.0], 1usize),
            DataPoint::new(array![2.0], 3usize),
        ];
        let groups = group_by_label(&data);
        let labels: Vec<_> = groups.keys().copied().collect();
        assert_eq!(labels, vec![1, 3]);
        assert_eq!(groups[&3], vec![0, 2]);
    }
}
