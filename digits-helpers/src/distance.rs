use crate::Float;
use ndarray::ArrayView1;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A metric over feature vectors.
///
/// `rdistance` is a cheaper monotone stand-in for `distance` (for L2 it skips
/// the square root). Kernels and nearest-prototype searches should prefer it.
pub trait Distance<F: Float> {
    fn distance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F;

    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        self.distance(a, b)
    }
}

/// Euclidean distance. `rdistance` is the squared distance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct L2Dist;

impl<F: Float> Distance<F> for L2Dist {
    fn distance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        self.rdistance(a, b).sqrt()
    }

    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| {
                let d = x - y;
                d * d
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_l2_distance() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert_abs_diff_eq!(L2Dist.distance(a.view(), b.view()), 5.0);
        assert_abs_diff_eq!(L2Dist.rdistance(a.view(), b.view()), 25.0);
    }
}
