use digits_helpers::{group_by_label, DataPoint, Distance, Float};
use ndarray::{Array1, Array2, ArrayView1};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Errors that can occur when fitting or querying the support-vector classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum SvcError {
    /// The training data is empty.
    EmptyDataSet,
    /// Training needs at least two distinct classes.
    SingleClass,
    /// Feature vectors of different lengths were mixed.
    MismatchedDimensions { expected: usize, found: usize },
    /// Gamma must be finite and strictly positive.
    InvalidGamma,
    /// The penalty C must be finite and strictly positive.
    InvalidC,
}

impl Display for SvcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SvcError::EmptyDataSet => write!(f, "Training data is empty"),
            SvcError::SingleClass => {
                write!(f, "Training data must contain at least two classes")
            }
            SvcError::MismatchedDimensions { expected, found } => write!(
                f,
                "Feature dimension mismatch: expected {}, found {}",
                expected, found
            ),
            SvcError::InvalidGamma => write!(f, "gamma must be finite and greater than zero"),
            SvcError::InvalidC => write!(f, "C must be finite and greater than zero"),
        }
    }
}

impl Error for SvcError {}

/// Hyperparameters of an RBF-kernel C-support-vector classifier.
///
/// The kernel is `K(x, z) = exp(-gamma * d(x, z))` where `d` is the
/// `rdistance` of the configured metric (squared Euclidean for `L2Dist`).
#[derive(Debug, Clone)]
pub struct SvcParams<F, D>
where
    F: Float,
    D: Distance<F>,
{
    pub gamma: F,
    pub c: F,
    pub tolerance: F,
    pub max_iter: usize,
    distance: D,
}

impl<F, D> SvcParams<F, D>
where
    F: Float,
    D: Distance<F> + Clone,
{
    const DEFAULT_MAX_ITER: usize = 1_000_000;

    /// Creates parameters with `C = 1.0` and a stopping tolerance of `1e-3`.
    ///
    /// # Arguments
    ///
    /// * `gamma`: Width of the RBF kernel. Must be finite and greater than 0; checked by `fit`.
    /// * `distance`: The metric whose `rdistance` the kernel exponentiates (e.g., `L2Dist`).
    pub fn new(gamma: F, distance: D) -> Self {
        Self {
            gamma,
            c: F::one(),
            tolerance: F::cast(1e-3).unwrap_or_else(F::epsilon),
            max_iter: Self::DEFAULT_MAX_ITER,
            distance,
        }
    }

    /// Sets the penalty on margin violations.
    pub fn with_c(mut self, c: F) -> Self {
        self.c = c;
        self
    }

    /// Sets the maximal-violation gap at which the solver stops.
    pub fn with_tolerance(mut self, tolerance: F) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Caps solver iterations per pair of classes.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Fits one binary machine per pair of classes (one-vs-one).
    ///
    /// # Arguments
    ///
    /// * `data`: Labeled training samples, all with the same number of features.
    ///
    /// # Errors
    ///
    /// Returns `SvcError::InvalidGamma` / `SvcError::InvalidC` for bad
    /// hyperparameters, `SvcError::EmptyDataSet` for empty input,
    /// `SvcError::MismatchedDimensions` for ragged features and
    /// `SvcError::SingleClass` when only one label is present.
    pub fn fit<L>(&self, data: &[DataPoint<L, F>]) -> Result<Svc<L, F, D>, SvcError>
    where
        L: Clone + Eq + Hash + Debug + Ord,
    {
        if !self.gamma.is_finite() || self.gamma <= F::zero() {
            return Err(SvcError::InvalidGamma);
        }
        if !self.c.is_finite() || self.c <= F::zero() {
            return Err(SvcError::InvalidC);
        }
        if data.is_empty() {
            return Err(SvcError::EmptyDataSet);
        }
        let n_features = data[0].dim();
        if let Some(dp) = data.iter().find(|dp| dp.dim() != n_features) {
            return Err(SvcError::MismatchedDimensions {
                expected: n_features,
                found: dp.dim(),
            });
        }

        let groups = group_by_label(data);
        if groups.len() < 2 {
            return Err(SvcError::SingleClass);
        }
        let classes: Vec<L> = groups.keys().cloned().collect();
        let members: Vec<&Vec<usize>> = groups.values().collect();

        let mut machines = Vec::with_capacity(classes.len() * (classes.len() - 1) / 2);
        for positive in 0..classes.len() {
            for negative in (positive + 1)..classes.len() {
                let indices: Vec<usize> = members[positive]
                    .iter()
                    .chain(members[negative].iter())
                    .copied()
                    .collect();
                let y: Vec<F> = members[positive]
                    .iter()
                    .map(|_| F::one())
                    .chain(members[negative].iter().map(|_| -F::one()))
                    .collect();
                machines.push(self.fit_pair(data, &indices, &y, positive, negative));
            }
        }

        Ok(Svc {
            classes,
            machines,
            gamma: self.gamma,
            n_features,
            distance: self.distance.clone(),
        })
    }

    fn fit_pair<L>(
        &self,
        data: &[DataPoint<L, F>],
        indices: &[usize],
        y: &[F],
        positive: usize,
        negative: usize,
    ) -> BinaryMachine<F>
    where
        L: Clone + Eq + Hash + Debug,
    {
        let n = indices.len();
        let mut kernel = Array2::zeros((n, n));
        for a in 0..n {
            kernel[[a, a]] = F::one();
            for b in (a + 1)..n {
                let k = rbf(
                    &self.distance,
                    self.gamma,
                    data[indices[a]].features.view(),
                    data[indices[b]].features.view(),
                );
                kernel[[a, b]] = k;
                kernel[[b, a]] = k;
            }
        }

        let (alpha, rho) = solve_dual(&kernel, y, self.c, self.tolerance, self.max_iter);

        let mut support_vectors = Vec::new();
        let mut coef = Vec::new();
        for (t, &a) in alpha.iter().enumerate() {
            if a > F::zero() {
                support_vectors.push(data[indices[t]].features.clone());
                coef.push(a * y[t]);
            }
        }

        BinaryMachine {
            positive,
            negative,
            support_vectors,
            coef,
            rho,
        }
    }
}

fn rbf<F: Float, D: Distance<F>>(distance: &D, gamma: F, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
    (-gamma * distance.rdistance(a, b)).exp()
}

/// Solves the C-SVC dual with SMO, always updating the maximal violating pair.
///
/// Minimises `0.5 * a'Qa - e'a` subject to `y'a = 0` and `0 <= a <= C`,
/// where `Q[i][j] = y[i] * y[j] * K[i][j]`. Returns the multipliers and the
/// offset `rho` of the decision function `sum(a[t] * y[t] * K(x[t], x)) - rho`.
fn solve_dual<F: Float>(kernel: &Array2<F>, y: &[F], c: F, tolerance: F, max_iter: usize) -> (Vec<F>, F) {
    let n = y.len();
    let q = |i: usize, j: usize| y[i] * y[j] * kernel[[i, j]];
    let mut alpha = vec![F::zero(); n];
    let mut grad = vec![-F::one(); n];
    let tau = F::epsilon();

    for _ in 0..max_iter {
        // i: most violating index in I_up, j: most violating index in I_low.
        let mut g_max = F::neg_infinity();
        let mut g_max2 = F::neg_infinity();
        let mut i_sel = None;
        let mut j_sel = None;
        for t in 0..n {
            if y[t] > F::zero() {
                if alpha[t] < c && -grad[t] >= g_max {
                    g_max = -grad[t];
                    i_sel = Some(t);
                }
                if alpha[t] > F::zero() && grad[t] >= g_max2 {
                    g_max2 = grad[t];
                    j_sel = Some(t);
                }
            } else {
                if alpha[t] > F::zero() && grad[t] >= g_max {
                    g_max = grad[t];
                    i_sel = Some(t);
                }
                if alpha[t] < c && -grad[t] >= g_max2 {
                    g_max2 = -grad[t];
                    j_sel = Some(t);
                }
            }
        }
        let (i, j) = match (i_sel, j_sel) {
            (Some(i), Some(j)) if g_max + g_max2 >= tolerance => (i, j),
            _ => break,
        };

        let old_i = alpha[i];
        let old_j = alpha[j];
        if y[i] != y[j] {
            let mut quad = q(i, i) + q(j, j) + q(i, j) + q(i, j);
            if quad <= F::zero() {
                quad = tau;
            }
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > F::zero() {
                if alpha[j] < F::zero() {
                    alpha[j] = F::zero();
                    alpha[i] = diff;
                }
            } else if alpha[i] < F::zero() {
                alpha[i] = F::zero();
                alpha[j] = -diff;
            }
            if diff > F::zero() {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let mut quad = q(i, i) + q(j, j) - q(i, j) - q(i, j);
            if quad <= F::zero() {
                quad = tau;
            }
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < F::zero() {
                alpha[j] = F::zero();
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < F::zero() {
                alpha[i] = F::zero();
                alpha[j] = sum;
            }
        }

        let d_i = alpha[i] - old_i;
        let d_j = alpha[j] - old_j;
        for k in 0..n {
            grad[k] += q(i, k) * d_i + q(j, k) * d_j;
        }
    }

    let rho = offset(&alpha, &grad, y, c);
    (alpha, rho)
}

fn offset<F: Float>(alpha: &[F], grad: &[F], y: &[F], c: F) -> F {
    let mut upper = F::infinity();
    let mut lower = F::neg_infinity();
    let mut n_free = 0usize;
    let mut sum_free = F::zero();
    for t in 0..alpha.len() {
        let yg = y[t] * grad[t];
        let positive = y[t] > F::zero();
        if alpha[t] >= c {
            if positive {
                lower = lower.max(yg);
            } else {
                upper = upper.min(yg);
            }
        } else if alpha[t] <= F::zero() {
            if positive {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            n_free += 1;
            sum_free += yg;
        }
    }
    if n_free > 0 {
        sum_free / F::cast(n_free).unwrap_or_else(F::one)
    } else if upper.is_finite() && lower.is_finite() {
        (upper + lower) / (F::one() + F::one())
    } else if upper.is_finite() {
        upper
    } else if lower.is_finite() {
        lower
    } else {
        F::zero()
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
struct BinaryMachine<F: Float> {
    positive: usize,
    negative: usize,
    support_vectors: Vec<Array1<F>>,
    coef: Vec<F>,
    rho: F,
}

/// A fitted one-vs-one RBF support-vector classifier.
///
/// # Type Parameters
///
/// * `L`: The type of the label (e.g., `usize` digit classes).
/// * `F`: The float type for the features (e.g., `f32`, `f64`).
/// * `D`: The distance metric the kernel was built on.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Svc<L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    classes: Vec<L>,
    machines: Vec<BinaryMachine<F>>,
    gamma: F,
    n_features: usize,
    distance: D,
}

impl<L, F, D> Svc<L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    /// Class labels seen during training, in ascending order.
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn gamma(&self) -> F {
        self.gamma
    }

    /// Total number of support vectors across all pairwise machines.
    pub fn n_support(&self) -> usize {
        self.machines.iter().map(|m| m.support_vectors.len()).sum()
    }

    /// Predicts the label of one sample by one-vs-one majority vote.
    ///
    /// Ties go to the class that sorts first.
    ///
    /// # Arguments
    ///
    /// * `features`: An `ArrayView1` with the features of the point to classify.
    ///
    /// # Errors
    ///
    /// Returns `SvcError::MismatchedDimensions` if `features` has a different
    /// length than the training samples.
    pub fn predict(&self, features: ArrayView1<F>) -> Result<L, SvcError> {
        if features.len() != self.n_features {
            return Err(SvcError::MismatchedDimensions {
                expected: self.n_features,
                found: features.len(),
            });
        }
        let mut votes = vec![0usize; self.classes.len()];
        for machine in &self.machines {
            let decision = machine
                .support_vectors
                .iter()
                .zip(&machine.coef)
                .map(|(sv, &coef)| coef * rbf(&self.distance, self.gamma, sv.view(), features))
                .sum::<F>()
                - machine.rho;
            if decision > F::zero() {
                votes[machine.positive] += 1;
            } else {
                votes[machine.negative] += 1;
            }
        }

        let mut best = 0;
        for (idx, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = idx;
            }
        }
        Ok(self.classes[best].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digits_helpers::L2Dist;
    use ndarray::array;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn two_blobs() -> Vec<DataPoint<usize, f64>> {
        vec![
            DataPoint::new(array![0.0, 0.0], 0),
            DataPoint::new(array![0.5, 0.2], 0),
            DataPoint::new(array![0.1, 0.6], 0),
            DataPoint::new(array![5.0, 5.0], 1),
            DataPoint::new(array![5.5, 4.8], 1),
            DataPoint::new(array![4.7, 5.3], 1),
        ]
    }

    fn three_blobs(seed: u64) -> Vec<DataPoint<usize, f64>> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let centers = [(0.0, 0.0), (6.0, 0.0), (0.0, 6.0)];
        let mut data = Vec::new();
        for (label, &(cx, cy)) in centers.iter().enumerate() {
            for _ in 0..15 {
                let x = cx + rng.random_range(-1.0..1.0);
                let y = cy + rng.random_range(-1.0..1.0);
                data.push(DataPoint::new(array![x, y], label));
            }
        }
        data
    }

    #[test]
    fn test_binary_fit_and_predict() {
        let data = two_blobs();
        let svc = SvcParams::new(0.5, L2Dist).fit(&data).unwrap();

        assert_eq!(svc.classes(), &[0, 1]);
        assert!(svc.n_support() > 0);
        for dp in &data {
            assert_eq!(svc.predict(dp.features.view()).unwrap(), dp.label);
        }
        assert_eq!(svc.predict(array![0.3, 0.3].view()).unwrap(), 0);
        assert_eq!(svc.predict(array![5.2, 5.1].view()).unwrap(), 1);
    }

    #[test]
    fn test_multiclass_one_vs_one() {
        let data = three_blobs(7);
        let svc = SvcParams::new(0.5, L2Dist).with_c(10.0).fit(&data).unwrap();

        assert_eq!(svc.classes(), &[0, 1, 2]);
        let correct = data
            .iter()
            .filter(|dp| svc.predict(dp.features.view()).unwrap() == dp.label)
            .count();
        assert_eq!(correct, data.len());
        assert_eq!(svc.predict(array![6.2, -0.1].view()).unwrap(), 1);
        assert_eq!(svc.predict(array![0.1, 5.8].view()).unwrap(), 2);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = three_blobs(11);
        let a = SvcParams::new(0.1, L2Dist).fit(&data).unwrap();
        let b = SvcParams::new(0.1, L2Dist).fit(&data).unwrap();
        assert_eq!(a.n_support(), b.n_support());
        for dp in &data {
            assert_eq!(
                a.predict(dp.features.view()).unwrap(),
                b.predict(dp.features.view()).unwrap()
            );
        }
    }

    #[test]
    fn test_multipliers_respect_box_and_equality() {
        let data = two_blobs();
        let n = data.len();
        let y: Vec<f64> = data.iter().map(|dp| if dp.label == 0 { 1.0 } else { -1.0 }).collect();
        let mut kernel = Array2::zeros((n, n));
        for a in 0..n {
            for b in 0..n {
                kernel[[a, b]] = rbf(&L2Dist, 0.5, data[a].features.view(), data[b].features.view());
            }
        }
        let (alpha, _) = solve_dual(&kernel, &y, 1.0, 1e-3, 10_000);
        let balance: f64 = alpha.iter().zip(&y).map(|(a, y)| a * y).sum();
        assert!(balance.abs() < 1e-9);
        assert!(alpha.iter().all(|&a| (0.0..=1.0).contains(&a)));
    }

    /// Two interleaved classes with heavy overlap, as kernel matrix and signs.
    fn overlapping_problem(n: usize, gamma: f64) -> (Array2<f64>, Vec<f64>) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let y: Vec<f64> = (0..n).map(|t| if t % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let points: Vec<Array1<f64>> = y
            .iter()
            .map(|&label| {
                let cx = if label > 0.0 { 0.0 } else { 1.0 };
                array![cx + rng.random_range(-1.5..1.5), rng.random_range(-1.5..1.5)]
            })
            .collect();
        let mut kernel = Array2::zeros((n, n));
        for a in 0..n {
            for b in 0..n {
                kernel[[a, b]] = rbf(&L2Dist, gamma, points[a].view(), points[b].view());
            }
        }
        (kernel, y)
    }

    #[test]
    fn test_solution_satisfies_kkt_on_overlapping_classes() {
        let (kernel, y) = overlapping_problem(120, 0.5);
        let c = 1.0;
        let tolerance = 1e-3;
        let (alpha, rho) = solve_dual(&kernel, &y, c, tolerance, 100_000);
        let n = y.len();

        let grad: Vec<f64> = (0..n)
            .map(|i| (0..n).map(|j| y[i] * y[j] * kernel[[i, j]] * alpha[j]).sum::<f64>() - 1.0)
            .collect();
        let mut up = f64::NEG_INFINITY;
        let mut low = f64::INFINITY;
        for t in 0..n {
            let value = -y[t] * grad[t];
            let positive = y[t] > 0.0;
            if (positive && alpha[t] < c) || (!positive && alpha[t] > 0.0) {
                up = up.max(value);
            }
            if (positive && alpha[t] > 0.0) || (!positive && alpha[t] < c) {
                low = low.min(value);
            }
        }
        assert!(up - low < tolerance + 1e-8, "KKT gap {}", up - low);

        let balance: f64 = alpha.iter().zip(&y).map(|(a, y)| a * y).sum();
        assert!(balance.abs() < 1e-9);
        assert!(alpha.iter().any(|&a| a >= c), "overlap should leave bounded multipliers");
        assert!(rho.is_finite());
        if alpha.iter().any(|&a| a > 0.0 && a < c) {
            assert!(-up - 1e-8 <= rho && rho <= -low + 1e-8);
        }
    }

    #[test]
    fn test_solver_settings_are_honoured() {
        let data = three_blobs(5);
        let loose = SvcParams::new(0.5, L2Dist).with_max_iter(1).fit(&data).unwrap();
        assert!(loose.n_support() <= 3 * 2);

        let tight = SvcParams::new(0.5, L2Dist)
            .with_c(10.0)
            .with_tolerance(1e-6)
            .with_max_iter(50_000)
            .fit(&data)
            .unwrap();
        assert_eq!(tight.gamma(), 0.5);
        for dp in &data {
            assert_eq!(tight.predict(dp.features.view()).unwrap(), dp.label);
        }
    }

    #[test]
    fn test_offset_without_free_vectors_stays_finite() {
        // Positives at C and negatives at 0 only bound rho from below.
        let alpha = [1.0, 1.0, 0.0, 0.0];
        let y = [1.0, 1.0, -1.0, -1.0];
        let grad = [-0.5, -0.2, -0.4, -0.1];
        assert_eq!(offset(&alpha, &grad, &y, 1.0), 0.4);

        let both = offset(&[1.0, 1.0, 1.0, 1.0], &grad, &y, 1.0);
        assert!((both - -0.05).abs() < 1e-12);
    }

    #[test]
    fn test_errors() {
        let data = two_blobs();
        assert_eq!(
            SvcParams::new(0.0, L2Dist).fit(&data).unwrap_err(),
            SvcError::InvalidGamma
        );
        assert_eq!(
            SvcParams::new(f64::NAN, L2Dist).fit(&data).unwrap_err(),
            SvcError::InvalidGamma
        );
        assert_eq!(
            SvcParams::new(0.5, L2Dist).with_c(-1.0).fit(&data).unwrap_err(),
            SvcError::InvalidC
        );
        assert_eq!(
            SvcParams::new(0.5, L2Dist).fit::<usize>(&[]).unwrap_err(),
            SvcError::EmptyDataSet
        );
        let single = vec![DataPoint::new(array![1.0], 3usize), DataPoint::new(array![2.0], 3)];
        assert_eq!(
            SvcParams::new(0.5, L2Dist).fit(&single).unwrap_err(),
            SvcError::SingleClass
        );
        let ragged = vec![DataPoint::new(array![1.0, 2.0], 0usize), DataPoint::new(array![3.0], 1)];
        assert_eq!(
            SvcParams::new(0.5, L2Dist).fit(&ragged).unwrap_err(),
            SvcError::MismatchedDimensions { expected: 2, found: 1 }
        );

        let svc = SvcParams::new(0.5, L2Dist).fit(&data).unwrap();
        assert_eq!(
            svc.predict(array![1.0].view()).unwrap_err(),
            SvcError::MismatchedDimensions { expected: 2, found: 1 }
        );
    }
}
