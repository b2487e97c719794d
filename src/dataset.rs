//! Labeled digit collections: raw 2-D images and flattened feature datasets.

use crate::error::{EvalError, Result};
use digits_helpers::DataPoint;
use ndarray::{s, Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Highest pixel intensity in the digits collection.
pub const MAX_INTENSITY: f64 = 16.0;

/// Square grayscale images with their digit labels, as loaded from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImages {
    pub images: Vec<Array2<f64>>,
    pub targets: Vec<usize>,
}

impl LabeledImages {
    /// Fails with `EvalError::Dataset` unless there is one target per image
    /// and every image has the same shape.
    pub fn new(images: Vec<Array2<f64>>, targets: Vec<usize>) -> Result<Self> {
        if images.len() != targets.len() {
            return Err(EvalError::dataset(format!(
                "{} images but {} targets",
                images.len(),
                targets.len()
            )));
        }
        if let Some(first) = images.first() {
            if let Some(bad) = images.iter().find(|img| img.dim() != first.dim()) {
                return Err(EvalError::dataset(format!(
                    "image shape {:?} differs from {:?}",
                    bad.dim(),
                    first.dim()
                )));
            }
        }
        Ok(Self { images, targets })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// `(rows, cols)` of every image, or `None` for an empty collection.
    pub fn image_shape(&self) -> Option<(usize, usize)> {
        self.images.first().map(|img| img.dim())
    }
}

/// Loads digits from a CSV file.
///
/// Each row holds `side * side` pixel intensities in `0..=16` followed by the
/// label, which is the layout of the UCI optdigits files. Blank lines and lines
/// starting with `#` are ignored.
///
/// # Errors
///
/// `EvalError::Io` when the file cannot be read and `EvalError::Dataset` for
/// any malformed row (see [`parse_csv`]).
pub fn load_csv(path: impl AsRef<Path>) -> Result<LabeledImages> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let images = parse_csv(BufReader::new(file))?;
    debug!(path = %path.display(), samples = images.len(), "loaded digits");
    Ok(images)
}

/// Parses digits CSV rows from any buffered reader.
///
/// # Errors
///
/// Returns `EvalError::Dataset` for a non-numeric field, a pixel outside
/// `0..=16` (including NaN and infinities), a label that is not a non-negative
/// integer, or a row whose pixel count is not a square or differs from the
/// first row.
pub fn parse_csv<R: BufRead>(reader: R) -> Result<LabeledImages> {
    let mut images = Vec::new();
    let mut targets = Vec::new();
    let mut side = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line_no + 1;
        let values = line
            .split(',')
            .map(|field| {
                field.trim().parse::<f64>().map_err(|_| {
                    EvalError::dataset(format!("line {}: '{}' is not a number", row, field.trim()))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let Some((&label, pixels)) = values.split_last() else {
            continue;
        };
        if label < 0.0 || label.fract() != 0.0 {
            return Err(EvalError::dataset(format!(
                "line {}: label {} is not a non-negative integer",
                row, label
            )));
        }

        if let Some(bad) = pixels.iter().find(|p| !(0.0..=MAX_INTENSITY).contains(*p)) {
            return Err(EvalError::dataset(format!(
                "line {}: pixel intensity {} is outside 0..={}",
                row, bad, MAX_INTENSITY
            )));
        }

        let row_side = (pixels.len() as f64).sqrt().round() as usize;
        if row_side == 0 || row_side * row_side != pixels.len() {
            return Err(EvalError::dataset(format!(
                "line {}: {} pixels do not form a square image",
                row,
                pixels.len()
            )));
        }
        match side {
            None => side = Some(row_side),
            Some(s) if s != row_side => {
                return Err(EvalError::dataset(format!(
                    "line {}: expected {} pixels, found {}",
                    row,
                    s * s,
                    pixels.len()
                )));
            }
            Some(_) => {}
        }

        let image = Array2::from_shape_vec((row_side, row_side), pixels.to_vec())
            .map_err(|e| EvalError::dataset(format!("line {}: {}", row, e)))?;
        images.push(image);
        targets.push(label as usize);
    }

    LabeledImages::new(images, targets)
}

/// Seven-segment strokes on an 8x8 grid as inclusive `(row0, row1, col0, col1)`
/// boxes: top, upper right, lower right, bottom, lower left, upper left, middle.
const SEGMENTS: [(usize, usize, usize, usize); 7] = [
    (0, 0, 2, 5),
    (1, 3, 6, 6),
    (5, 6, 6, 6),
    (7, 7, 2, 5),
    (5, 6, 1, 1),
    (1, 3, 1, 1),
    (4, 4, 2, 5),
];

/// Lit segments of each digit class.
const DIGIT_SEGMENTS: [&[usize]; 10] = [
    &[0, 1, 2, 3, 4, 5],
    &[1, 2],
    &[0, 1, 6, 4, 3],
    &[0, 1, 6, 2, 3],
    &[5, 6, 1, 2],
    &[0, 5, 6, 2, 3],
    &[0, 5, 6, 4, 3, 2],
    &[0, 1, 2],
    &[0, 1, 2, 3, 4, 5, 6],
    &[0, 1, 2, 3, 5, 6],
];

const STROKE_DROPOUT: f64 = 0.1;
const PIXEL_NOISE: f64 = 3.0;

/// Generates a digit-shaped stand-in collection of ten classes of 8x8 images.
///
/// Each sample draws its class's seven-segment strokes with random intensity,
/// drops each stroke with probability 0.1, shifts the image by up to one
/// column and adds per-pixel noise. Classes share strokes, so a dropped stroke
/// can turn one digit into another (an 8 without its middle is a 0) and no
/// classifier separates the collection perfectly.
pub fn synthetic_digits(samples_per_class: usize, seed: u64) -> LabeledImages {
    const SIDE: usize = 8;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let mut images = Vec::with_capacity(samples_per_class * DIGIT_SEGMENTS.len());
    let mut targets = Vec::with_capacity(samples_per_class * DIGIT_SEGMENTS.len());
    for _ in 0..samples_per_class {
        for (label, segments) in DIGIT_SEGMENTS.iter().enumerate() {
            let mut strokes = Array2::<f64>::zeros((SIDE, SIDE));
            for &segment in segments.iter() {
                if rng.random_bool(STROKE_DROPOUT) {
                    continue;
                }
                let intensity = rng.random_range(8.0..=MAX_INTENSITY);
                let (r0, r1, c0, c1) = SEGMENTS[segment];
                strokes
                    .slice_mut(s![r0..=r1, c0..=c1])
                    .mapv_inplace(|p| p.max(intensity));
            }
            let shifted = shift_columns(&strokes, rng.random_range(-1i32..=1) as isize);
            let noisy = shifted.mapv(|p| {
                (p + rng.random_range(-PIXEL_NOISE..=PIXEL_NOISE))
                    .clamp(0.0, MAX_INTENSITY)
                    .round()
            });
            images.push(noisy);
            targets.push(label);
        }
    }
    LabeledImages { images, targets }
}

/// Moves every pixel `offset` columns to the right, filling with zeros.
fn shift_columns(image: &Array2<f64>, offset: isize) -> Array2<f64> {
    let cols = image.ncols() as isize;
    Array2::from_shape_fn(image.dim(), |(r, c)| {
        let source = c as isize - offset;
        if (0..cols).contains(&source) {
            image[[r, source as usize]]
        } else {
            0.0
        }
    })
}

/// An ordered collection of flat feature vectors with digit labels.
///
/// All feature vectors share one length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    points: Vec<DataPoint<usize, f64>>,
    n_features: usize,
}

impl Dataset {
    /// Fails with `EvalError::Dataset` when feature lengths differ.
    pub fn new(points: Vec<DataPoint<usize, f64>>) -> Result<Self> {
        let n_features = points.first().map_or(0, |dp| dp.dim());
        if let Some((i, dp)) = points.iter().enumerate().find(|(_, dp)| dp.dim() != n_features) {
            return Err(EvalError::dataset(format!(
                "sample {} has {} features, expected {}",
                i,
                dp.dim(),
                n_features
            )));
        }
        Ok(Self { points, n_features })
    }

    /// Builds a dataset from a `(n_samples, n_features)` matrix and aligned labels.
    pub fn from_parts(features: Array2<f64>, labels: Vec<usize>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(EvalError::dataset(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        let n_features = features.ncols();
        let points = features
            .rows()
            .into_iter()
            .zip(labels)
            .map(|(row, label)| DataPoint::new(row.to_owned(), label))
            .collect();
        Ok(Self { points, n_features })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn points(&self) -> &[DataPoint<usize, f64>] {
        &self.points
    }

    pub fn features(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.points.iter().map(|dp| dp.features.view())
    }

    pub fn labels(&self) -> Vec<usize> {
        self.points.iter().map(|dp| dp.label).collect()
    }

    /// Copies the samples at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            points: indices.iter().map(|&i| self.points[i].clone()).collect(),
            n_features: self.n_features,
        }
    }

    /// Appends a sample; it must match the dataset's feature length.
    pub fn push(&mut self, features: Array1<f64>, label: usize) -> Result<()> {
        if self.points.is_empty() {
            self.n_features = features.len();
        } else if features.len() != self.n_features {
            return Err(EvalError::dataset(format!(
                "sample has {} features, expected {}",
                features.len(),
                self.n_features
            )));
        }
        self.points.push(DataPoint::new(features, label));
        Ok(())
    }
}
