//! Turning 2-D digit images into flat feature vectors.

use crate::dataset::{Dataset, LabeledImages};
use crate::error::{EvalError, Result};
use ndarray::Array2;
use tracing::debug;

/// Flattens every image row-major into a feature vector, optionally
/// rescaling the images first. A `scale_factor` of exactly 1 skips rescaling.
pub fn preprocess(images: &LabeledImages, scale_factor: f64) -> Result<Dataset> {
    if scale_factor == 1.0 {
        return flatten(images);
    }
    let rescaled = images
        .images
        .iter()
        .map(|img| rescale(img, scale_factor))
        .collect::<Result<Vec<_>>>()?;
    let rescaled = LabeledImages::new(rescaled, images.targets.clone())?;
    if let Some(shape) = rescaled.image_shape() {
        debug!(?shape, scale_factor, "rescaled images");
    }
    flatten(&rescaled)
}

/// Turns each `rows x cols` image into a row-major vector of `rows * cols` features.
pub fn flatten(images: &LabeledImages) -> Result<Dataset> {
    let (rows, cols) = images.image_shape().unwrap_or((0, 0));
    let n_features = rows * cols;
    let mut flat = Vec::with_capacity(images.len() * n_features);
    for img in &images.images {
        flat.extend(img.iter().copied());
    }
    let features = Array2::from_shape_vec((images.len(), n_features), flat)
        .map_err(|e| EvalError::dataset(e.to_string()))?;
    let dataset = Dataset::from_parts(features, images.targets.clone())?;
    debug!(samples = dataset.len(), features = n_features, "flattened images");
    Ok(dataset)
}

/// Resizes an image by `factor` with bilinear interpolation and no
/// anti-aliasing. Output sides are `round(side * factor)`, at least 1.
///
/// Pixel centres are aligned, so sampling positions map as
/// `src = (dst + 0.5) / factor - 0.5`, clamped to the image edge.
pub fn rescale(image: &Array2<f64>, factor: f64) -> Result<Array2<f64>> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(EvalError::configuration(format!(
            "scale factor must be finite and positive, got {}",
            factor
        )));
    }
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 {
        return Ok(image.clone());
    }
    let out_rows = ((rows as f64 * factor).round() as usize).max(1);
    let out_cols = ((cols as f64 * factor).round() as usize).max(1);
    let row_scale = rows as f64 / out_rows as f64;
    let col_scale = cols as f64 / out_cols as f64;

    let source = |dst: usize, scale: f64, len: usize| -> (usize, usize, f64) {
        let pos = ((dst as f64 + 0.5) * scale - 0.5).clamp(0.0, (len - 1) as f64);
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(len - 1);
        (lo, hi, pos - lo as f64)
    };

    Ok(Array2::from_shape_fn((out_rows, out_cols), |(r, c)| {
        let (r0, r1, dr) = source(r, row_scale, rows);
        let (c0, c1, dc) = source(c, col_scale, cols);
        let top = image[[r0, c0]] * (1.0 - dc) + image[[r0, c1]] * dc;
        let bottom = image[[r1, c0]] * (1.0 - dc) + image[[r1, c1]] * dc;
        top * (1.0 - dr) + bottom * dr
    }))
}
