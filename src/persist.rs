//! Saving and loading fitted classifiers as JSON.

use crate::error::Result;
use crate::trainer::{Classifier, FittedClassifier};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Writes `model` to `path` as JSON, replacing any existing file.
///
/// # Errors
///
/// `EvalError::Io` when the file cannot be written and `EvalError::Serde` if
/// encoding fails.
pub fn save_model(model: &FittedClassifier, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, model)?;
    writer.flush()?;
    info!(path = %path.display(), model = %model.name(), "saved model");
    Ok(())
}

/// Reads a model written by [`save_model`].
///
/// # Errors
///
/// `EvalError::Io` for a missing or unreadable file and `EvalError::Serde` for
/// content that is not a saved model.
pub fn load_model(path: impl AsRef<Path>) -> Result<FittedClassifier> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let model: FittedClassifier = serde_json::from_reader(reader)?;
    info!(path = %path.display(), model = %model.name(), "loaded model");
    Ok(model)
}
