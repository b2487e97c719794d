use anyhow::Context;
use clap::Parser;
use digits_eval::dataset::{load_csv, synthetic_digits};
use digits_eval::preprocess::preprocess;
use digits_eval::{ExperimentConfig, experiment, report};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Tune an RBF support-vector classifier and a decision tree on handwritten
/// digits, then compare them over repeated random splits.
#[derive(Debug, Parser)]
#[command(name = "digits-eval", version)]
struct Cli {
    /// CSV of digits: side*side pixel intensities then the label on each row.
    /// Without it a synthetic digit-shaped collection is used.
    #[arg(long)]
    data: Option<PathBuf>,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of random train:test:val splits in the final comparison.
    #[arg(long, default_value_t = 5)]
    trials: usize,

    /// Rescale images by this factor before flattening.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Write the best support-vector model to this path as JSON.
    #[arg(long)]
    save_model: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = ExperimentConfig::default()
        .with_seed(cli.seed)
        .with_trials(cli.trials)
        .with_scale_factor(cli.scale);
    config.validate()?;

    let images = match &cli.data {
        Some(path) => load_csv(path).with_context(|| format!("loading digits from {}", path.display()))?,
        None => {
            warn!("no --data given, using a synthetic digit collection");
            synthetic_digits(180, cli.seed)
        }
    };
    if let Some((rows, cols)) = images.image_shape() {
        println!("shape of data: ({}, {}, {})", images.len(), rows, cols);
        println!("shape of single image: ({}, {})\n", rows, cols);
    }

    let dataset = preprocess(&images, config.scale_factor)?;
    info!(samples = dataset.len(), features = dataset.n_features(), "preprocessed dataset");

    let outcome = experiment::run(&config, &dataset)?;

    println!("{}\n", report::split_sizes(&outcome.tuning));
    println!("***tuning gamma parameter for svm classifier***\n");
    println!("{}", report::sweep(digits_eval::Family::SupportVector, &outcome.svm));
    println!("***tuning max_depth parameter for decision tree classifier***\n");
    println!("{}", report::sweep(digits_eval::Family::DecisionTree, &outcome.tree));
    println!(
        "***test scores of both classifiers on {} train:test:val splits***\n",
        outcome.comparison.n_trials
    );
    println!("{}", report::comparison(&outcome.comparison));

    if let Some(path) = &cli.save_model {
        save(&outcome.svm.model, path)?;
    }
    Ok(())
}

#[cfg(feature = "serde")]
fn save(model: &digits_eval::FittedClassifier, path: &std::path::Path) -> anyhow::Result<()> {
    digits_eval::persist::save_model(model, path)
        .with_context(|| format!("saving model to {}", path.display()))
}

#[cfg(not(feature = "serde"))]
fn save(_model: &digits_eval::FittedClassifier, _path: &std::path::Path) -> anyhow::Result<()> {
    anyhow::bail!("model saving needs the `serde` feature")
}
