//! Disaster severity GBDT trainer CLI
//!
//! Trains the severity classifier on the exported records and writes the
//! model artifact with its hash sidecar.

use anyhow::{Context, Result};
use clap::Parser;
use disaster_severity_core::gbdt::hash_path;
use disaster_severity_trainer::{
    ClassWeight, Dataset, GbdtTrainer, TrainingParams, DEFAULT_TEST_FRACTION,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "severity-train")]
#[command(author = "Disaster Severity Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the disaster severity classifier", long_about = None)]
struct Args {
    /// Input JSON dataset (array of disaster records)
    #[arg(short, long, default_value = "disaster_data.json")]
    input: PathBuf,

    /// Output model path; the hash is written next to it
    #[arg(short, long, default_value = "disaster_model.json")]
    output: PathBuf,

    /// Maximum number of boosting rounds
    #[arg(long, default_value = "500")]
    rounds: usize,

    /// Learning rate
    #[arg(long, default_value = "0.05")]
    learning_rate: f64,

    /// Maximum tree depth
    #[arg(long, default_value = "10")]
    max_depth: usize,

    /// Maximum leaves per tree
    #[arg(long, default_value = "31")]
    num_leaves: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "20")]
    min_data_in_leaf: usize,

    /// Maximum histogram bins per feature
    #[arg(long, default_value = "255")]
    max_bin: usize,

    /// Rounds without hold-out improvement before stopping (0 disables)
    #[arg(long, default_value = "50")]
    early_stopping_rounds: usize,

    /// Weight every sample equally instead of balancing classes
    #[arg(long)]
    unweighted: bool,

    /// Hold-out fraction
    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    test_size: f64,

    /// Random seed for the train/test split
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Disaster Severity Trainer v{}", env!("CARGO_PKG_VERSION"));

    info!("Loading dataset from: {}", args.input.display());
    let dataset = Dataset::from_json(&args.input).context("Failed to load dataset")?;
    let counts = dataset.class_counts();
    info!(
        "Loaded {} samples; severity edges {:?}; class counts low={} medium={} high={}",
        dataset.len(),
        dataset.cut.edges,
        counts[0],
        counts[1],
        counts[2]
    );

    let (train, test) = dataset
        .train_test_split(args.test_size, args.seed)
        .context("Failed to split dataset")?;
    info!(
        "Split with seed {}: {} train / {} test",
        args.seed,
        train.len(),
        test.len()
    );

    let params = TrainingParams {
        num_rounds: args.rounds,
        learning_rate: args.learning_rate,
        max_depth: args.max_depth,
        num_leaves: args.num_leaves,
        min_data_in_leaf: args.min_data_in_leaf,
        max_bin: args.max_bin,
        early_stopping_rounds: args.early_stopping_rounds,
        class_weight: if args.unweighted {
            ClassWeight::Uniform
        } else {
            ClassWeight::Balanced
        },
        seed: args.seed,
        ..TrainingParams::default()
    };

    info!("Training configuration:");
    info!("  Rounds: {}", params.num_rounds);
    info!("  Learning rate: {}", params.learning_rate);
    info!("  Max depth: {}", params.max_depth);
    info!("  Leaves: {}", params.num_leaves);
    info!("  Min samples per leaf: {}", params.min_data_in_leaf);
    info!("  Early stopping: {}", params.early_stopping_rounds);
    info!("  Class weight: {:?}", params.class_weight);

    info!("Starting training...");
    let (model, report) = GbdtTrainer::new(params)
        .train(&train, &test)
        .context("Training failed")?;

    info!(
        "Training complete: {} rounds fitted, best iteration {}{}",
        report.rounds_trained,
        report.best_iteration,
        if report.stopped_early { " (early stopped)" } else { "" }
    );

    let hash = model
        .save(&args.output)
        .with_context(|| format!("Failed to write model to {}", args.output.display()))?;
    info!("Model saved to: {}", args.output.display());
    info!("Hash saved to: {} ({})", hash_path(&args.output).display(), hash);

    info!("Feature importance:");
    for importance in &report.feature_importance {
        info!(
            "  {:<20} splits={:<6} gain={:.4}",
            importance.feature, importance.splits, importance.gain
        );
    }

    info!("Accuracy: {:.4}", report.accuracy);

    Ok(())
}
