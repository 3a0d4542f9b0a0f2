//! Offline evaluation of a trained severity model against a separate file

use anyhow::{Context, Result};
use clap::Parser;
use disaster_severity_trainer::evaluate_file;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "severity-eval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Measure severity model accuracy on a held-out data file", long_about = None)]
struct Args {
    /// Evaluation data (JSON array of flat or nested records)
    #[arg(short, long, default_value = "modified_disaster_test_data.json")]
    input: PathBuf,

    /// Model artifact
    #[arg(short, long, default_value = "disaster_model.json")]
    model: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let report = evaluate_file(&args.input, &args.model).with_context(|| {
        format!(
            "Failed to evaluate {} against {}",
            args.model.display(),
            args.input.display()
        )
    })?;

    debug!(
        "{} of {} predictions match; edges {:?}",
        report.correct, report.samples, report.cut.edges
    );
    info!("Test Accuracy: {:.2}%", report.accuracy_percent);

    Ok(())
}
