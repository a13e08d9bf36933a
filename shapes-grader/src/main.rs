//! # Shapes Grader
//!
//! Prints a JSON grading report for a saved exercise result.

use std::process::ExitCode;

use clap::Parser;
use shapes_grader::{grade, load_model, load_result, CliArgs, GraderConfig, Report};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();
    match run(args) {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    tracing::error!("Failed to serialize report: {e}");
                    return ExitCode::from(2);
                }
            }
            if report.summary.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,shapes_core=debug".into());
    let json = std::env::var("RUST_LOG_FORMAT").is_ok_and(|format| format == "json");

    // Logs go to stderr so stdout carries only the report.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run(args: CliArgs) -> anyhow::Result<Report> {
    let config = GraderConfig::try_from(args)?;
    tracing::info!("Grading {} against {:?}", config.model.display(), config.source);

    let mut model = load_model(&config.model)?;
    let result = load_result(&config.source)?;
    grade(&mut model, result)
}
