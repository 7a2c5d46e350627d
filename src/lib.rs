pub mod analysis;
pub mod catalog;
pub mod completeness;
pub mod config;
pub mod insights;
pub mod models;
pub mod narrative;
pub mod normalization;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use analysis::{compose, AnalysisError, AnalysisRequest, CompositionOptions};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("usage: labsight <request.json>")]
    Usage,

    #[error("Cannot read {0}: {1}")]
    Read(String, String),

    #[error("Invalid request {0}: {1}")]
    Request(String, String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Cannot serialize result: {0}")]
    Output(#[from] serde_json::Error),
}

/// CLI entry point: `labsight <request.json>` prints the analysis result
/// JSON on stdout. Logs go to stderr.
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => {
            eprintln!("{}", CliError::Usage);
            return ExitCode::from(2);
        }
    };

    match execute(&path) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Analysis failed");
            eprintln!("labsight: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Reads a request file, runs one analysis and renders the result.
pub fn execute(path: &Path) -> Result<String, CliError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| CliError::Read(display.clone(), e.to_string()))?;
    let request: AnalysisRequest =
        serde_json::from_str(&content).map_err(|e| CliError::Request(display, e.to_string()))?;

    // Composed outside the runtime: the narrative client is blocking.
    let orchestrator = compose(&CompositionOptions::from_env())?;
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    let (input, profile, options) = request.into_parts();
    let result = runtime.block_on(orchestrator.run_analysis(input, profile, options))?;
    Ok(serde_json::to_string_pretty(&result)?)
}
