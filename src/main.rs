mod agents;
mod config;
mod console;
mod document;
mod openai;
mod orchestrator;
mod schema;
mod types;
mod validation;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::agents::{ExtractorAgent, ValidatorAgent};
use crate::config::Config;
use crate::console::Console;
use crate::openai::OpenAiClient;
use crate::orchestrator::{LoopError, Orchestrator, RetryPolicy};

#[derive(Debug, Parser)]
#[command(version, about = "Extract and validate chiller plant metrics from an audit report")]
struct Args {
    /// Path to the audit report (PDF or plain text)
    document: PathBuf,

    /// Write the accepted record as JSON to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Maximum extractor/validator round-trips (overrides EXTRACTION_MAX_ATTEMPTS)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Chat model to use (overrides OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // logging
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter_layer).init();

    tracing::info!("Starting chiller audit extraction");

    let mut cfg = Config::load()?;
    if let Some(max_attempts) = args.max_attempts {
        cfg.max_attempts = max_attempts;
    }
    if let Some(model) = args.model {
        cfg.model = model;
    }
    cfg.validate()?;

    let client = OpenAiClient::new(cfg.clone())?;
    Console::display_welcome(&args.document, client.model(), cfg.max_attempts);

    let orchestrator = Orchestrator::new(
        ExtractorAgent::new(client),
        ValidatorAgent::new(),
        RetryPolicy::from_config(&cfg),
    );

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Ctrl-C handler unavailable; extraction cannot be interrupted");
            std::future::pending::<()>().await;
        }
    };

    let report = match orchestrator.run(&args.document, shutdown).await {
        Ok(report) => report,
        Err(LoopError::Cancelled { attempt }) => {
            tracing::info!("Cancelled during attempt {}", attempt);
            Console::display_cancelled();
            return Ok(ExitCode::from(130));
        }
        Err(e) => {
            let err = anyhow::Error::new(e);
            tracing::error!("{:#}", err);
            Console::display_error(&err);
            return Ok(ExitCode::FAILURE);
        }
    };

    Console::display_report(&report);
    let pretty = serde_json::to_string_pretty(&report)?;
    match &args.out {
        Some(path) => {
            tokio::fs::write(path, pretty)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Saved record to {}", path.display());
            println!("Artifact:\n  {}", path.display());
        }
        None => println!("{pretty}"),
    }

    Ok(ExitCode::SUCCESS)
}
