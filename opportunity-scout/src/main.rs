use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use opportunity_scout::batch::analyze_batch;
use opportunity_scout::cli::{Args, Command};
use opportunity_scout::{AnalysisRequest, AnalysisResponse, Orchestrator};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = args.resolve_config()?;

    match &args.command {
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze { url, platform } => {
            let orchestrator = Orchestrator::new(config);
            let outcome = orchestrator
                .run(AnalysisRequest::new(url.as_str(), platform.as_str()))
                .await;

            if let Err(e) = &outcome {
                tracing::error!(kind = %e.kind(), "{}", e);
            }

            let response = AnalysisResponse::from(outcome);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(exit_code(response.is_error()))
        }
        Command::Batch {
            input,
            concurrency,
            output,
        } => {
            let requests = read_requests(input).await?;
            tracing::info!(
                requests = requests.len(),
                concurrency,
                "Running batch from {}",
                input.display()
            );

            let runtime = Arc::new(Orchestrator::new(config));
            let entries = analyze_batch(runtime, requests, *concurrency).await;
            let failed = entries.iter().filter(|e| e.response.is_error()).count();

            let json = serde_json::to_string_pretty(&entries)?;
            match output {
                Some(path) => {
                    tokio::fs::write(path, json)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!("Wrote {} entries to {}", entries.len(), path.display());
                }
                None => println!("{}", json),
            }

            if failed > 0 {
                tracing::warn!(failed, total = entries.len(), "Batch finished with failures");
            }
            Ok(exit_code(failed > 0))
        }
    }
}

/// Logs go to stderr so stdout stays a clean JSON document
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn read_requests(path: &Path) -> Result<Vec<AnalysisRequest>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse requests in {}", path.display()))
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
