use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use s3_load_gen::bench::BenchmarkEngine;
use s3_load_gen::cli::{Cli, Commands, HistoryArgs};
use s3_load_gen::config::persistence::ResultsStorage;
use s3_load_gen::config::ConnectionProfile;
use s3_load_gen::error::user_friendly_message;
use s3_load_gen::models::BenchmarkResult;
use s3_load_gen::progress::spawn_progress_bar;
use s3_load_gen::storage::{S3StorageClient, StorageClient};
use s3_load_gen::{LoadGenError, Result};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", user_friendly_message(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::History(args) = &cli.command {
        return show_history(args);
    }

    let common = cli
        .command
        .common()
        .ok_or_else(|| LoadGenError::ConfigError("missing benchmark options".to_string()))?;
    let profile = ConnectionProfile::load(common.config.as_deref())?;
    let config = cli
        .command
        .benchmark_config(&profile)
        .ok_or_else(|| LoadGenError::ConfigError("missing benchmark options".to_string()))?;

    config.validate()?;
    let client: Arc<dyn StorageClient> = Arc::new(S3StorageClient::new(&config));
    let engine = BenchmarkEngine::new(config.clone(), client)?;

    let report = if common.no_progress {
        engine.run(None).await?
    } else {
        let (progress_tx, progress_task) = spawn_progress_bar(config.duration);
        let outcome = engine.run(Some(progress_tx)).await;
        // The bar finishes once every worker's sender is gone.
        let _ = progress_task.await;
        outcome?
    };

    println!("{}", report.render());

    if !common.no_save {
        let saved = ResultsStorage::new()
            .and_then(|storage| storage.append_result(BenchmarkResult::new(config, report)));
        if let Err(err) = saved {
            warn!(error = %err, "could not save run history");
        }
    }

    Ok(())
}

fn show_history(args: &HistoryArgs) -> Result<()> {
    let storage = ResultsStorage::new()?;

    if args.clear {
        storage.clear_results()?;
        info!(path = %storage.path().display(), "run history cleared");
        return Ok(());
    }

    let filter = args.filter();
    let results = storage.query(filter)?;
    if results.is_empty() {
        println!("No stored runs.");
        return Ok(());
    }

    let stored = storage.count_results(filter.operation)?;
    println!("Showing {} of {} stored runs", results.len(), stored);
    for result in &results {
        println!("{}", result.summary());
    }
    Ok(())
}
