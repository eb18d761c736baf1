use catalog_fetch::adapters::csv_input;
use catalog_fetch::utils::{logger, validation::Validate};
use catalog_fetch::{CliConfig, HttpFetcher, JobConfig, JobRunner, JsonBatchSink, LocalStorage};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();
    logger::init_cli_logger(cli.verbose);

    tracing::info!("starting catalog-fetch");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match JobConfig::from_file(&cli.config) {
        Ok(config) => config.apply_cli(&cli),
        Err(e) => {
            tracing::error!("failed to load {}: {}", cli.config, e);
            eprintln!("❌ failed to load {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    // ConfigurationError fails fast, before any fetch starts.
    if let Err(e) = config.validate() {
        tracing::error!("configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let identifiers = match csv_input::load_identifiers(&config.source.input_csv) {
        Ok(identifiers) => identifiers,
        Err(e) => {
            tracing::error!("failed to read identifiers: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let fetcher = Arc::new(HttpFetcher::new(&config.source.api_url)?);
    let sink = JsonBatchSink::new(LocalStorage::new(config.output.output_dir.clone()));
    let runner = JobRunner::new(fetcher, sink, config.retry_policy(), config.job_settings());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing in-flight fetches");
                cancel.cancel();
            }
        });
    }

    match runner.run(identifiers, cancel).await {
        Ok(summary) => {
            println!(
                "✅ fetched {} records in {} batches ({} permanent failures, {} retries, {:.1}s)",
                summary.stats.succeeded,
                summary.batches_written,
                summary.stats.permanently_failed,
                summary.stats.retried,
                summary.elapsed_seconds,
            );
            let exit_code = summary.exit_code();
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
        Err(e) => {
            tracing::error!("job aborted: {}", e);
            eprintln!("❌ job aborted: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
