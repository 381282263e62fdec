use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tickfold::config::Config;
use tickfold::pipeline::Pipeline;
use tickfold::storage::S3Bucket;

#[derive(Parser)]
#[command(
    name = "tickfold",
    about = "Fold intraday trading records into per-instrument daily OHLC reports"
)]
struct Cli {
    /// YAML configuration file for the run.
    config: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    let source_bucket = S3Bucket::connect(&config.s3.src_endpoint_url, &config.s3.src_bucket)
        .context("failed to connect to the source bucket")?;
    let target_bucket = S3Bucket::connect(&config.s3.trg_endpoint_url, &config.s3.trg_bucket)
        .context("failed to connect to the target bucket")?;

    info!("daily report job started");
    let pipeline = Pipeline::new(
        &source_bucket,
        &target_bucket,
        config.meta.key,
        config.source,
        config.target,
    )?;
    pipeline.run()?;
    info!("daily report job finished");
    Ok(())
}
