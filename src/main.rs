//! CLI entry point for the test content downloader.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use test_content_core::{
    ContentStats, DownloadConfig, RetryPolicy, download_build_test_content,
};
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = match &args.command {
        Command::Build(build) => DownloadConfig::for_build(
            &build.project_uri,
            &build.token,
            &build.build_uri,
            &build.output,
        )
        .context("invalid build arguments")?,
        Command::Pipeline => DownloadConfig::from_pipeline_env()
            .context("pipeline environment is incomplete")?,
    };

    let retry_policy = RetryPolicy::new(
        u32::from(args.max_retries),
        Duration::from_millis(args.retry_delay_ms),
    );
    let config = config
        .with_retry_policy(retry_policy)
        .with_concurrency(usize::from(args.concurrency));

    info!(
        build = config.build_uri(),
        output = %config.output_folder().display(),
        "Downloading test content"
    );

    let stats = download_build_test_content(&config).await?;
    report(&stats);

    Ok(())
}

fn report(stats: &ContentStats) {
    info!(
        test_runs = stats.test_runs(),
        summaries = stats.summaries(),
        references = stats.references(),
        fetched = stats.fetched(),
        copied = stats.copied(),
        bytes = stats.bytes_fetched(),
        "Download complete"
    );
}
