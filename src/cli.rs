//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use test_content_core::DEFAULT_MAX_RETRIES;
use test_content_core::config::ACCESS_TOKEN_VAR;

/// Download the test results and coverage files of a build.
///
/// Summary (.trx) files land in the output folder; coverage files land where
/// the summaries reference them, so the summaries open with their data.
#[derive(Parser, Debug)]
#[command(name = "test-content-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Maximum retry attempts for transient failures (0-10)
    #[arg(short = 'r', long, global = true, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Delay between retry attempts in milliseconds (max 60000)
    #[arg(long, global = true, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay_ms: u64,

    /// Attachments fetched concurrently within one test run (1-16)
    #[arg(short = 'c', long, global = true, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// What to download.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the test content of an explicit build
    Build(BuildArgs),

    /// Download the test content of the pipeline build this agent is running
    Pipeline,
}

/// Arguments for `build`.
#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Organization URI followed by the project name
    #[arg(long)]
    pub project_uri: String,

    /// Access token for the test-management service
    #[arg(long, env = ACCESS_TOKEN_VAR, hide_env_values = true)]
    pub token: String,

    /// URI of the build whose test runs are downloaded
    #[arg(long)]
    pub build_uri: String,

    /// Folder receiving the downloaded content
    #[arg(short, long)]
    pub output: PathBuf,
}
