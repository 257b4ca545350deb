//! Test Content Core Library
//!
//! Retrieves the test-result artifacts of a build from a test-management
//! service and lays them out on disk the way the test summaries expect:
//! every `.trx` summary at the top of the output folder, and every coverage
//! file at the location its summary points to.
//!
//! # Architecture
//!
//! - [`api`] - HTTP client for test runs, attachments and content, with retry
//! - [`content`] - Classification, summary references, destinations, traversal
//! - [`config`] - Explicit and pipeline-environment configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod content;
mod user_agent;

// Re-export commonly used types
pub use api::{
    ApiError, Attachment, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, FailureType, RetryDecision,
    RetryPolicy, TestResultsClient, TestResultsSource, TestRun, classify_error,
};
pub use config::{ConfigError, DownloadConfig};
pub use content::{
    ContentError, ContentStats, TestContentDownloader, download_build_test_content,
    download_pipeline_test_content,
};
