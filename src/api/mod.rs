//! Remote test-management API: test runs, their attachments, and content.
//!
//! The orchestrator only depends on the [`TestResultsSource`] trait, so the
//! traversal logic can be driven by [`TestResultsClient`] in production and by
//! an in-memory source in tests.
//!
//! # Example
//!
//! ```no_run
//! use test_content_core::api::{RetryPolicy, TestResultsClient, TestResultsSource};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base = Url::parse("https://dev.azure.com/org/project")?;
//! let client = TestResultsClient::new(base, "pat", RetryPolicy::default())?;
//! for run in client.list_test_runs("vstfs:///Build/Build/42").await? {
//!     let attachments = client.list_attachments(&run).await?;
//!     println!("{}: {} attachments", run.label(), attachments.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use async_trait::async_trait;

mod client;
mod constants;
mod error;
mod models;
mod retry;

pub use client::{TestResultsClient, basic_authorization};
pub use constants::{ATTACHMENTS_API_VERSION, TEST_RUNS_API_VERSION};
pub use error::ApiError;
pub use models::{Attachment, SUMMARY_ATTACHMENT_TYPE, TestRun};
pub use retry::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, FailureType, RetryDecision, RetryPolicy,
    classify_error,
};

/// Source of test runs, attachment metadata and attachment bytes.
///
/// This trait uses `async_trait` so the orchestrator can hold a
/// `&dyn TestResultsSource`.
#[async_trait]
pub trait TestResultsSource: Send + Sync {
    /// Lists the test runs that belong to `build_uri`, in service order.
    async fn list_test_runs(&self, build_uri: &str) -> Result<Vec<TestRun>, ApiError>;

    /// Lists the attachments of `run`, in service order.
    async fn list_attachments(&self, run: &TestRun) -> Result<Vec<Attachment>, ApiError>;

    /// Writes the content of `attachment` to `destination`, returning the byte count.
    async fn download_attachment(
        &self,
        attachment: &Attachment,
        destination: &Path,
    ) -> Result<u64, ApiError>;
}
