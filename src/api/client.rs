//! HTTP client for the test-management REST API.
//!
//! [`TestResultsClient`] lists test runs for a build, lists each run's
//! attachments, and streams attachment content to disk. Every call goes
//! through the configured [`RetryPolicy`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{
    ATTACHMENTS_API_VERSION, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, TEST_RUNS_API_VERSION,
};
use super::models::{AttachmentRecord, ListEnvelope, TestRunRecord};
use super::{ApiError, Attachment, RetryPolicy, TestResultsSource, TestRun};
use crate::user_agent;

const JSON: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

/// Client for one project's test-management endpoints.
///
/// Created once per traversal and reused for every call so connections are
/// pooled.
#[derive(Clone)]
pub struct TestResultsClient {
    client: Client,
    base_api_uri: Url,
    authorization: HeaderValue,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for TestResultsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestResultsClient")
            .field("base_api_uri", &self.base_api_uri.as_str())
            .field("authorization", &"<redacted>")
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl TestResultsClient {
    /// Creates a client rooted at `base_api_uri` (organization URI plus project).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the underlying HTTP client cannot be
    /// built, or [`ApiError::InvalidUrl`] if the token cannot form a header.
    pub fn new(
        base_api_uri: Url,
        access_token: &str,
        retry_policy: RetryPolicy,
    ) -> Result<Self, ApiError> {
        Self::new_with_timeouts(
            base_api_uri,
            access_token,
            retry_policy,
            CONNECT_TIMEOUT_SECS,
            READ_TIMEOUT_SECS,
        )
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn new_with_timeouts(
        base_api_uri: Url,
        access_token: &str,
        retry_policy: RetryPolicy,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|e| ApiError::network(base_api_uri.as_str(), e))?;

        let mut authorization = HeaderValue::from_str(&basic_authorization(access_token))
            .map_err(|_| ApiError::invalid_url(base_api_uri.as_str()))?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            base_api_uri,
            authorization,
            retry_policy,
        })
    }

    /// Returns the retry policy applied to each call.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// URL of the test-run listing for `build_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the base URI cannot be extended.
    pub fn test_runs_url(&self, build_uri: &str) -> Result<Url, ApiError> {
        let raw = format!(
            "{}/_apis/test/runs",
            self.base_api_uri.as_str().trim_end_matches('/')
        );
        let mut url = Url::parse(&raw).map_err(|_| ApiError::invalid_url(raw))?;
        url.query_pairs_mut()
            .append_pair("api-version", TEST_RUNS_API_VERSION)
            .append_pair("buildUri", build_uri);
        Ok(url)
    }

    /// URL of the attachment listing for `run`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the run URL cannot be extended.
    pub fn attachments_url(run: &TestRun) -> Result<Url, ApiError> {
        let mut url = run.url.clone();
        url.set_query(None);
        let raw = format!("{}/attachments", url.as_str().trim_end_matches('/'));
        let mut url = Url::parse(&raw).map_err(|_| ApiError::invalid_url(raw))?;
        url.query_pairs_mut()
            .append_pair("api-version", ATTACHMENTS_API_VERSION);
        Ok(url)
    }

    async fn send(&self, url: &Url, accept: &'static str) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::timeout(url.as_str())
                } else {
                    ApiError::network(url.as_str(), e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::http_status(url.as_str(), status.as_u16()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let response = self.send(url, JSON).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::network(url.as_str(), e))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::decode(url.as_str(), e))
    }

    async fn fetch_test_runs(&self, url: &Url) -> Result<Vec<TestRun>, ApiError> {
        let envelope: ListEnvelope<TestRunRecord> = self.get_json(url).await?;
        envelope
            .value
            .into_iter()
            .map(|record| record.into_test_run(url.as_str()))
            .collect()
    }

    async fn fetch_attachments(&self, url: &Url) -> Result<Vec<Attachment>, ApiError> {
        let envelope: ListEnvelope<AttachmentRecord> = self.get_json(url).await?;
        envelope
            .value
            .into_iter()
            .map(|record| record.into_attachment(url.as_str()))
            .collect()
    }

    async fn fetch_content(&self, url: &Url, destination: &Path) -> Result<u64, ApiError> {
        let response = self.send(url, OCTET_STREAM).await?;
        let mut file = File::create(destination)
            .await
            .map_err(|e| ApiError::io(destination, e))?;
        let partial = PartialFile::new(destination);

        let result = stream_to_file(&mut file, response, url.as_str(), destination).await;
        drop(file);
        let bytes = result?;
        partial.keep();
        Ok(bytes)
    }
}

/// Removes a file that was not completely written.
///
/// Dropping the guard without calling [`keep`](Self::keep) deletes the file,
/// which also covers a download future cancelled mid-stream.
struct PartialFile<'a> {
    path: &'a Path,
    complete: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            complete: false,
        }
    }

    fn keep(mut self) {
        self.complete = true;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.complete {
            debug!(path = %self.path.display(), "removing partial file");
            let _ = std::fs::remove_file(self.path);
        }
    }
}

#[async_trait]
impl TestResultsSource for TestResultsClient {
    #[instrument(skip(self))]
    async fn list_test_runs(&self, build_uri: &str) -> Result<Vec<TestRun>, ApiError> {
        let url = self.test_runs_url(build_uri)?;
        let runs = self
            .retry_policy
            .run("list test runs", || self.fetch_test_runs(&url))
            .await?;
        info!(count = runs.len(), "listed test runs");
        Ok(runs)
    }

    #[instrument(skip(self, run), fields(run = %run.label()))]
    async fn list_attachments(&self, run: &TestRun) -> Result<Vec<Attachment>, ApiError> {
        let url = Self::attachments_url(run)?;
        let attachments = self
            .retry_policy
            .run("list attachments", || self.fetch_attachments(&url))
            .await?;
        debug!(count = attachments.len(), "listed attachments");
        Ok(attachments)
    }

    #[instrument(skip(self, attachment), fields(name = %attachment.name, path = %destination.display()))]
    async fn download_attachment(
        &self,
        attachment: &Attachment,
        destination: &Path,
    ) -> Result<u64, ApiError> {
        let url = &attachment.remote_location;
        let operation = format!("download {}", attachment.name);
        let bytes = self
            .retry_policy
            .run(&operation, || self.fetch_content(url, destination))
            .await?;
        debug!(bytes, "attachment written");
        Ok(bytes)
    }
}

/// Builds a Basic authorization value from an empty user name and `token`.
#[must_use]
pub fn basic_authorization(token: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(format!(":{token}"));
    format!("Basic {encoded}")
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, ApiError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| ApiError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ApiError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| ApiError::io(file_path, e))?;

    Ok(bytes_written)
}
