//! Error types for the remote test-management API.
//!
//! Every variant carries the URL or path it concerns so a failure deep inside
//! a multi-run traversal still reads meaningfully in a log line.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while talking to the test-management API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Local file system error while writing downloaded content.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A URL could not be built or parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Response body was not the expected JSON shape.
    #[error("malformed response from {url}: {source}")]
    Decode {
        /// The URL whose response failed to decode.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A record decoded but one of its required fields is unusable.
    #[error("invalid {record} record from {url}: {reason}")]
    InvalidRecord {
        /// Which kind of record (`test run`, `attachment`).
        record: &'static str,
        /// The URL the record came from.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Every attempt of a retried operation failed.
    #[error("{operation} failed after {retries} retries: {source}")]
    RetriesExhausted {
        /// Human-readable operation name.
        operation: String,
        /// Number of retries performed after the initial attempt.
        retries: u32,
        /// The last failure observed.
        #[source]
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid-record error.
    pub fn invalid_record(
        record: &'static str,
        url: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRecord {
            record,
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Wraps the last failure of an exhausted retry loop.
    pub fn retries_exhausted(operation: impl Into<String>, retries: u32, last: ApiError) -> Self {
        Self::RetriesExhausted {
            operation: operation.into(),
            retries,
            source: Box::new(last),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_http_status_display() {
        let error = ApiError::http_status("https://dev.azure.com/org/_apis/test/runs", 401);
        let msg = error.to_string();
        assert!(msg.contains("401"), "Expected '401' in: {msg}");
        assert!(msg.contains("_apis/test/runs"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_api_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = ApiError::io(PathBuf::from("/tmp/out/run1.trx"), io_error);
        assert!(error.to_string().contains("/tmp/out/run1.trx"));
    }

    #[test]
    fn test_api_error_invalid_record_display() {
        let error = ApiError::invalid_record("attachment", "https://x/attachments", "empty fileName");
        let msg = error.to_string();
        assert!(msg.contains("invalid attachment record"), "got: {msg}");
        assert!(msg.contains("empty fileName"), "got: {msg}");
    }

    #[test]
    fn test_api_error_retries_exhausted_includes_count_and_cause() {
        let last = ApiError::http_status("https://x/runs", 503);
        let error = ApiError::retries_exhausted("list test runs", 3, last);
        let msg = error.to_string();
        assert!(msg.contains("list test runs"), "got: {msg}");
        assert!(msg.contains("3 retries"), "got: {msg}");
        assert!(msg.contains("HTTP 503"), "got: {msg}");
    }

    #[test]
    fn test_api_error_decode_display() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = ApiError::decode("https://x/runs", source);
        assert!(error.to_string().starts_with("malformed response from https://x/runs"));
    }
}
