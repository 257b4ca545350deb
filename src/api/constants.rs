//! Constants for the API module (timeouts, endpoint versions).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large coverage files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// `api-version` sent with the test-run listing.
pub const TEST_RUNS_API_VERSION: &str = "5.0";

/// `api-version` sent with the attachment listing.
pub const ATTACHMENTS_API_VERSION: &str = "5.0-preview.1";
