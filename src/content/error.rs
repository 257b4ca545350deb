//! Error taxonomy for the download traversal.

use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;

/// Fatal conditions that abort a traversal. There is no partial-success mode.
#[derive(Debug, Error)]
pub enum ContentError {
    /// A remote call failed, including after its retry budget.
    #[error("remote error: {0}")]
    Remote(ApiError),

    /// A downloaded summary file is missing, unreadable or not well-formed.
    #[error("cannot read references from summary {path}: {reason}")]
    Parse {
        /// The summary file on disk.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The traversal could not be configured.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A directory or file could not be created, written or copied.
    #[error("file system error at {path}: {source}")]
    FileSystem {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ContentError {
    /// Creates a summary parse error.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a file system error.
    pub fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }
}

// A local write failure while streaming content is a file system problem,
// not a remote one.
impl From<ApiError> for ContentError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Io { path, source } => Self::FileSystem { path, source },
            other => Self::Remote(other),
        }
    }
}
