//! Directory creation and local replication.

use std::path::Path;

use tracing::debug;

use super::ContentError;

/// Creates `path` and its parents; succeeds if it already exists.
///
/// # Errors
///
/// Returns [`ContentError::FileSystem`] if the directory cannot be created.
pub async fn ensure_dir(path: &Path) -> Result<(), ContentError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| ContentError::file_system(path, e))?;
    debug!(path = %path.display(), "directory ready");
    Ok(())
}

/// Copies `from` to `to`, overwriting `to` if present.
///
/// # Errors
///
/// Returns [`ContentError::FileSystem`] naming the destination on failure.
pub async fn copy_file(from: &Path, to: &Path) -> Result<u64, ContentError> {
    let bytes = tokio::fs::copy(from, to)
        .await
        .map_err(|e| ContentError::file_system(to, e))?;
    debug!(from = %from.display(), to = %to.display(), bytes, "copied");
    Ok(bytes)
}
