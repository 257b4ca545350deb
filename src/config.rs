//! Traversal configuration.
//!
//! [`DownloadConfig`] is built once at the boundary, either from explicit
//! values or from the pipeline agent's environment, and passed by reference
//! into the traversal. Nothing reads the environment after that.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::api::RetryPolicy;

/// Organization (collection) URI of the running pipeline.
pub const COLLECTION_URI_VAR: &str = "SYSTEM_TEAMFOUNDATIONCOLLECTIONURI";
/// Project name of the running pipeline.
pub const PROJECT_VAR: &str = "SYSTEM_TEAMPROJECT";
/// Job access token.
pub const ACCESS_TOKEN_VAR: &str = "SYSTEM_ACCESSTOKEN";
/// URI of the build being run.
pub const BUILD_URI_VAR: &str = "BUILD_BUILDURI";
/// Folder the agent reserves for test results.
pub const OUTPUT_FOLDER_VAR: &str = "COMMON_TESTRESULTSDIRECTORY";

/// Errors building a [`DownloadConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A pipeline variable is unset or blank.
    #[error("environment variable {name} is not set")]
    MissingVariable {
        /// Variable name.
        name: &'static str,
    },

    /// A required explicit value is blank.
    #[error("{field} must not be empty")]
    EmptyValue {
        /// Which value.
        field: &'static str,
    },

    /// The project URI is not an absolute http(s) URL.
    #[error("invalid project URI '{value}': {reason}")]
    InvalidUri {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The output folder cannot be made absolute.
    #[error("cannot resolve output folder {path}: {source}")]
    OutputFolder {
        /// The folder as given.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Everything one traversal needs.
#[derive(Clone)]
pub struct DownloadConfig {
    base_api_uri: Url,
    access_token: String,
    build_uri: String,
    output_folder: PathBuf,
    retry_policy: RetryPolicy,
    concurrency: usize,
}

impl std::fmt::Debug for DownloadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadConfig")
            .field("base_api_uri", &self.base_api_uri.as_str())
            .field("access_token", &"<redacted>")
            .field("build_uri", &self.build_uri)
            .field("output_folder", &self.output_folder)
            .field("retry_policy", &self.retry_policy)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl DownloadConfig {
    /// Configuration for a specific build.
    ///
    /// `project_uri` is the organization URI followed by the project name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is blank, the URI is not http(s),
    /// or the output folder cannot be made absolute.
    pub fn for_build(
        project_uri: &str,
        access_token: &str,
        build_uri: &str,
        output_folder: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let base_api_uri = parse_project_uri(project_uri)?;
        let access_token = non_empty(access_token, "access token")?;
        let build_uri = non_empty(build_uri, "build URI")?;

        let output_folder = output_folder.as_ref();
        if output_folder.as_os_str().is_empty() {
            return Err(ConfigError::EmptyValue {
                field: "output folder",
            });
        }
        let output_folder =
            std::path::absolute(output_folder).map_err(|source| ConfigError::OutputFolder {
                path: output_folder.to_path_buf(),
                source,
            })?;

        Ok(Self {
            base_api_uri,
            access_token,
            build_uri,
            output_folder,
            retry_policy: RetryPolicy::default(),
            concurrency: 1,
        })
    }

    /// Configuration for the pipeline build this process runs in.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariable`] for the first unset variable,
    /// or any error [`for_build`](Self::for_build) reports.
    pub fn from_pipeline_env() -> Result<Self, ConfigError> {
        Self::from_env_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_pipeline_env`](Self::from_pipeline_env) with an injectable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_pipeline_env`](Self::from_pipeline_env).
    pub fn from_env_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingVariable { name })
        };

        let collection_uri = require(COLLECTION_URI_VAR)?;
        let project = require(PROJECT_VAR)?;
        let access_token = require(ACCESS_TOKEN_VAR)?;
        let build_uri = require(BUILD_URI_VAR)?;
        let output_folder = require(OUTPUT_FOLDER_VAR)?;

        Self::for_build(
            &project_uri(&collection_uri, &project),
            &access_token,
            &build_uri,
            output_folder,
        )
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sets how many attachment units of one run may be fetched at once.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Organization URI plus project, without trailing slash.
    #[must_use]
    pub fn base_api_uri(&self) -> &Url {
        &self.base_api_uri
    }

    /// Token sent in the Basic authorization header.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Build whose test runs are traversed.
    #[must_use]
    pub fn build_uri(&self) -> &str {
        &self.build_uri
    }

    /// Absolute root of the output layout.
    #[must_use]
    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Retry policy for every remote call.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Attachment units in flight per run.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

/// Joins an organization URI and project name.
#[must_use]
pub fn project_uri(collection_uri: &str, project: &str) -> String {
    format!(
        "{}/{}",
        collection_uri.trim_end_matches('/'),
        project.trim_matches('/')
    )
}

fn parse_project_uri(value: &str) -> Result<Url, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyValue {
            field: "project URI",
        });
    }
    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidUri {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUri {
            value: value.to_string(),
            reason: format!("scheme '{}' is not supported", url.scheme()),
        });
    }
    Ok(url)
}

fn non_empty(value: &str, field: &'static str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ConfigError::EmptyValue { field })
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn pipeline_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (COLLECTION_URI_VAR, "https://dev.azure.com/contoso/".to_string()),
            (PROJECT_VAR, "Fabrikam".to_string()),
            (ACCESS_TOKEN_VAR, "secret-pat".to_string()),
            (BUILD_URI_VAR, "vstfs:///Build/Build/77".to_string()),
            (OUTPUT_FOLDER_VAR, "/agent/_work/_temp/TestResults".to_string()),
        ])
    }

    #[test]
    fn test_for_build_accepts_valid_values() {
        let config = DownloadConfig::for_build(
            "https://dev.azure.com/contoso/Fabrikam/",
            "pat",
            "vstfs:///Build/Build/1",
            "/tmp/results",
        )
        .unwrap();
        assert_eq!(
            config.base_api_uri().as_str(),
            "https://dev.azure.com/contoso/Fabrikam"
        );
        assert_eq!(config.build_uri(), "vstfs:///Build/Build/1");
        assert_eq!(config.output_folder(), Path::new("/tmp/results"));
        assert_eq!(config.retry_policy(), &RetryPolicy::default());
        assert_eq!(config.concurrency(), 1);
    }

    #[test]
    fn test_for_build_makes_output_absolute() {
        let config =
            DownloadConfig::for_build("https://x/p", "pat", "b", "relative/results").unwrap();
        assert!(config.output_folder().is_absolute());
        assert!(config.output_folder().ends_with("relative/results"));
    }

    #[test]
    fn test_for_build_rejects_blank_token() {
        let err = DownloadConfig::for_build("https://x/p", "  ", "b", "/out").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue { field: "access token" }));
    }

    #[test]
    fn test_for_build_rejects_non_http_uri() {
        let err = DownloadConfig::for_build("ftp://x/p", "pat", "b", "/out").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUri { .. }));
        let err = DownloadConfig::for_build("not a uri", "pat", "b", "/out").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUri { .. }));
    }

    #[test]
    fn test_from_env_lookup_joins_collection_and_project() {
        let env = pipeline_env();
        let config = DownloadConfig::from_env_lookup(|name| env.get(name).cloned()).unwrap();
        assert_eq!(
            config.base_api_uri().as_str(),
            "https://dev.azure.com/contoso/Fabrikam"
        );
        assert_eq!(config.access_token(), "secret-pat");
        assert_eq!(config.build_uri(), "vstfs:///Build/Build/77");
        assert_eq!(
            config.output_folder(),
            Path::new("/agent/_work/_temp/TestResults")
        );
    }

    #[test]
    fn test_from_env_lookup_reports_missing_variable() {
        let mut env = pipeline_env();
        env.remove(ACCESS_TOKEN_VAR);
        let err = DownloadConfig::from_env_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVariable {
                name: ACCESS_TOKEN_VAR
            }
        ));
    }

    #[test]
    fn test_from_env_lookup_treats_blank_as_missing() {
        let mut env = pipeline_env();
        env.insert(BUILD_URI_VAR, "   ".to_string());
        let err = DownloadConfig::from_env_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(err.to_string().contains(BUILD_URI_VAR));
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let env = pipeline_env();
        let config = DownloadConfig::from_env_lookup(|name| env.get(name).cloned()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-pat"), "got: {rendered}");
    }

    #[test]
    fn test_builders_override_defaults() {
        let config = DownloadConfig::for_build("https://x/p", "pat", "b", "/out")
            .unwrap()
            .with_retry_policy(RetryPolicy::new(0, Duration::ZERO))
            .with_concurrency(0);
        assert_eq!(config.retry_policy().max_retries(), 0);
        assert_eq!(config.concurrency(), 1);
    }

    #[test]
    fn test_project_uri_normalizes_slashes() {
        assert_eq!(
            project_uri("https://dev.azure.com/org/", "/proj/"),
            "https://dev.azure.com/org/proj"
        );
    }
}
