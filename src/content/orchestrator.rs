//! Per-build traversal: runs, summaries, references, destinations, content.
//!
//! # Overview
//!
//! For each test run of a build, in service order:
//!
//! 1. list its attachments and [`classify`] them
//! 2. download every summary to `<output>/<name>`
//! 3. [`extract_references`] from those summaries and create their directories
//! 4. [`resolve_destinations`] for the remaining attachments
//! 5. fetch each distinct name once, then copy it to any further destinations
//!
//! The first error aborts the traversal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use futures_util::{TryStreamExt, stream};
use tracing::{debug, info, instrument, warn};

use super::classifier::classify;
use super::destinations::{Destinations, local_file_name, resolve_destinations};
use super::fsops::{copy_file, ensure_dir};
use super::references::{SummaryFile, extract_references};
use super::ContentError;
use crate::api::{ApiError, Attachment, TestResultsClient, TestResultsSource, TestRun};
use crate::config::DownloadConfig;

/// Counters for one traversal.
///
/// Atomic so concurrently processed attachment units can update them.
#[derive(Debug, Default)]
pub struct ContentStats {
    test_runs: AtomicUsize,
    summaries: AtomicUsize,
    references: AtomicUsize,
    fetched: AtomicUsize,
    copied: AtomicUsize,
    bytes_fetched: AtomicU64,
}

impl ContentStats {
    /// Creates a stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Test runs processed.
    #[must_use]
    pub fn test_runs(&self) -> usize {
        self.test_runs.load(Ordering::SeqCst)
    }

    /// Summary files downloaded.
    #[must_use]
    pub fn summaries(&self) -> usize {
        self.summaries.load(Ordering::SeqCst)
    }

    /// Reference paths read from summaries.
    #[must_use]
    pub fn references(&self) -> usize {
        self.references.load(Ordering::SeqCst)
    }

    /// Network fetches of auxiliary attachments.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }

    /// Local copies made instead of refetching.
    #[must_use]
    pub fn copied(&self) -> usize {
        self.copied.load(Ordering::SeqCst)
    }

    /// Bytes received over the network, summaries included.
    #[must_use]
    pub fn bytes_fetched(&self) -> u64 {
        self.bytes_fetched.load(Ordering::SeqCst)
    }

    fn add_bytes(&self, bytes: u64) {
        self.bytes_fetched.fetch_add(bytes, Ordering::SeqCst);
    }
}

/// Downloads every test run's content for one build into an output folder.
pub struct TestContentDownloader<'a> {
    source: &'a dyn TestResultsSource,
    output_folder: PathBuf,
    concurrency: usize,
}

impl<'a> TestContentDownloader<'a> {
    /// Creates a strictly sequential downloader.
    pub fn new(source: &'a dyn TestResultsSource, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_folder: output_folder.into(),
            concurrency: 1,
        }
    }

    /// Allows up to `concurrency` attachment units of one run in flight.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Root folder content is written under.
    #[must_use]
    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Traverses every test run of `build_uri`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ContentError`] encountered; later runs are not
    /// attempted.
    #[instrument(skip(self), fields(output = %self.output_folder.display()))]
    pub async fn download_build(&self, build_uri: &str) -> Result<ContentStats, ContentError> {
        ensure_dir(&self.output_folder).await?;

        let stats = ContentStats::new();
        let runs = self.source.list_test_runs(build_uri).await?;
        info!(runs = runs.len(), "processing test runs");

        for run in &runs {
            self.download_run(run, &stats).await?;
            stats.test_runs.fetch_add(1, Ordering::SeqCst);
        }

        Ok(stats)
    }

    #[instrument(skip(self, run, stats), fields(run = %run.label()))]
    async fn download_run(&self, run: &TestRun, stats: &ContentStats) -> Result<(), ContentError> {
        let attachments = self
            .source
            .list_attachments(run)
            .await?
            .into_iter()
            .map(confine_name)
            .collect::<Result<Vec<_>, _>>()?;
        let classified = classify(attachments);
        debug!(
            summaries = classified.summaries.len(),
            others = classified.others.len(),
            "classified attachments"
        );

        let mut summary_files = Vec::with_capacity(classified.summaries.len());
        for summary in &classified.summaries {
            let path = self.output_folder.join(&summary.name);
            let bytes = self.source.download_attachment(summary, &path).await?;
            stats.add_bytes(bytes);
            stats.summaries.fetch_add(1, Ordering::SeqCst);
            summary_files.push(SummaryFile::new(summary.name.clone(), path));
        }

        let reference_paths = extract_references(&summary_files, &self.output_folder)?;
        stats
            .references
            .fetch_add(reference_paths.len(), Ordering::SeqCst);

        let mut created = HashSet::new();
        for parent in reference_paths.iter().filter_map(|path| path.parent()) {
            if created.insert(parent) {
                ensure_dir(parent).await?;
            }
        }

        let names: Vec<&str> = classified.others.iter().map(|a| a.name.as_str()).collect();
        let destination_map = resolve_destinations(&reference_paths, &names, &self.output_folder);

        let units: Vec<(&Attachment, &Destinations)> = destination_map
            .iter()
            .filter_map(|(name, destinations)| {
                classified
                    .others
                    .iter()
                    .find(|attachment| attachment.name == name)
                    .map(|attachment| (attachment, destinations))
            })
            .collect();

        let this = self;
        stream::iter(units.into_iter().map(Ok::<_, ContentError>))
            .try_for_each_concurrent(self.concurrency, move |(attachment, destinations)| {
                this.fetch_unit(attachment, destinations, stats)
            })
            .await?;

        info!(
            summaries = summary_files.len(),
            references = reference_paths.len(),
            attachments = destination_map.len(),
            "test run complete"
        );
        Ok(())
    }

    /// Fetches `attachment` once to its primary destination and copies it to the rest.
    async fn fetch_unit(
        &self,
        attachment: &Attachment,
        destinations: &Destinations,
        stats: &ContentStats,
    ) -> Result<(), ContentError> {
        let primary = destinations.primary();
        let bytes = self.source.download_attachment(attachment, primary).await?;
        stats.add_bytes(bytes);
        stats.fetched.fetch_add(1, Ordering::SeqCst);

        for copy in destinations.copies() {
            copy_file(primary, copy).await?;
            stats.copied.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Reduces a remote file name to its last component so every write stays
/// beneath the output folder.
fn confine_name(mut attachment: Attachment) -> Result<Attachment, ContentError> {
    let Some(local) = local_file_name(&attachment.name).map(str::to_string) else {
        return Err(ApiError::invalid_record(
            "attachment",
            attachment.remote_location.as_str(),
            format!("file name '{}' names no file", attachment.name),
        )
        .into());
    };
    if local != attachment.name {
        warn!(
            name = %attachment.name,
            local = %local,
            "stripped directories from attachment name"
        );
        attachment.name = local;
    }
    Ok(attachment)
}

/// Retrieves test content for a specific build described by `config`.
///
/// # Errors
///
/// Returns [`ContentError`] on the first remote, parse or file system failure.
pub async fn download_build_test_content(
    config: &DownloadConfig,
) -> Result<ContentStats, ContentError> {
    let client = TestResultsClient::new(
        config.base_api_uri().clone(),
        config.access_token(),
        config.retry_policy().clone(),
    )?;
    TestContentDownloader::new(&client, config.output_folder())
        .with_concurrency(config.concurrency())
        .download_build(config.build_uri())
        .await
}

/// Retrieves test content for the pipeline build this process runs in.
///
/// # Errors
///
/// Returns [`ContentError::Config`] when the pipeline environment is
/// incomplete, otherwise the same errors as [`download_build_test_content`].
pub async fn download_pipeline_test_content() -> Result<ContentStats, ContentError> {
    let config = DownloadConfig::from_pipeline_env()?;
    download_build_test_content(&config).await
}
