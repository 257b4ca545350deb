//! Test content layout: which attachments are summaries, what they reference,
//! and where each attachment is written.
//!
//! The pure parts ([`classify`], [`extract_references`], [`resolve_destinations`])
//! never touch the network. [`TestContentDownloader`] drives them against a
//! [`TestResultsSource`](crate::api::TestResultsSource).

mod classifier;
mod destinations;
mod error;
mod fsops;
mod orchestrator;
mod references;

pub use classifier::{ClassifiedAttachments, SUMMARY_EXTENSION, classify, is_summary};
pub use destinations::{
    DestinationMap, Destinations, MATCHABLE_EXTENSION, local_file_name, resolve_destinations,
};
pub use error::ContentError;
pub use fsops::{copy_file, ensure_dir};
pub use orchestrator::{
    ContentStats, TestContentDownloader, download_build_test_content,
    download_pipeline_test_content,
};
pub use references::{
    CHILD_DIR_NAME, ReferencePath, SummaryFile, extract_references, read_reference_hrefs,
    reference_path, sanitize_summary_name, summary_child_root,
};
