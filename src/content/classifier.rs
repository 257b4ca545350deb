//! Partitions a run's attachments into summary files and everything else.

use std::path::Path;

use crate::api::{Attachment, SUMMARY_ATTACHMENT_TYPE};

/// Extension of summary files that carry no declared type.
pub const SUMMARY_EXTENSION: &str = "trx";

/// A run's attachments split into summaries and others.
///
/// Every input attachment lands in exactly one of the two sequences, and
/// relative order is preserved within each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedAttachments {
    /// Test-run summary files.
    pub summaries: Vec<Attachment>,
    /// Auxiliary content (coverage data, logs, ...).
    pub others: Vec<Attachment>,
}

/// Returns true when `attachment` is a test-run summary.
///
/// A declared type decides on its own; without one the `.trx` extension does
/// (compared ASCII case-insensitively).
#[must_use]
pub fn is_summary(attachment: &Attachment) -> bool {
    match attachment.declared_type.as_deref() {
        Some(declared) => declared == SUMMARY_ATTACHMENT_TYPE,
        None => has_extension(&attachment.name, SUMMARY_EXTENSION),
    }
}

/// Splits `attachments` into summaries and others in a single pass.
#[must_use]
pub fn classify(attachments: Vec<Attachment>) -> ClassifiedAttachments {
    let (summaries, others) = attachments.into_iter().partition(is_summary);
    ClassifiedAttachments { summaries, others }
}

/// ASCII case-insensitive extension check on a bare file name.
pub(crate) fn has_extension(name: &str, extension: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
