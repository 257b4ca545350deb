//! Reads the embedded attachment references out of downloaded summary files.
//!
//! A `.trx` summary lists the auxiliary content its data collectors produced
//! as `<UriAttachment><A href="..."/></UriAttachment>` entries. Downstream
//! tooling expects that content under a per-summary tree:
//!
//! ```text
//! <output>/<summary stem, spaces as underscores>/In/<href dir>/<href file>
//! ```

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use super::ContentError;

/// Local path implied by one reference inside a summary file.
pub type ReferencePath = PathBuf;

/// Directory created under each summary's tree for referenced content.
pub const CHILD_DIR_NAME: &str = "In";

const URI_ATTACHMENT_ELEMENT: &[u8] = b"UriAttachment";
const LINK_ELEMENT: &[u8] = b"A";
const HREF_ATTRIBUTE: &str = "href";

/// A summary attachment that is already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFile {
    /// Attachment file name as listed remotely.
    pub name: String,
    /// Where it was written.
    pub path: PathBuf,
}

impl SummaryFile {
    /// Creates a summary file record.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Summary file name without its extension, spaces replaced by underscores.
#[must_use]
pub fn sanitize_summary_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name);
    stem.replace(' ', "_")
}

/// Root under which a summary's referenced content is laid out.
#[must_use]
pub fn summary_child_root(output_folder: &Path, summary_name: &str) -> PathBuf {
    output_folder
        .join(sanitize_summary_name(summary_name))
        .join(CHILD_DIR_NAME)
}

/// Joins `href` under `child_root`.
///
/// The href is percent-decoded, `/` and `\` both separate segments, `.` is
/// dropped and `..` never climbs above `child_root`. Returns `None` when no
/// file segment remains.
#[must_use]
pub fn reference_path(child_root: &Path, href: &str) -> Option<ReferencePath> {
    let decoded = urlencoding::decode(href).unwrap_or(Cow::Borrowed(href));
    let mut path = child_root.to_path_buf();
    let mut depth = 0usize;

    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if depth > 0 {
                    path.pop();
                    depth -= 1;
                }
            }
            name => {
                path.push(name);
                depth += 1;
            }
        }
    }

    (depth > 0).then_some(path)
}

/// Computes the reference paths for every summary, in input then discovery order.
///
/// # Errors
///
/// Returns [`ContentError::Parse`] for the first summary that is missing,
/// unreadable or not well-formed.
pub fn extract_references(
    summaries: &[SummaryFile],
    output_folder: &Path,
) -> Result<Vec<ReferencePath>, ContentError> {
    summaries.iter().try_fold(Vec::new(), |mut paths, summary| {
        let child_root = summary_child_root(output_folder, &summary.name);
        for href in read_reference_hrefs(&summary.path)? {
            match reference_path(&child_root, &href) {
                Some(path) => paths.push(path),
                None => warn!(summary = %summary.name, href = %href, "ignoring empty reference"),
            }
        }
        Ok(paths)
    })
}

/// Reads the raw `href` values from the summary file at `path`.
///
/// # Errors
///
/// Returns [`ContentError::Parse`] if the file cannot be read or parsed.
pub fn read_reference_hrefs(path: &Path) -> Result<Vec<String>, ContentError> {
    let bytes = std::fs::read(path).map_err(|e| ContentError::parse(path, e.to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ContentError::parse(path, format!("not valid UTF-8: {e}")))?;
    let hrefs = parse_reference_hrefs(&text).map_err(|reason| ContentError::parse(path, reason))?;
    debug!(path = %path.display(), count = hrefs.len(), "read summary references");
    Ok(hrefs)
}

/// Collects `href` values of `A` elements nested in `UriAttachment` elements.
///
/// Element names are matched without namespace prefixes. The document must
/// have a root element and balanced tags.
pub(crate) fn parse_reference_hrefs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    let mut hrefs = Vec::new();
    let mut depth = 0usize;
    let mut open_uri_attachments = 0usize;
    let mut seen_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{e} (at byte {})", reader.buffer_position()))?;
        match event {
            Event::Start(element) => {
                if seen_root && depth == 0 {
                    return Err("more than one root element".to_string());
                }
                seen_root = true;
                depth += 1;
                if element.local_name().as_ref() == URI_ATTACHMENT_ELEMENT {
                    open_uri_attachments += 1;
                }
                if open_uri_attachments > 0 {
                    push_href(&element, &mut hrefs)?;
                }
            }
            Event::Empty(element) => {
                if seen_root && depth == 0 {
                    return Err("more than one root element".to_string());
                }
                seen_root = true;
                if open_uri_attachments > 0 {
                    push_href(&element, &mut hrefs)?;
                }
            }
            Event::End(element) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced closing tag".to_string())?;
                if element.local_name().as_ref() == URI_ATTACHMENT_ELEMENT {
                    open_uri_attachments = open_uri_attachments.saturating_sub(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err("document has no root element".to_string());
    }
    if depth != 0 {
        return Err("unexpected end of document".to_string());
    }
    Ok(hrefs)
}

fn push_href(element: &BytesStart<'_>, hrefs: &mut Vec<String>) -> Result<(), String> {
    if element.local_name().as_ref() != LINK_ELEMENT {
        return Ok(());
    }
    let attribute = element
        .try_get_attribute(HREF_ATTRIBUTE)
        .map_err(|e| format!("bad attribute on <A>: {e}"))?;
    if let Some(attribute) = attribute {
        let value = attribute
            .unescape_value()
            .map_err(|e| format!("bad href value: {e}"))?;
        hrefs.push(value.into_owned());
    }
    Ok(())
}
