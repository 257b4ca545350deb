//! Decides where each auxiliary attachment is written.
//!
//! Summary files are the index for coverage data: a `.coverage` attachment
//! goes wherever a summary references a file of that name, once per
//! reference. Everything else lands flat under the output folder.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::classifier::has_extension;
use super::references::ReferencePath;

/// Extension of attachments placed by summary references.
pub const MATCHABLE_EXTENSION: &str = "coverage";

/// Where one attachment goes: fetched once to `primary`, copied to `copies`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    primary: PathBuf,
    copies: Vec<PathBuf>,
}

impl Destinations {
    /// A single destination with no copies.
    #[must_use]
    pub fn single(path: PathBuf) -> Self {
        Self {
            primary: path,
            copies: Vec::new(),
        }
    }

    /// Builds from an ordered list; `None` if the list is empty.
    #[must_use]
    pub fn from_paths(paths: Vec<PathBuf>) -> Option<Self> {
        let mut paths = paths.into_iter();
        let primary = paths.next()?;
        Some(Self {
            primary,
            copies: paths.collect(),
        })
    }

    /// The path the content is downloaded to.
    #[must_use]
    pub fn primary(&self) -> &Path {
        &self.primary
    }

    /// Additional paths that receive a local copy.
    #[must_use]
    pub fn copies(&self) -> &[PathBuf] {
        &self.copies
    }

    /// All paths in order, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.primary.as_path()).chain(self.copies.iter().map(PathBuf::as_path))
    }

    /// Number of destinations (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.copies.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Ordered mapping from attachment file name to its destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationMap {
    entries: Vec<(String, Destinations)>,
}

impl DestinationMap {
    /// Destinations for `name`, if it was resolved.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Destinations> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, destinations)| destinations)
    }

    /// Entries in first-occurrence order of the input names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Destinations)> {
        self.entries
            .iter()
            .map(|(name, destinations)| (name.as_str(), destinations))
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no names were resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Final path component of a remote file name, if it names a file.
///
/// Both `/` and `\` separate components. Returns `None` for names that end
/// in a separator or whose last component is `.` or `..`.
#[must_use]
pub fn local_file_name(name: &str) -> Option<&str> {
    name.rsplit(['/', '\\'])
        .next()
        .filter(|component| !matches!(*component, "" | "." | ".."))
}

/// Resolves the destination(s) of every distinct name in `other_file_names`.
///
/// With no reference paths every name maps to `output_folder/name`. Otherwise
/// `.coverage` names map to every reference path whose file name matches
/// (duplicates collapsed); a `.coverage` name no summary references falls
/// back to the flat destination.
#[must_use]
pub fn resolve_destinations(
    reference_paths: &[ReferencePath],
    other_file_names: &[&str],
    output_folder: &Path,
) -> DestinationMap {
    let mut seen = HashSet::new();
    let entries = other_file_names
        .iter()
        .copied()
        .filter(|name| seen.insert(*name))
        .map(|name| {
            let destinations = if reference_paths.is_empty()
                || !has_extension(name, MATCHABLE_EXTENSION)
            {
                Destinations::single(output_folder.join(name))
            } else {
                referenced_destinations(reference_paths, name).unwrap_or_else(|| {
                    warn!(name, "no summary references this file; using flat layout");
                    Destinations::single(output_folder.join(name))
                })
            };
            debug!(name, count = destinations.len(), "resolved destinations");
            (name.to_string(), destinations)
        })
        .collect();

    DestinationMap { entries }
}

fn referenced_destinations(reference_paths: &[ReferencePath], name: &str) -> Option<Destinations> {
    let mut unique = HashSet::new();
    let matches = reference_paths
        .iter()
        .filter(|path| path.file_name() == Some(OsStr::new(name)))
        .filter(|path| unique.insert(*path))
        .cloned()
        .collect();
    Destinations::from_paths(matches)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn out() -> PathBuf {
        PathBuf::from("/out")
    }

    #[test]
    fn test_no_references_maps_every_name_flat() {
        let map = resolve_destinations(&[], &["a.coverage", "log.txt"], &out());
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get("a.coverage").unwrap(),
            &Destinations::single(out().join("a.coverage"))
        );
        assert_eq!(
            map.get("log.txt").unwrap(),
            &Destinations::single(out().join("log.txt"))
        );
    }

    #[test]
    fn test_coverage_follows_reference_path() {
        let refs = vec![out().join("run1/In/coverage/obj/out.coverage")];
        let map = resolve_destinations(&refs, &["out.coverage"], &out());
        let destinations = map.get("out.coverage").unwrap();
        assert_eq!(
            destinations.primary(),
            Path::new("/out/run1/In/coverage/obj/out.coverage")
        );
        assert!(destinations.copies().is_empty());
    }

    #[test]
    fn test_shared_coverage_replicated_to_each_reference() {
        let refs = vec![
            out().join("r1/In/m1/shared.coverage"),
            out().join("r1/In/m1/other.coverage"),
            out().join("r2/In/m2/shared.coverage"),
        ];
        let map = resolve_destinations(&refs, &["shared.coverage"], &out());
        let destinations = map.get("shared.coverage").unwrap();
        assert_eq!(destinations.len(), 2);
        let paths: Vec<&Path> = destinations.iter().collect();
        assert_eq!(
            paths,
            vec![
                Path::new("/out/r1/In/m1/shared.coverage"),
                Path::new("/out/r2/In/m2/shared.coverage"),
            ]
        );
    }

    #[test]
    fn test_plain_names_stay_flat_even_with_references() {
        let refs = vec![out().join("r1/In/x/log.txt")];
        let map = resolve_destinations(&refs, &["log.txt"], &out());
        assert_eq!(
            map.get("log.txt").unwrap(),
            &Destinations::single(out().join("log.txt"))
        );
    }

    #[test]
    fn test_unreferenced_coverage_falls_back_to_flat() {
        let refs = vec![out().join("r1/In/x/a.coverage")];
        let map = resolve_destinations(&refs, &["b.coverage"], &out());
        assert_eq!(
            map.get("b.coverage").unwrap(),
            &Destinations::single(out().join("b.coverage"))
        );
    }

    #[test]
    fn test_duplicate_names_collapse_in_first_occurrence_order() {
        let map = resolve_destinations(&[], &["b.txt", "a.txt", "b.txt"], &out());
        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
    }

    #[test]
    fn test_identical_reference_paths_collapse() {
        let refs = vec![
            out().join("r1/In/x/a.coverage"),
            out().join("r1/In/x/a.coverage"),
        ];
        let map = resolve_destinations(&refs, &["a.coverage"], &out());
        assert_eq!(map.get("a.coverage").unwrap().len(), 1);
    }

    #[test]
    fn test_coverage_extension_match_is_case_insensitive() {
        let refs = vec![out().join("r1/In/x/A.COVERAGE")];
        let map = resolve_destinations(&refs, &["A.COVERAGE"], &out());
        assert_eq!(
            map.get("A.COVERAGE").unwrap().primary(),
            Path::new("/out/r1/In/x/A.COVERAGE")
        );
    }

    #[test]
    fn test_local_file_name_keeps_last_component() {
        assert_eq!(local_file_name("out.coverage"), Some("out.coverage"));
        assert_eq!(local_file_name("../escaped.txt"), Some("escaped.txt"));
        assert_eq!(local_file_name("/abs/path/run.trx"), Some("run.trx"));
        assert_eq!(local_file_name("agent\\x.coverage"), Some("x.coverage"));
    }

    #[test]
    fn test_local_file_name_rejects_directory_names() {
        assert_eq!(local_file_name("dir/"), None);
        assert_eq!(local_file_name(".."), None);
        assert_eq!(local_file_name("a/."), None);
    }

    #[test]
    fn test_destinations_from_empty_paths_is_none() {
        assert!(Destinations::from_paths(Vec::new()).is_none());
    }
}
