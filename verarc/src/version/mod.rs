//! Date extraction and "actual version" ordering.
//!
//! Version names may embed a `DD.MM.YYYY` date. Dated names sort newest
//! first; undated names sort after every dated one. Name tie-breaks depend on
//! the kind of the set: flat file sets read alphabetically, directory sets
//! read newest-named-first (descending).

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use chrono::NaiveDate;
use regex::Regex;

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{2}\.[0-9]{2}\.[0-9]{4}").expect("date pattern is valid")
});

/// Answers whether a version name refers to a directory.
pub trait EntryKinds {
    fn is_dir(&self, name: &str) -> bool;
}

impl<F> EntryKinds for F
where
    F: Fn(&str) -> bool,
{
    fn is_dir(&self, name: &str) -> bool {
        self(name)
    }
}

/// Entry kinds of one directory on disk.
#[derive(Debug, Clone)]
pub struct DirEntries {
    root: PathBuf,
}

impl DirEntries {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl EntryKinds for DirEntries {
    fn is_dir(&self, name: &str) -> bool {
        self.root.join(name).is_dir()
    }
}

/// Finds the first `DD.MM.YYYY` token in `name` and parses it.
///
/// Returns `None` when there is no token or it is not a calendar date.
pub fn extract_date(name: &str) -> Option<NaiveDate> {
    let token = DATE_TOKEN.find(name)?;
    NaiveDate::parse_from_str(token.as_str(), "%d.%m.%Y").ok()
}

/// Date used for ordering; undated names get the minimum date.
fn sort_date(name: &str) -> NaiveDate {
    extract_date(name).unwrap_or(NaiveDate::MIN)
}

/// `true` when strictly more than half of `names` are directories.
pub fn is_directory_set<S: AsRef<str>>(names: &[S], entries: &impl EntryKinds) -> bool {
    let dirs = names.iter().filter(|n| entries.is_dir(n.as_ref())).count();
    dirs * 2 > names.len()
}

fn compare_names(a: &str, b: &str, descending: bool) -> Ordering {
    let ordering = a
        .to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b));
    if descending { ordering.reverse() } else { ordering }
}

/// Orders version names by recency.
///
/// Primary key: embedded date, newest first. Secondary key: lowercase name,
/// ascending for file sets and descending for directory sets.
pub fn order_versions<S: AsRef<str>>(names: &[S], entries: &impl EntryKinds) -> Vec<String> {
    let descending_names = is_directory_set(names, entries);
    let mut keyed: Vec<(NaiveDate, &str)> = names
        .iter()
        .map(|n| (sort_date(n.as_ref()), n.as_ref()))
        .collect();
    keyed.sort_by(|(da, a), (db, b)| {
        db.cmp(da)
            .then_with(|| compare_names(a, b, descending_names))
    });
    keyed.into_iter().map(|(_, n)| n.to_string()).collect()
}

/// The most current version, or `None` for an empty set.
pub fn pick_actual<S: AsRef<str>>(names: &[S], entries: &impl EntryKinds) -> Option<String> {
    order_versions(names, entries).into_iter().next()
}
