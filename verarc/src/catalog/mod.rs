//! Group/version discovery over the storage root.
//!
//! Nothing is cached: every call re-reads the directory listing, so results
//! always reflect the current state of the shared storage path.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use crate::common::names::{is_temp_entry, logical_name};
use crate::version::{pick_actual, order_versions, DirEntries};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The storage root does not exist or is not a directory.
    #[error("Storage root is missing or not a directory: {0}")]
    RootUnavailable(PathBuf),

    /// The requested group does not exist.
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Failed to read directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Whether a version is stored as a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionKind {
    File,
    Directory,
}

/// One search hit: a group and, if it has any, a version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchHit {
    pub group: String,
    pub version: Option<String>,
}

/// Read-only view of the archive tree rooted at `versions_path`.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn group_path(&self, group: &str) -> PathBuf {
        self.root.join(group)
    }

    pub fn version_path(&self, group: &str, version: &str) -> PathBuf {
        self.root.join(group).join(version)
    }

    /// Kind of an existing version entry, `None` if it does not exist.
    pub fn version_kind(&self, group: &str, version: &str) -> Option<VersionKind> {
        let meta = fs::metadata(self.version_path(group, version)).ok()?;
        Some(if meta.is_dir() {
            VersionKind::Directory
        } else {
            VersionKind::File
        })
    }

    /// Immediate subdirectories of the root, sorted and de-duplicated.
    pub fn try_list_groups(&self) -> Result<Vec<String>, CatalogError> {
        if !self.root.is_dir() {
            return Err(CatalogError::RootUnavailable(self.root.clone()));
        }
        let io_err = |source| CatalogError::Io {
            path: self.root.clone(),
            source,
        };
        let mut groups = BTreeSet::new();
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
                || entry.path().is_dir();
            if !is_dir {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => {
                    groups.insert(name);
                }
                Err(raw) => tracing::warn!(name = ?raw, "skipping group with non UTF-8 name"),
            }
        }
        Ok(groups.into_iter().collect())
    }

    /// Like [`try_list_groups`](Self::try_list_groups), but never fails:
    /// errors are logged and an empty list is returned.
    pub fn list_groups(&self) -> Vec<String> {
        self.try_list_groups().unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to list groups");
            Vec::new()
        })
    }

    /// Entries of a group, temp artifacts excluded, ordered by recency.
    pub fn try_list_versions(&self, group: &str) -> Result<Vec<String>, CatalogError> {
        let group_path = self.group_path(group);
        if !self.root.is_dir() {
            return Err(CatalogError::RootUnavailable(self.root.clone()));
        }
        if !group_path.is_dir() {
            return Err(CatalogError::GroupNotFound(group.to_string()));
        }
        let io_err = |source| CatalogError::Io {
            path: group_path.clone(),
            source,
        };
        let mut names = Vec::new();
        for entry in fs::read_dir(&group_path).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            match entry.file_name().into_string() {
                Ok(name) if !name.is_empty() && !is_temp_entry(&name) => names.push(name),
                Ok(_) => {}
                Err(raw) => tracing::warn!(name = ?raw, group, "skipping version with non UTF-8 name"),
            }
        }
        Ok(order_versions(&names, &DirEntries::new(&group_path)))
    }

    /// Soft-failing variant of [`try_list_versions`](Self::try_list_versions).
    pub fn list_versions(&self, group: &str) -> Vec<String> {
        self.try_list_versions(group).unwrap_or_else(|e| {
            tracing::error!(error = %e, group, "failed to list versions");
            Vec::new()
        })
    }

    /// The most current version of a group, if it has any.
    pub fn actual_version(&self, group: &str) -> Option<String> {
        let versions = self.list_versions(group);
        pick_actual(&versions, &DirEntries::new(&self.group_path(group)))
    }

    /// Case-insensitive search over group names and each group's actual
    /// version. Groups without versions match on their name alone.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let Some(needle) = normalize_query(query) else {
            return Vec::new();
        };
        let mut hits = Vec::new();
        for group in self.list_groups() {
            let version = self.actual_version(&group);
            if matches(&needle, &group, version.as_deref()) {
                push_unique(&mut hits, SearchHit { group, version });
            }
        }
        hits
    }

    /// Like [`search`](Self::search), expanded to every version of every
    /// group. Version-less groups contribute a `(group, None)` hit.
    pub fn search_all(&self, query: &str) -> Vec<SearchHit> {
        let Some(needle) = normalize_query(query) else {
            return Vec::new();
        };
        let mut hits = Vec::new();
        for group in self.list_groups() {
            let versions = self.list_versions(&group);
            if versions.is_empty() {
                if matches(&needle, &group, None) {
                    push_unique(&mut hits, SearchHit { group, version: None });
                }
                continue;
            }
            for version in versions {
                if matches(&needle, &group, Some(&version)) {
                    push_unique(
                        &mut hits,
                        SearchHit {
                            group: group.clone(),
                            version: Some(version),
                        },
                    );
                }
            }
        }
        hits
    }
}

fn normalize_query(query: &str) -> Option<String> {
    let needle = query.trim().to_lowercase();
    (!needle.is_empty()).then_some(needle)
}

/// `needle` in the group name OR in the version name.
fn matches(needle: &str, group: &str, version: Option<&str>) -> bool {
    let in_group = group.trim().to_lowercase().contains(needle);
    let in_version = version
        .map(|v| logical_name(v).trim().to_lowercase().contains(needle))
        .unwrap_or(false);
    in_group || in_version
}

fn push_unique(hits: &mut Vec<SearchHit>, hit: SearchHit) {
    if !hits.contains(&hit) {
        hits.push(hit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn sample_archive() -> (TempDir, Catalog) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Alpha/v1 01.01.2024")).unwrap();
        fs::create_dir_all(root.join("Alpha/v2 05.01.2024")).unwrap();
        fs::create_dir_all(root.join("Beta")).unwrap();
        fs::write(root.join("Beta/manual.pdf.enc"), b"x").unwrap();
        fs::write(root.join("Beta/~$manual.pdf.enc"), b"lock").unwrap();
        fs::create_dir_all(root.join("Empty")).unwrap();
        fs::write(root.join("stray.txt"), b"not a group").unwrap();
        let catalog = Catalog::new(root);
        (dir, catalog)
    }

    #[test]
    fn test_list_groups_only_directories_sorted() {
        let (_dir, catalog) = sample_archive();
        assert_eq!(catalog.list_groups(), vec!["Alpha", "Beta", "Empty"]);
    }

    #[test]
    fn test_list_versions_excludes_temp_entries() {
        let (_dir, catalog) = sample_archive();
        assert_eq!(catalog.list_versions("Beta"), vec!["manual.pdf.enc"]);
        assert_eq!(
            catalog.list_versions("Alpha"),
            vec!["v2 05.01.2024", "v1 01.01.2024"]
        );
        assert!(catalog.list_versions("Empty").is_empty());
    }

    #[test]
    fn test_actual_version() {
        let (_dir, catalog) = sample_archive();
        assert_eq!(catalog.actual_version("Alpha").as_deref(), Some("v2 05.01.2024"));
        assert_eq!(catalog.actual_version("Empty"), None);
        assert_eq!(catalog.actual_version("Missing"), None);
    }

    #[test]
    fn test_missing_root_fails_soft() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new(&dir.path().join("nope"));
        assert!(catalog.list_groups().is_empty());
        assert!(catalog.list_versions("Alpha").is_empty());
        assert!(catalog.search("a").is_empty());
        assert!(matches!(
            catalog.try_list_groups(),
            Err(CatalogError::RootUnavailable(_))
        ));
    }

    #[test]
    fn test_search_matches_group_or_actual_version() {
        let (_dir, catalog) = sample_archive();
        assert_eq!(
            catalog.search("beta"),
            vec![SearchHit {
                group: "Beta".into(),
                version: Some("manual.pdf.enc".into())
            }]
        );
        // Matches Alpha through its actual version's date.
        assert_eq!(
            catalog.search("05.01"),
            vec![SearchHit {
                group: "Alpha".into(),
                version: Some("v2 05.01.2024".into())
            }]
        );
        // The non-actual version is not searched.
        assert!(catalog.search("01.01.2024").is_empty());
        assert_eq!(
            catalog.search("  EMPTY "),
            vec![SearchHit {
                group: "Empty".into(),
                version: None
            }]
        );
        assert!(catalog.search("   ").is_empty());
    }

    #[test]
    fn test_search_all_expands_versions() {
        let (_dir, catalog) = sample_archive();
        let hits = catalog.search_all("alpha");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.group == "Alpha" && h.version.is_some()));

        assert_eq!(
            catalog.search_all("01.01.2024"),
            vec![SearchHit {
                group: "Alpha".into(),
                version: Some("v1 01.01.2024".into())
            }]
        );
        assert_eq!(
            catalog.search_all("empty"),
            vec![SearchHit {
                group: "Empty".into(),
                version: None
            }]
        );
    }

    #[test]
    fn test_search_does_not_match_encrypted_suffix() {
        let (_dir, catalog) = sample_archive();
        assert!(catalog.search("enc").is_empty());
    }
}
