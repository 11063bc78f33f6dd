//! Content-addressed comparison of two version trees.
//!
//! A candidate file is unchanged when its content hash appears anywhere in
//! the existing tree, so files moved between sub-directories are not
//! reported. New/missing are decided by basename only.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;
use crate::common::hash::ContentHash;
use crate::common::names::{decrypted_path, is_temp_entry};
use crate::crypto::keystore::{decrypt_bytes, Key, KeyStoreError};

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("Version root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

#[derive(Debug, thiserror::Error)]
enum HashFailure {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Crypto(#[from] KeyStoreError),
}

/// Classification of a candidate tree against an existing one.
///
/// Paths are relative to their own root. `missing` holds existing-side paths;
/// the other three hold candidate-side paths.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub unchanged: BTreeSet<PathBuf>,
    pub changed: BTreeSet<PathBuf>,
    pub new: BTreeSet<PathBuf>,
    pub missing: BTreeSet<PathBuf>,
}

impl DiffResult {
    /// No changed, new, or missing files.
    pub fn is_identical(&self) -> bool {
        self.changed.is_empty() && self.new.is_empty() && self.missing.is_empty()
    }

    /// "No meaningful changes": everything matched and there was something
    /// to match. The caller should ask before storing such a version.
    pub fn needs_confirmation(&self) -> bool {
        !self.unchanged.is_empty() && self.is_identical()
    }

    /// One-line summary for notifications.
    pub fn summary(&self) -> String {
        format!(
            "{} unchanged, {} changed, {} new, {} missing",
            self.unchanged.len(),
            self.changed.len(),
            self.new.len(),
            self.missing.len()
        )
    }
}

/// How the files of one side are stored.
#[derive(Clone, Copy)]
enum Side<'a> {
    Plain,
    Encrypted(&'a Key),
}

struct HashedFile {
    /// Relative path; for encrypted trees, with the suffix stripped.
    rel_path: PathBuf,
    hash: ContentHash,
}

fn collect_files(root: &Path, side: Side<'_>) -> Result<Vec<(PathBuf, PathBuf)>, DiffError> {
    if !root.exists() {
        return Err(DiffError::RootNotFound(root.to_path_buf()));
    }
    let mut files = Vec::new();
    for item in WalkDir::new(root).follow_links(false) {
        let item = item.map_err(|source| DiffError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !item.file_type().is_file() {
            continue;
        }
        if item.file_name().to_str().is_some_and(is_temp_entry) {
            continue;
        }
        let rel = match item.path().strip_prefix(root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            // `root` itself is a single file.
            _ => PathBuf::from(item.file_name()),
        };
        let rel = match side {
            Side::Plain => rel,
            Side::Encrypted(_) => match decrypted_path(&rel) {
                Some(logical) => logical,
                None => {
                    tracing::debug!(path = %item.path().display(), "ignoring file without encrypted suffix");
                    continue;
                }
            },
        };
        files.push((item.path().to_path_buf(), rel));
    }
    Ok(files)
}

fn hash_one(path: &Path, side: Side<'_>) -> Result<ContentHash, HashFailure> {
    match side {
        Side::Plain => Ok(ContentHash::of_file(path)?),
        Side::Encrypted(key) => {
            let sealed = fs::read(path)?;
            Ok(ContentHash::of_bytes(&decrypt_bytes(key, &sealed)?))
        }
    }
}

/// Hashes every file under `root` in parallel. Files that fail to hash are
/// logged and left out.
fn hash_tree(root: &Path, side: Side<'_>) -> Result<Vec<HashedFile>, DiffError> {
    let files = collect_files(root, side)?;
    let hashed = files
        .into_par_iter()
        .filter_map(|(abs, rel_path)| match hash_one(&abs, side) {
            Ok(hash) => Some(HashedFile { rel_path, hash }),
            Err(e) => {
                tracing::warn!(path = %abs.display(), error = %e, "excluding file from comparison");
                None
            }
        })
        .collect();
    Ok(hashed)
}

fn basenames(files: &[HashedFile]) -> HashSet<&std::ffi::OsStr> {
    files.iter().filter_map(|f| f.rel_path.file_name()).collect()
}

fn classify(existing: &[HashedFile], candidate: &[HashedFile]) -> DiffResult {
    let existing_hashes: HashSet<ContentHash> = existing.iter().map(|f| f.hash).collect();
    let existing_names = basenames(existing);
    let candidate_names = basenames(candidate);

    let mut result = DiffResult::default();
    for file in candidate {
        let known_name = file
            .rel_path
            .file_name()
            .is_some_and(|n| existing_names.contains(n));
        if existing_hashes.contains(&file.hash) {
            result.unchanged.insert(file.rel_path.clone());
        } else if known_name {
            result.changed.insert(file.rel_path.clone());
        } else {
            result.new.insert(file.rel_path.clone());
        }
    }
    for file in existing {
        let still_there = file
            .rel_path
            .file_name()
            .is_some_and(|n| candidate_names.contains(n));
        if !still_there {
            result.missing.insert(file.rel_path.clone());
        }
    }
    result
}

/// Compares two plaintext trees.
pub fn compare(existing_root: &Path, candidate_root: &Path) -> Result<DiffResult, DiffError> {
    let existing = hash_tree(existing_root, Side::Plain)?;
    let candidate = hash_tree(candidate_root, Side::Plain)?;
    Ok(classify(&existing, &candidate))
}

/// Compares an archived (encrypted) version against a plaintext candidate.
///
/// Archived files are decrypted in memory and compared by their logical
/// names; files without the encrypted suffix are ignored.
pub fn compare_archived(
    existing_version: &Path,
    candidate_root: &Path,
    key: &Key,
) -> Result<DiffResult, DiffError> {
    let existing = hash_tree(existing_version, Side::Encrypted(key))?;
    let candidate = hash_tree(candidate_root, Side::Plain)?;
    Ok(classify(&existing, &candidate))
}
