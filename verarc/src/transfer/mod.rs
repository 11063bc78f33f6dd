//! Recursive copy with per-file encryption (write path) or decryption (read
//! path).
//!
//! The source tree is enumerated before anything is written so progress is
//! a true fraction of the whole. On failure the files already written stay
//! where they are; nothing is rolled back.

mod progress;

pub use progress::{NoProgress, ProgressSink};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use walkdir::WalkDir;
use crate::common::constants::TEMP_PREFIX;
use crate::common::names::{decrypted_path, encrypted_path, is_encrypted_name, logical_name};
use crate::crypto::keystore::{decrypt_bytes, encrypt_bytes, Key, KeyStoreError};
use progress::ProgressTracker;

pub const STAGE_ENCRYPT: &str = "Encrypting";
pub const STAGE_DECRYPT: &str = "Decrypting";

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Source is not a file: {0}")]
    NotAFile(PathBuf),

    #[error("Source file does not carry the encrypted suffix: {0}")]
    NotEncrypted(PathBuf),

    #[error("Failed to encrypt {path}: {source}")]
    Encryption {
        path: PathBuf,
        #[source]
        source: KeyStoreError,
    },

    #[error("Failed to decrypt {path}: {source}")]
    Decryption {
        path: PathBuf,
        #[source]
        source: KeyStoreError,
    },

    #[error("File system error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A multi-file transfer stopped after writing part of the tree.
    #[error("Transfer into {destination} stopped after {completed} of {total} files: {cause}")]
    Incomplete {
        destination: PathBuf,
        completed: usize,
        total: usize,
        #[source]
        cause: Box<TransferError>,
    },
}

impl TransferError {
    /// The error that actually stopped the transfer.
    pub fn root_cause(&self) -> &TransferError {
        match self {
            TransferError::Incomplete { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// Counts of what a transfer wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub files: usize,
    pub directories: usize,
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> TransferError + '_ {
    move |source| TransferError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Scratch file in `dir`, named so catalog listings skip it.
fn scratch_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    let prefix = TEMP_PREFIX.to_string();
    Builder::new().prefix(&prefix).tempfile_in(dir)
}

/// Writes `bytes` to a temp file next to `dst` and renames it into place.
/// Fails with `AlreadyExists` rather than replacing an existing file.
fn write_atomic(dst: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = dst
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let mut temp = scratch_file_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist_noclobber(dst).map_err(|e| e.error)?;
    Ok(())
}

fn encrypt_one(src: &Path, dst: &Path, key: &Key) -> Result<(), TransferError> {
    let wrap = |source: KeyStoreError| TransferError::Encryption {
        path: src.to_path_buf(),
        source,
    };
    let plain = fs::read(src).map_err(|e| wrap(e.into()))?;
    let sealed = encrypt_bytes(key, &plain).map_err(wrap)?;
    write_atomic(dst, &sealed).map_err(io_at(dst))
}

fn decrypt_one(src: &Path, dst: &Path, key: &Key) -> Result<(), TransferError> {
    let wrap = |source: KeyStoreError| TransferError::Decryption {
        path: src.to_path_buf(),
        source,
    };
    let sealed = fs::read(src).map_err(|e| wrap(e.into()))?;
    let plain = decrypt_bytes(key, &sealed).map_err(wrap)?;
    write_atomic(dst, &plain).map_err(io_at(dst))
}

enum Entry {
    Dir(PathBuf),
    File(PathBuf),
}

/// Pre-flight enumeration of everything under `src_dir` (relative paths).
fn enumerate(src_dir: &Path) -> Result<Vec<Entry>, TransferError> {
    if !src_dir.exists() {
        return Err(TransferError::SourceNotFound(src_dir.to_path_buf()));
    }
    if !src_dir.is_dir() {
        return Err(TransferError::NotADirectory(src_dir.to_path_buf()));
    }
    let mut entries = Vec::new();
    for item in WalkDir::new(src_dir).min_depth(1).sort_by_file_name() {
        let item = item.map_err(|source| TransferError::Walk {
            path: src_dir.to_path_buf(),
            source,
        })?;
        let rel = item
            .path()
            .strip_prefix(src_dir)
            .map(Path::to_path_buf)
            .map_err(|_| TransferError::Io {
                path: item.path().to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path escapes source root"),
            })?;
        if item.file_type().is_dir() {
            entries.push(Entry::Dir(rel));
        } else if item.path().is_file() {
            entries.push(Entry::File(rel));
        } else {
            tracing::debug!(path = %item.path().display(), "skipping special file");
        }
    }
    Ok(entries)
}

enum Planned {
    Dir(PathBuf),
    File { src: PathBuf, dst: PathBuf },
}

/// Shared walk loop. `map_file` turns a source-relative file path into the
/// destination-relative one, or `None` to skip it.
fn mirror_tree(
    src_dir: &Path,
    dst_dir: &Path,
    stage: &str,
    progress: &mut dyn ProgressSink,
    map_file: impl Fn(&Path) -> Option<PathBuf>,
    transform: impl Fn(&Path, &Path) -> Result<(), TransferError>,
) -> Result<TransferReport, TransferError> {
    let plan: Vec<Planned> = enumerate(src_dir)?
        .into_iter()
        .filter_map(|entry| match entry {
            Entry::Dir(rel) => Some(Planned::Dir(dst_dir.join(rel))),
            Entry::File(rel) => map_file(&rel).map(|out| Planned::File {
                src: src_dir.join(&rel),
                dst: dst_dir.join(out),
            }),
        })
        .collect();
    let total = plan
        .iter()
        .filter(|p| matches!(p, Planned::File { .. }))
        .count();

    let mut tracker = ProgressTracker::new(progress, stage, total);
    let mut report = TransferReport::default();
    fs::create_dir_all(dst_dir).map_err(io_at(dst_dir))?;
    tracker.start();

    for step in plan {
        let outcome = match &step {
            Planned::Dir(dst) => fs::create_dir_all(dst).map_err(io_at(dst)),
            Planned::File { src, dst } => {
                tracing::debug!(src = %src.display(), dst = %dst.display(), "{}", stage);
                transform(src, dst)
            }
        };
        if let Err(cause) = outcome {
            return Err(if report.files > 0 {
                TransferError::Incomplete {
                    destination: dst_dir.to_path_buf(),
                    completed: report.files,
                    total,
                    cause: Box::new(cause),
                }
            } else {
                cause
            });
        }
        match step {
            Planned::Dir(_) => report.directories += 1,
            Planned::File { .. } => {
                report.files += 1;
                tracker.advance();
            }
        }
    }
    tracker.finish();
    Ok(report)
}

/// Copies `src_dir` into `dst_dir`, encrypting every file and appending the
/// encrypted suffix. Directories, including empty ones, are mirrored.
///
/// Stops at the first failing file.
pub fn copy_encrypt(
    src_dir: &Path,
    dst_dir: &Path,
    key: &Key,
    progress: &mut dyn ProgressSink,
) -> Result<TransferReport, TransferError> {
    mirror_tree(
        src_dir,
        dst_dir,
        STAGE_ENCRYPT,
        progress,
        |rel| Some(encrypted_path(rel)),
        |src, dst| encrypt_one(src, dst, key),
    )
}

/// Copies an archived tree into `dst_dir`, decrypting every file that carries
/// the encrypted suffix and stripping it. Other files are ignored.
pub fn copy_decrypt(
    src_dir: &Path,
    dst_dir: &Path,
    key: &Key,
    progress: &mut dyn ProgressSink,
) -> Result<TransferReport, TransferError> {
    mirror_tree(
        src_dir,
        dst_dir,
        STAGE_DECRYPT,
        progress,
        |rel| {
            let logical = decrypted_path(rel);
            if logical.is_none() {
                tracing::debug!(path = %rel.display(), "skipping file without encrypted suffix");
            }
            logical
        },
        |src, dst| decrypt_one(src, dst, key),
    )
}

fn source_file_name(src: &Path) -> Result<&str, TransferError> {
    if !src.exists() {
        return Err(TransferError::SourceNotFound(src.to_path_buf()));
    }
    if !src.is_file() {
        return Err(TransferError::NotAFile(src.to_path_buf()));
    }
    src.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TransferError::NotAFile(src.to_path_buf()))
}

/// Encrypts one file into `dst_dir/<name>.enc`. Reports 0, 50 and 100.
pub fn encrypt_file(
    src: &Path,
    dst_dir: &Path,
    key: &Key,
    progress: &mut dyn ProgressSink,
) -> Result<PathBuf, TransferError> {
    let name = source_file_name(src)?;
    let dst = encrypted_path(&dst_dir.join(name));
    let mut tracker = ProgressTracker::new(progress, STAGE_ENCRYPT, 2);
    tracker.start();
    let plain = fs::read(src).map_err(|e| TransferError::Encryption {
        path: src.to_path_buf(),
        source: e.into(),
    })?;
    let sealed = encrypt_bytes(key, &plain).map_err(|source| TransferError::Encryption {
        path: src.to_path_buf(),
        source,
    })?;
    tracker.advance();
    write_atomic(&dst, &sealed).map_err(io_at(&dst))?;
    tracker.finish();
    Ok(dst)
}

/// Decrypts one archived file into `dst_dir/<logical name>`. Reports 0, 50
/// and 100.
pub fn decrypt_file(
    src: &Path,
    dst_dir: &Path,
    key: &Key,
    progress: &mut dyn ProgressSink,
) -> Result<PathBuf, TransferError> {
    let name = source_file_name(src)?;
    if !is_encrypted_name(name) {
        return Err(TransferError::NotEncrypted(src.to_path_buf()));
    }
    let dst = dst_dir.join(logical_name(name));
    let mut tracker = ProgressTracker::new(progress, STAGE_DECRYPT, 2);
    tracker.start();
    let sealed = fs::read(src).map_err(|e| TransferError::Decryption {
        path: src.to_path_buf(),
        source: e.into(),
    })?;
    let plain = decrypt_bytes(key, &sealed).map_err(|source| TransferError::Decryption {
        path: src.to_path_buf(),
        source,
    })?;
    tracker.advance();
    write_atomic(&dst, &plain).map_err(io_at(&dst))?;
    tracker.finish();
    Ok(dst)
}
