use std::io;
use std::path::{Path, PathBuf};
use crate::catalog::CatalogError;
use crate::config::{ConfigError, ContextError};
use crate::crypto::keystore::KeyStoreError;
use crate::diff::DiffError;
use crate::transfer::TransferError;

/// Coarse error families surfaced to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing/unreadable configuration or storage root.
    Configuration,
    /// Permission denied, not found, already exists.
    Filesystem,
    /// Wrong key file or failed authentication.
    Cryptographic,
    /// A multi-file transfer stopped partway; the destination needs cleanup.
    PartialTransfer,
}

/// Status code reported for a successful job.
pub const STATUS_OK: i32 = 0;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Key store error: {0}")]
    Crypto(#[from] KeyStoreError),

    #[error("{0}")]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    Transfer(#[source] TransferError),

    #[error("Comparison failed: {0}")]
    Diff(#[from] DiffError),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Not found: {0}")]
    NotFound(PathBuf),

    /// The new version matches the actual one file for file.
    #[error("No meaningful changes against the actual version ({0}); confirmation required")]
    NoMeaningfulChanges(String),

    #[error("File system error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to launch default application for {path}: {reason}")]
    Launch { path: PathBuf, reason: String },

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
}

impl From<ContextError> for EngineError {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::Config(e) => EngineError::Config(e),
            ContextError::Key(e) => EngineError::Crypto(e),
        }
    }
}

/// A write that lost the race for its target reports the target as existing.
impl From<TransferError> for EngineError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::Io { path, source } if source.kind() == io::ErrorKind::AlreadyExists => {
                EngineError::AlreadyExists(path)
            }
            other => EngineError::Transfer(other),
        }
    }
}

impl ContextError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ContextError::Config(_) => ErrorClass::Configuration,
            ContextError::Key(e) => e.class(),
        }
    }

    /// Same status the engine reports for this failure.
    pub fn status_code(&self) -> i32 {
        self.class().status_code()
    }
}

impl KeyStoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            KeyStoreError::KeyfileMissing(_) => ErrorClass::Configuration,
            KeyStoreError::Io(_) => ErrorClass::Filesystem,
            _ => ErrorClass::Cryptographic,
        }
    }
}

impl ErrorClass {
    pub fn status_code(self) -> i32 {
        match self {
            ErrorClass::Filesystem => 1,
            ErrorClass::Configuration => 2,
            ErrorClass::Cryptographic => 3,
            ErrorClass::PartialTransfer => 4,
        }
    }
}

impl EngineError {
    /// Maps an I/O error at `path`, keeping "already exists" and "not found"
    /// distinct.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::AlreadyExists => EngineError::AlreadyExists(path.to_path_buf()),
            io::ErrorKind::NotFound => EngineError::NotFound(path.to_path_buf()),
            _ => EngineError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Config(_) => ErrorClass::Configuration,
            EngineError::Crypto(e) => e.class(),
            EngineError::Catalog(CatalogError::RootUnavailable(_)) => ErrorClass::Configuration,
            EngineError::Catalog(_) => ErrorClass::Filesystem,
            EngineError::Transfer(TransferError::Incomplete { .. }) => ErrorClass::PartialTransfer,
            EngineError::Transfer(
                TransferError::Encryption { source, .. } | TransferError::Decryption { source, .. },
            ) => source.class(),
            EngineError::Transfer(_) | EngineError::Diff(_) => ErrorClass::Filesystem,
            EngineError::InvalidName(_)
            | EngineError::AlreadyExists(_)
            | EngineError::NotFound(_)
            | EngineError::NoMeaningfulChanges(_)
            | EngineError::Io { .. }
            | EngineError::Launch { .. }
            | EngineError::WorkerPanicked(_) => ErrorClass::Filesystem,
        }
    }

    /// Non-zero status code carried by the completion event.
    pub fn status_code(&self) -> i32 {
        match self {
            EngineError::AlreadyExists(_) => 5,
            EngineError::NotFound(_) | EngineError::Catalog(CatalogError::GroupNotFound(_)) => 6,
            EngineError::NoMeaningfulChanges(_) => 7,
            EngineError::WorkerPanicked(_) => 8,
            EngineError::InvalidName(_) => 9,
            _ => self.class().status_code(),
        }
    }
}
