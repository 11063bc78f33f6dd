//! Versioned encrypted archive engine.
//!
//! Artifacts live under a shared storage root as `<root>/<group>/<version>`,
//! where every regular file at rest is a ciphertext token carrying the
//! [`ENCRYPTED_SUFFIX`](common::constants::ENCRYPTED_SUFFIX). There is no
//! index: groups and versions are whatever the directory listing says.

pub mod catalog;
pub mod common;
pub mod config;
pub mod crypto;
pub mod diff;
pub mod error;
pub mod jobs;
pub mod transfer;
pub mod version;

pub use catalog::Catalog;
pub use config::{ArchiveConfig, ArchiveContext};
pub use crypto::keystore::Key;
pub use diff::DiffResult;
pub use error::{EngineError, ErrorClass};
pub use jobs::{EngineEvent, JobRunner, Operation, Severity};
