use std::io;
use std::process::ExitCode;
use thiserror::Error;
use verarc::EngineError;
use verarc::config::{ConfigError, ContextError};
use verarc::crypto::keystore::KeyStoreError;
use verarc::diff::DiffError;
use verarc::jobs::JobError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Group '{0}' has no versions")]
    NoVersions(String),

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Wrong password.")]
    WrongPassword,

    #[error("No password set; run `verarc passwd` first. Archive is read-only until then.")]
    NoPassword,

    #[error("Invalid name provided: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open archive: {0}")]
    Context(#[from] ContextError),

    #[error("Key store error: {0}")]
    Key(#[from] KeyStoreError),

    #[error("Comparison failed: {0}")]
    Diff(#[from] DiffError),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Job(#[from] JobError),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit status; engine errors keep their job status code.
    pub fn exit_code(&self) -> ExitCode {
        let code = match self {
            CliError::Engine(e) => e.status_code(),
            CliError::Context(e) => e.status_code(),
            CliError::Key(e) => e.class().status_code(),
            CliError::Config(_) => 2,
            CliError::WrongPassword | CliError::NoPassword => 3,
            CliError::NoVersions(_) => 6,
            CliError::InvalidName(_) => 9,
            _ => 1,
        };
        ExitCode::from(code as u8)
    }
}
