pub mod catalog;
pub mod diff;
pub mod init;
pub mod jobs;
pub mod passwd;

use crate::errors::CliError;
use crate::ui::prompt::{PasswordSource, confirm_action};
use std::path::Path;
use std::sync::Arc;
use verarc::{ArchiveConfig, ArchiveContext};

/// State shared by every command after the config and key are loaded.
pub struct Session {
    pub context: Arc<ArchiveContext>,
    assume_yes: bool,
    passwords: PasswordSource,
}

impl Session {
    pub fn open(config_path: &Path, assume_yes: bool, password_stdin: bool) -> Result<Self, CliError> {
        let config = ArchiveConfig::load(config_path)?;
        let context = ArchiveContext::open(config)?;
        if let Err(e) = context.check_root() {
            tracing::warn!("{}", e);
        }
        Ok(Self {
            context: Arc::new(context),
            assume_yes,
            passwords: PasswordSource::from_flag(password_stdin),
        })
    }

    /// Asks before a destructive step unless `--yes` was given.
    pub fn confirm(&self, prompt: &str) -> Result<bool, CliError> {
        if self.assume_yes {
            return Ok(true);
        }
        Ok(confirm_action(prompt)?)
    }

    pub fn read_password(&self, label: &str) -> Result<String, CliError> {
        Ok(self.passwords.read(label)?)
    }

    /// Mutating commands need the stored password. Without one the archive
    /// stays read-only.
    pub fn authorize(&self) -> Result<(), CliError> {
        let password_file = self.context.password_file();
        if password_file.get_decrypted_password()?.is_none() {
            return Err(CliError::NoPassword);
        }
        let entered = self.read_password("Password: ")?;
        if password_file.verify(&entered)? {
            Ok(())
        } else {
            Err(CliError::WrongPassword)
        }
    }
}
