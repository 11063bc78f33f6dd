//! `config.yaml` loading.
//!
//! ```yaml
//! versions_path: //fileserver/archive/versions
//! key_file: keyfile.key              # optional
//! password_file: password.key        # optional
//! server_program_path: //fileserver/archive/program
//! program_version_number: 1.4
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

mod context;

pub use context::{ArchiveContext, ContextError};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use serde::{Deserialize, Deserializer, Serialize};
use crate::common::constants::{CONFIG_FILE_NAME, KEY_FILE_NAME, OPEN_SUBDIR, PASSWORD_FILE_NAME};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration does not define 'versions_path'")]
    MissingVersionsPath,

    #[error("Cannot locate the running executable: {0}")]
    ExecutableLocation(#[source] io::Error),

    #[error("Failed to serialize configuration: {0}")]
    Encode(#[source] serde_yaml::Error),

    #[error("Failed to write configuration file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Accepts `1.4`, `"1.4"` or `14` and keeps the textual form.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml::Value::Null) => None,
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a string or number, got {:?}",
                other
            )));
        }
    })
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Storage root holding one directory per group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,
    /// Where `open` extracts temporary copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_path: Option<PathBuf>,
    /// Used by the update check only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_program_path: Option<PathBuf>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub program_version_number: Option<String>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl ArchiveConfig {
    /// Parses YAML text; relative paths resolve against `base_dir`.
    pub fn from_yaml_str(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: ArchiveConfig = serde_yaml::from_str(text)?;
        config.base_dir = base_dir.to_path_buf();
        Ok(config)
    }

    /// Loads a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let config = Self::from_yaml_str(&text, base_dir)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Writes the config as YAML. Never replaces an existing file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_yaml::to_string(self).map_err(ConfigError::Encode)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(write_err)?;
        file.write_all(text.as_bytes()).map_err(write_err)?;
        tracing::info!(path = %path.display(), "configuration written");
        Ok(())
    }

    /// `config.yaml` next to the running executable.
    pub fn default_location() -> Result<PathBuf, ConfigError> {
        let exe = std::env::current_exe().map_err(ConfigError::ExecutableLocation)?;
        let dir = exe.parent().unwrap_or(Path::new("."));
        Ok(dir.join(CONFIG_FILE_NAME))
    }

    /// A config pointing at `versions_path`, with key and password files in
    /// `base_dir`. Useful for tests and embedding.
    pub fn with_root(versions_path: &Path, base_dir: &Path) -> Self {
        Self {
            versions_path: Some(versions_path.to_path_buf()),
            base_dir: base_dir.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn versions_path(&self) -> Result<PathBuf, ConfigError> {
        self.versions_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| self.resolve(p))
            .ok_or(ConfigError::MissingVersionsPath)
    }

    pub fn key_file_path(&self) -> PathBuf {
        self.resolve(self.key_file.as_deref().unwrap_or(Path::new(KEY_FILE_NAME)))
    }

    pub fn password_file_path(&self) -> PathBuf {
        self.resolve(
            self.password_file
                .as_deref()
                .unwrap_or(Path::new(PASSWORD_FILE_NAME)),
        )
    }

    /// Directory `open` extracts into.
    pub fn open_dir(&self) -> PathBuf {
        match &self.temp_path {
            Some(p) => self.resolve(p),
            None => std::env::temp_dir().join(OPEN_SUBDIR),
        }
    }
}
