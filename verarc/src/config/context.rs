use std::path::{Path, PathBuf};
use crate::catalog::{Catalog, CatalogError};
use crate::config::{ArchiveConfig, ConfigError};
use crate::crypto::keystore::{load_key, Key, KeyStoreError};
use crate::crypto::password::PasswordFile;

/// Everything an engine operation needs: the configuration, the catalog over
/// the storage root and the loaded key. Read-only once built; workers share
/// it through an `Arc`.
#[derive(Debug, Clone)]
pub struct ArchiveContext {
    config: ArchiveConfig,
    catalog: Catalog,
    key: Key,
}

impl ArchiveContext {
    /// Resolves the storage root and loads the key file named by `config`.
    ///
    /// An unreachable storage root is not an error here; catalog reads
    /// degrade to empty results instead. Use [`check_root`](Self::check_root)
    /// to report it.
    pub fn open(config: ArchiveConfig) -> Result<Self, ContextError> {
        let root = config.versions_path()?;
        let key = load_key(&config.key_file_path())?;
        Ok(Self::from_parts(config, &root, key))
    }

    pub fn from_parts(config: ArchiveConfig, root: &Path, key: Key) -> Self {
        Self {
            config,
            catalog: Catalog::new(root),
            key,
        }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn root(&self) -> &Path {
        self.catalog.root()
    }

    pub fn password_file(&self) -> PasswordFile {
        PasswordFile::new(&self.config.password_file_path(), self.key.clone())
    }

    pub fn open_dir(&self) -> PathBuf {
        self.config.open_dir()
    }

    /// Fails if the storage root cannot be listed.
    pub fn check_root(&self) -> Result<(), CatalogError> {
        self.catalog.try_list_groups().map(|_| ())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Key(#[from] KeyStoreError),
}
