use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use crate::crypto::keystore::{decrypt_text, encrypt_text, Key, KeyStoreError};

/// The single-line encrypted password file consumed by the authentication
/// front end.
#[derive(Debug, Clone)]
pub struct PasswordFile {
    path: PathBuf,
    key: Key,
}

impl PasswordFile {
    pub fn new(path: &Path, key: Key) -> Self {
        Self {
            path: path.to_path_buf(),
            key,
        }
    }

    /// Writes an initial password file. Fails if one already exists.
    pub fn create(path: &Path, key: Key, password: &str) -> Result<Self, KeyStoreError> {
        let file = Self::new(path, key);
        let sealed = encrypt_text(&file.key, password)?;
        let mut temp = NamedTempFile::new_in(file.parent_dir())?;
        temp.write_all(sealed.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist_noclobber(&file.path).map_err(|e| e.error)?;
        Ok(file)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored password, or `None` when no password is set
    /// (missing or blank file).
    ///
    /// Passwords stored in plain text by older installs are returned as-is.
    pub fn get_decrypted_password(&self) -> Result<Option<String>, KeyStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let line = raw.trim();
        if line.is_empty() {
            return Ok(None);
        }
        decrypt_text(&self.key, line).map(Some)
    }

    /// True when no password is set or `candidate` matches it.
    pub fn verify(&self, candidate: &str) -> Result<bool, KeyStoreError> {
        Ok(match self.get_decrypted_password()? {
            // memcmp::eq panics on unequal lengths.
            Some(stored) => {
                stored.len() == candidate.len()
                    && openssl::memcmp::eq(stored.as_bytes(), candidate.as_bytes())
            }
            None => true,
        })
    }

    /// Encrypts and stores a new password, replacing the file atomically.
    pub fn set_password(&self, password: &str) -> Result<(), KeyStoreError> {
        let sealed = encrypt_text(&self.key, password)?;
        let mut temp = NamedTempFile::new_in(self.parent_dir())?;
        temp.write_all(sealed.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        tracing::info!(path = %self.path.display(), "password file updated");
        Ok(())
    }
}
