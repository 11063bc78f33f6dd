use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use base64::Engine as _;
use openssl::rand;
use crate::crypto::token::{self, URL_SAFE_LENIENT};

const SIGNING_KEY_LEN: usize = 16;
const ENCRYPTION_KEY_LEN: usize = 16;
const KEY_LEN: usize = SIGNING_KEY_LEN + ENCRYPTION_KEY_LEN;

/// Errors raised by key loading and the encrypt/decrypt primitives.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    /// The key file does not exist.
    #[error("Key file not found at {0}")]
    KeyfileMissing(PathBuf),

    /// The key file exists but is empty, unreadable as text, or not a valid key.
    #[error("Key file at {path} is invalid: {reason}")]
    KeyfileInvalid { path: PathBuf, reason: String },

    /// Authentication failed: wrong key or corrupted data.
    #[error("Invalid ciphertext: wrong key or corrupted data")]
    InvalidCiphertext,

    /// Decryption succeeded but the plaintext is not UTF-8.
    #[error("Decrypted text is not valid UTF-8")]
    InvalidUtf8,

    #[error("Refusing to overwrite existing key file at {0}")]
    KeyfileExists(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("OpenSSL error stack: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),
}

/// Symmetric key material: a 16-byte signing key and a 16-byte encryption key.
///
/// Read-only after load; share it across workers behind an `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    signing: [u8; SIGNING_KEY_LEN],
    encryption: [u8; ENCRYPTION_KEY_LEN],
}

impl Key {
    /// Builds a key from its 32 raw bytes (signing half first).
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        let mut signing = [0u8; SIGNING_KEY_LEN];
        let mut encryption = [0u8; ENCRYPTION_KEY_LEN];
        signing.copy_from_slice(&bytes[..SIGNING_KEY_LEN]);
        encryption.copy_from_slice(&bytes[SIGNING_KEY_LEN..]);
        Self { signing, encryption }
    }

    /// Parses the textual key-file encoding (url-safe base64 of 32 bytes).
    pub fn from_encoded(encoded: &str) -> Result<Self, String> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err("key file is empty".to_string());
        }
        let bytes = URL_SAFE_LENIENT
            .decode(encoded)
            .map_err(|e| format!("not url-safe base64: {}", e))?;
        let bytes: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("expected {} key bytes, got {}", KEY_LEN, b.len()))?;
        Ok(Self::from_bytes(bytes))
    }

    /// The textual key-file encoding.
    pub fn to_encoded(&self) -> String {
        let mut bytes = Vec::with_capacity(KEY_LEN);
        bytes.extend_from_slice(&self.signing);
        bytes.extend_from_slice(&self.encryption);
        URL_SAFE_LENIENT.encode(bytes)
    }

    pub(crate) fn signing_key(&self) -> &[u8] {
        &self.signing
    }

    pub(crate) fn encryption_key(&self) -> &[u8] {
        &self.encryption
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(..)")
    }
}

/// Loads the key from a key file.
///
/// # Errors
/// * `KeyfileMissing` if the file does not exist.
/// * `KeyfileInvalid` if it cannot be read or does not hold a valid key.
pub fn load_key(path: &Path) -> Result<Key, KeyStoreError> {
    if !path.exists() {
        return Err(KeyStoreError::KeyfileMissing(path.to_path_buf()));
    }
    let invalid = |reason: String| KeyStoreError::KeyfileInvalid {
        path: path.to_path_buf(),
        reason,
    };
    let raw = fs::read(path).map_err(|e| invalid(e.to_string()))?;
    let text = String::from_utf8(raw).map_err(|_| invalid("key file is not text".to_string()))?;
    Key::from_encoded(&text).map_err(invalid)
}

/// Generates a fresh random key.
pub fn generate_key() -> Result<Key, KeyStoreError> {
    let mut bytes = [0u8; KEY_LEN];
    rand::rand_bytes(&mut bytes)?;
    Ok(Key::from_bytes(bytes))
}

/// Generates a key and writes it to `path`. Never overwrites an existing file.
pub fn write_key_file(path: &Path) -> Result<Key, KeyStoreError> {
    let key = generate_key()?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => KeyStoreError::KeyfileExists(path.to_path_buf()),
            _ => KeyStoreError::Io(e),
        })?;
    file.write_all(key.to_encoded().as_bytes())?;
    file.sync_all()?;
    Ok(key)
}

/// Encrypts bytes into a token.
pub fn encrypt_bytes(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
    token::seal(key, plaintext)
}

/// Decrypts a token. Fails with `InvalidCiphertext` if the tag does not verify.
pub fn decrypt_bytes(key: &Key, ciphertext: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
    token::open(key, ciphertext)
}

/// Encrypts a small UTF-8 secret into a token string.
pub fn encrypt_text(key: &Key, text: &str) -> Result<String, KeyStoreError> {
    let sealed = token::seal(key, text.as_bytes())?;
    // The token alphabet is ASCII.
    String::from_utf8(sealed).map_err(|_| KeyStoreError::InvalidUtf8)
}

/// Decrypts a token string.
///
/// Values stored before encryption was introduced are plain text; when the
/// input fails authentication it is returned unchanged.
pub fn decrypt_text(key: &Key, text: &str) -> Result<String, KeyStoreError> {
    match token::open(key, text.as_bytes()) {
        Ok(plain) => String::from_utf8(plain).map_err(|_| KeyStoreError::InvalidUtf8),
        Err(KeyStoreError::InvalidCiphertext) => Ok(text.to_string()),
        Err(e) => Err(e),
    }
}
