//! Authenticated token framing.
//!
//! Layout (before base64): `0x80 | timestamp (u64 BE) | iv (16) | ciphertext | hmac (32)`.
//! The ciphertext is AES-128-CBC with PKCS7 padding; the HMAC-SHA256 covers
//! every byte before it. The whole token is url-safe base64 encoded, which is
//! the Fernet format, so key files and tokens written by earlier tooling read
//! back unchanged.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use openssl::hash::MessageDigest;
use openssl::memcmp;
use openssl::pkey::PKey;
use openssl::rand;
use openssl::sign::Signer;
use openssl::symm::{self, Cipher};
use crate::crypto::keystore::{Key, KeyStoreError};

const VERSION: u8 = 0x80;
const TIMESTAMP_LEN: usize = 8;
const IV_LEN: usize = 16;
const HMAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;
const HEADER_LEN: usize = 1 + TIMESTAMP_LEN + IV_LEN;

/// Url-safe base64 that always writes padding and accepts it either way.
pub(crate) const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

fn sign(key: &Key, data: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
    let pkey = PKey::hmac(key.signing_key())?;
    let mut signer = Signer::new(MessageDigest::sha256(), &pkey)?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}

/// Encrypts `plaintext` into a base64 token stamped with `timestamp`.
pub(crate) fn seal_at(key: &Key, plaintext: &[u8], timestamp: u64) -> Result<Vec<u8>, KeyStoreError> {
    let mut iv = [0u8; IV_LEN];
    rand::rand_bytes(&mut iv)?;
    let ciphertext = symm::encrypt(Cipher::aes_128_cbc(), key.encryption_key(), Some(&iv), plaintext)?;

    let mut raw = Vec::with_capacity(HEADER_LEN + ciphertext.len() + HMAC_LEN);
    raw.push(VERSION);
    raw.extend_from_slice(&timestamp.to_be_bytes());
    raw.extend_from_slice(&iv);
    raw.extend_from_slice(&ciphertext);
    let tag = sign(key, &raw)?;
    raw.extend_from_slice(&tag);

    Ok(URL_SAFE_LENIENT.encode(raw).into_bytes())
}

/// Encrypts `plaintext` into a base64 token stamped with the current time.
pub(crate) fn seal(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    seal_at(key, plaintext, now)
}

/// Verifies and decrypts a base64 token.
///
/// Any framing, encoding, or tag mismatch is reported as `InvalidCiphertext`.
pub(crate) fn open(key: &Key, token: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
    let token = token.trim_ascii();
    let raw = URL_SAFE_LENIENT
        .decode(token)
        .map_err(|_| KeyStoreError::InvalidCiphertext)?;

    if raw.len() < HEADER_LEN + BLOCK_LEN + HMAC_LEN || raw[0] != VERSION {
        return Err(KeyStoreError::InvalidCiphertext);
    }
    let (signed, tag) = raw.split_at(raw.len() - HMAC_LEN);
    let ciphertext = &signed[HEADER_LEN..];
    if ciphertext.len() % BLOCK_LEN != 0 {
        return Err(KeyStoreError::InvalidCiphertext);
    }

    let expected = sign(key, signed)?;
    if !memcmp::eq(&expected, tag) {
        return Err(KeyStoreError::InvalidCiphertext);
    }

    let iv = &signed[1 + TIMESTAMP_LEN..HEADER_LEN];
    symm::decrypt(Cipher::aes_128_cbc(), key.encryption_key(), Some(iv), ciphertext)
        .map_err(|_| KeyStoreError::InvalidCiphertext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keystore::generate_key;

    #[test]
    fn test_token_layout() {
        let key = generate_key().unwrap();
        let token = seal_at(&key, b"hello", 1_700_000_000).unwrap();
        let raw = URL_SAFE_LENIENT.decode(&token).unwrap();

        assert_eq!(raw[0], VERSION);
        assert_eq!(&raw[1..9], &1_700_000_000u64.to_be_bytes());
        // 5 bytes of plaintext pad to one block.
        assert_eq!(raw.len(), HEADER_LEN + BLOCK_LEN + HMAC_LEN);
        assert_eq!(open(&key, &token).unwrap(), b"hello");
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let key = generate_key().unwrap();
        let token = seal(&key, b"payload").unwrap();
        let mut raw = URL_SAFE_LENIENT.decode(&token).unwrap();
        raw[HEADER_LEN] ^= 0x01;
        let tampered = URL_SAFE_LENIENT.encode(raw).into_bytes();

        assert!(matches!(open(&key, &tampered), Err(KeyStoreError::InvalidCiphertext)));
    }

    #[test]
    fn test_truncated_and_garbage_tokens() {
        let key = generate_key().unwrap();
        assert!(matches!(open(&key, b""), Err(KeyStoreError::InvalidCiphertext)));
        assert!(matches!(open(&key, b"not base64 !!"), Err(KeyStoreError::InvalidCiphertext)));

        let token = seal(&key, b"payload").unwrap();
        assert!(matches!(
            open(&key, &token[..token.len() / 2]),
            Err(KeyStoreError::InvalidCiphertext)
        ));
    }

    #[test]
    fn test_trailing_newline_is_tolerated() {
        let key = generate_key().unwrap();
        let mut token = seal(&key, b"line").unwrap();
        token.push(b'\n');
        assert_eq!(open(&key, &token).unwrap(), b"line");
    }
}
