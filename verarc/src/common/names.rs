//! Naming rules shared by the catalog and the transfer pipeline.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use crate::common::constants::{ENCRYPTED_SUFFIX, TEMP_PREFIX};

/// Returns `true` for editor lock/temp artifacts (`~`-prefixed).
pub fn is_temp_entry(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

/// Returns `true` if the name carries the encrypted-suffix.
pub fn is_encrypted_name(name: &str) -> bool {
    name.len() > ENCRYPTED_SUFFIX.len() && name.ends_with(ENCRYPTED_SUFFIX)
}

/// Strips the encrypted-suffix if present.
///
/// - "report.pdf.enc" -> "report.pdf"
/// - "Release 01.02.2024" -> "Release 01.02.2024"
pub fn logical_name(name: &str) -> &str {
    if is_encrypted_name(name) {
        &name[..name.len() - ENCRYPTED_SUFFIX.len()]
    } else {
        name
    }
}

/// Appends the encrypted-suffix to a file path.
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(ENCRYPTED_SUFFIX);
    PathBuf::from(raw)
}

/// Strips the encrypted-suffix from the final component of a path.
/// Returns `None` if the final component does not carry it.
pub fn decrypted_path(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name().and_then(OsStr::to_str)?;
    if !is_encrypted_name(file_name) {
        return None;
    }
    Some(path.with_file_name(logical_name(file_name)))
}

/// Validates a group or version name supplied by a caller.
///
/// Names are single path components: non-empty after trimming, no
/// separators, not `.`/`..`, and not temp-prefixed.
pub fn validate_entry_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if trimmed != name {
        return Err(format!("name '{}' has leading or trailing whitespace", name));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(format!("name '{}' cannot contain path separators", name));
    }
    if name == "." || name == ".." {
        return Err(format!("'{}' is not a valid name", name));
    }
    if is_temp_entry(name) {
        return Err(format!("name '{}' cannot start with '{}'", name, TEMP_PREFIX));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_name() {
        assert_eq!(logical_name("report.pdf.enc"), "report.pdf");
        assert_eq!(logical_name("Release 01.02.2024"), "Release 01.02.2024");
        // The bare suffix is not treated as an encrypted name.
        assert_eq!(logical_name(".enc"), ".enc");
    }

    #[test]
    fn test_path_suffix_helpers() {
        let p = Path::new("a/b/spec.docx");
        let enc = encrypted_path(p);
        assert_eq!(enc, PathBuf::from("a/b/spec.docx.enc"));
        assert_eq!(decrypted_path(&enc), Some(p.to_path_buf()));
        assert_eq!(decrypted_path(p), None);
    }

    #[test]
    fn test_validate_entry_name() {
        assert!(validate_entry_name("Pump Assembly").is_ok());
        assert!(validate_entry_name("").is_err());
        assert!(validate_entry_name("   ").is_err());
        assert!(validate_entry_name(" padded").is_err());
        assert!(validate_entry_name("a/b").is_err());
        assert!(validate_entry_name("a\\b").is_err());
        assert!(validate_entry_name("..").is_err());
        assert!(validate_entry_name("~lock").is_err());
    }
}
