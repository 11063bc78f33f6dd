use crate::errors::CliError;
use crate::ui::prompt::PasswordSource;
use std::fs;
use std::path::Path;
use verarc::ArchiveConfig;
use verarc::crypto::keystore::{KeyStoreError, load_key, write_key_file};
use verarc::crypto::password::PasswordFile;

/// Writes `config.yaml` and a fresh key file next to it. An existing key file
/// is kept so archives written with it stay readable.
///
/// With `password_stdin` the first stdin line becomes the password; otherwise
/// the archive starts read-only until `verarc passwd` is run.
pub fn handle_init(
    config_path: &Path,
    versions_path: &Path,
    password_stdin: bool,
) -> Result<(), CliError> {
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(base_dir)?;

    // Stored absolute; relative entries would resolve against the config dir.
    let versions_path = std::path::absolute(versions_path)?;
    let config = ArchiveConfig::with_root(&versions_path, base_dir);
    config.save(config_path)?;
    println!("Configuration written to {:?}", config_path);

    let key_path = config.key_file_path();
    let key = match write_key_file(&key_path) {
        Ok(key) => {
            println!("Key file generated at {:?}", key_path);
            key
        }
        Err(KeyStoreError::KeyfileExists(_)) => {
            println!("Using existing key file at {:?}", key_path);
            load_key(&key_path)?
        }
        Err(e) => return Err(e.into()),
    };

    if password_stdin {
        let password = PasswordSource::Stdin.read("Password: ")?;
        if password.is_empty() {
            return Err(CliError::InvalidName("Password cannot be empty.".to_string()));
        }
        PasswordFile::create(&config.password_file_path(), key, &password)?;
        println!("Password set.");
    } else {
        println!("No password set; the archive is read-only until you run `verarc passwd`.");
    }

    let root = config.versions_path()?;
    if !root.is_dir() {
        fs::create_dir_all(&root)?;
        println!("Storage root created at {:?}", root);
    }
    Ok(())
}
