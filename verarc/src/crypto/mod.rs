pub mod keystore;
pub mod password;
pub(crate) mod token;

pub use keystore::{
    decrypt_bytes, decrypt_text, encrypt_bytes, encrypt_text, generate_key, load_key,
    write_key_file, Key, KeyStoreError,
};
pub use password::PasswordFile;
