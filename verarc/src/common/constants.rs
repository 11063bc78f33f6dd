/// Suffix appended to every regular file stored in the archive.
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Entries starting with this prefix are editor lock/temp artifacts and are
/// never listed as versions.
pub const TEMP_PREFIX: char = '~';

/// Default file names, resolved next to the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const KEY_FILE_NAME: &str = "keyfile.key";
pub const PASSWORD_FILE_NAME: &str = "password.key";

/// Read buffer for hashing and streaming.
pub const BUFFER_LEN: usize = 8192;

/// Sub-directory of the temp area used by the `open` operation.
pub const OPEN_SUBDIR: &str = "verarc-open";
