//!
//! # Test Common Utilities
//!
//! Shared setup for the `verarc` CLI integration tests: an isolated temp
//! directory holding a config, a key file and a storage root.
//!

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// Password set by [`TestContext::new`].
pub const PASSWORD: &str = "correct horse";

/// One isolated archive per test. The temp dir is removed on drop.
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_path: PathBuf,
    pub store: PathBuf,
}

impl TestContext {
    /// Runs `verarc init` against a fresh temp directory and sets [`PASSWORD`].
    pub fn new() -> anyhow::Result<Self> {
        Self::init(Some(PASSWORD))
    }

    /// Like [`new`](Self::new) but leaves the archive without a password.
    pub fn read_only() -> anyhow::Result<Self> {
        Self::init(None)
    }

    fn init(password: Option<&str>) -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let config_path = temp_dir.path().join("config.yaml");
        let store = temp_dir.path().join("store");

        let mut init = Command::new(env!("CARGO_BIN_EXE_verarc"));
        init.arg("--config").arg(&config_path);
        if let Some(password) = password {
            init.arg("--password-stdin").write_stdin(format!("{}\n", password));
        }
        init.arg("init").arg(&store).assert().success();

        Ok(TestContext {
            _temp_dir: temp_dir,
            config_path,
            store,
        })
    }

    pub fn path(&self) -> &Path {
        self._temp_dir.path()
    }

    /// A `verarc` command pointed at this context's config. [`PASSWORD`] is
    /// waiting on stdin for commands that ask for it.
    pub fn cmd(&self) -> Command {
        self.cmd_with_stdin(&format!("{}\n", PASSWORD))
    }

    /// Like [`cmd`](Self::cmd), answering the confirmation prompt after the
    /// password.
    pub fn cmd_answering(&self, answer: &str) -> Command {
        self.cmd_with_stdin(&format!("{}\n{}\n", PASSWORD, answer))
    }

    /// A `verarc` command reading passwords from exactly `input`.
    pub fn cmd_with_stdin(&self, input: &str) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_verarc"));
        cmd.arg("--config")
            .arg(&self.config_path)
            .arg("--password-stdin")
            .write_stdin(input.to_string());
        cmd
    }

    /// Creates a local source tree with the given files.
    pub fn source_tree(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let root = self.path().join("sources").join(name);
        for (rel, content) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        root
    }
}
