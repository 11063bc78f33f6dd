#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use verarc::crypto::keystore::write_key_file;
use verarc::jobs::{EngineEvent, JobRunner};
use verarc::{ArchiveConfig, ArchiveContext};

/// Builds a storage root and key file inside `dir` and opens a context
/// over them. `open` extracts into `dir/tmp`.
pub fn setup_archive(dir: &TempDir) -> Arc<ArchiveContext> {
    fs::create_dir_all(dir.path().join("store")).unwrap();
    write_key_file(&dir.path().join("keyfile.key")).unwrap();
    let mut config = ArchiveConfig::with_root(Path::new("store"), dir.path());
    config.temp_path = Some(PathBuf::from("tmp"));
    Arc::new(ArchiveContext::open(config).unwrap())
}

pub fn setup_runner(dir: &TempDir) -> (JobRunner, flume::Receiver<EngineEvent>) {
    JobRunner::new(setup_archive(dir))
}

/// Writes `files` (relative path, content) under `root`, creating parents.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    root.to_path_buf()
}

/// Scenario layout: `Alpha` with two dated directory versions, empty `Beta`.
pub fn seed_groups(root: &Path) {
    fs::create_dir_all(root.join("Alpha/v1 01.01.2024")).unwrap();
    fs::create_dir_all(root.join("Alpha/v2 05.01.2024")).unwrap();
    fs::create_dir_all(root.join("Beta")).unwrap();
}

/// Every regular file under `root`, relative, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

/// Percentages of all progress events, in arrival order.
pub fn progress_values(events: &[EngineEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}
