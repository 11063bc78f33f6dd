use std::fs;
use tempfile::tempdir;
use verarc::crypto::keystore::{decrypt_bytes, generate_key};
use verarc::error::ErrorClass;
use verarc::jobs::{EngineEvent, JobRunner, Operation, OperationOutput};
use verarc::{ArchiveContext, EngineError};

mod common;

/// Test: a 3-file source tree is stored as a new version.
/// Checks:
/// 1. Progress reaches 100 exactly once and never goes backwards.
/// 2. The version holds 3 files, all with the encrypted suffix.
/// 3. Exactly one completion event with status 0.
#[test]
fn test_add_version_encrypts_tree() {
    let dir = tempdir().unwrap();
    let (runner, events) = common::setup_runner(&dir);
    fs::create_dir(runner.context().catalog().group_path("Alpha")).unwrap();
    let source = common::write_tree(
        &dir.path().join("incoming/v1 01.02.2024"),
        &[("a.txt", "alpha"), ("b.txt", "beta"), ("sub/c.txt", "gamma")],
    );

    let outcome = runner
        .run(Operation::AddVersion {
            group: "Alpha".into(),
            source,
            force: false,
        })
        .unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.result);

    let stored = runner
        .context()
        .catalog()
        .version_path("Alpha", "v1 01.02.2024");
    assert_eq!(
        common::list_files(&stored),
        vec!["a.txt.enc", "b.txt.enc", "sub/c.txt.enc"]
    );
    let sealed = fs::read(stored.join("sub/c.txt.enc")).unwrap();
    assert_ne!(sealed, b"gamma");
    assert_eq!(
        decrypt_bytes(runner.context().key(), &sealed).unwrap(),
        b"gamma"
    );

    let collected: Vec<EngineEvent> = events.try_iter().collect();
    let progress = common::progress_values(&collected);
    assert_eq!(progress.iter().filter(|p| **p == 100).count(), 1);
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
    let finished: Vec<_> = collected
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Finished { status, .. } => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![0]);
}

/// Test: a version identical to the actual one is refused unless forced.
#[test]
fn test_identical_version_needs_force() {
    let dir = tempdir().unwrap();
    let (runner, _events) = common::setup_runner(&dir);
    fs::create_dir(runner.context().catalog().group_path("Alpha")).unwrap();
    let files = [("a.txt", "same"), ("b.txt", "content")];
    let first = common::write_tree(&dir.path().join("in/v1 01.01.2024"), &files);
    let second = common::write_tree(&dir.path().join("in/v2 02.01.2024"), &files);

    runner
        .run(Operation::AddVersion {
            group: "Alpha".into(),
            source: first,
            force: false,
        })
        .unwrap();

    let refused = runner
        .run(Operation::AddVersion {
            group: "Alpha".into(),
            source: second.clone(),
            force: false,
        })
        .unwrap();
    assert!(matches!(
        refused.result,
        Err(EngineError::NoMeaningfulChanges(_))
    ));
    assert_eq!(refused.status, 7);
    assert!(
        !runner
            .context()
            .catalog()
            .version_path("Alpha", "v2 02.01.2024")
            .exists()
    );

    let forced = runner
        .run(Operation::AddVersion {
            group: "Alpha".into(),
            source: second,
            force: true,
        })
        .unwrap();
    match forced.result {
        Ok(OperationOutput::Stored { diff: Some(diff), .. }) => {
            assert!(diff.needs_confirmation());
            assert_eq!(diff.unchanged.len(), 2);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(
        runner.context().catalog().actual_version("Alpha").as_deref(),
        Some("v2 02.01.2024")
    );
}

#[test]
fn test_changed_version_reports_diff() {
    let dir = tempdir().unwrap();
    let (runner, events) = common::setup_runner(&dir);
    fs::create_dir(runner.context().catalog().group_path("Alpha")).unwrap();
    let first = common::write_tree(
        &dir.path().join("in/v1 01.01.2024"),
        &[("keep.txt", "k"), ("edit.txt", "old"), ("gone.txt", "g")],
    );
    let second = common::write_tree(
        &dir.path().join("in/v2 02.01.2024"),
        &[("keep.txt", "k"), ("edit.txt", "new"), ("added.txt", "a")],
    );
    runner
        .run(Operation::AddVersion {
            group: "Alpha".into(),
            source: first,
            force: false,
        })
        .unwrap();
    let _ = events.try_iter().count();

    let outcome = runner
        .run(Operation::AddVersion {
            group: "Alpha".into(),
            source: second,
            force: false,
        })
        .unwrap();
    let Ok(OperationOutput::Stored { diff: Some(diff), .. }) = outcome.result else {
        panic!("expected a stored version with a diff");
    };
    assert_eq!(diff.unchanged.len(), 1);
    assert!(diff.changed.contains(std::path::Path::new("edit.txt")));
    assert!(diff.new.contains(std::path::Path::new("added.txt")));
    assert!(diff.missing.contains(std::path::Path::new("gone.txt")));

    assert!(events.try_iter().any(|e| matches!(
        e,
        EngineEvent::Notify { ref message, .. } if message.contains("1 changed")
    )));
}

/// Test: download and open write plaintext; an existing target is not
/// overwritten.
#[test]
fn test_download_and_open_roundtrip() {
    let dir = tempdir().unwrap();
    let (runner, _events) = common::setup_runner(&dir);
    fs::create_dir(runner.context().catalog().group_path("Alpha")).unwrap();
    let source = common::write_tree(
        &dir.path().join("in/release"),
        &[("bin/tool", "#!/bin/sh"), ("README", "read me")],
    );
    let manual = common::write_tree(&dir.path().join("in"), &[("manual.txt", "steps")]);
    runner
        .run(Operation::AddVersion {
            group: "Alpha".into(),
            source,
            force: false,
        })
        .unwrap();
    let added = runner
        .run(Operation::AddInstruction {
            group: "Alpha".into(),
            file: manual.join("manual.txt"),
        })
        .unwrap();
    assert!(added.is_success());
    assert!(
        runner
            .context()
            .catalog()
            .version_path("Alpha", "manual.txt.enc")
            .is_file()
    );

    let out = dir.path().join("out");
    let outcome = runner
        .run(Operation::Download {
            group: "Alpha".into(),
            version: "release".into(),
            destination: out.clone(),
        })
        .unwrap();
    assert!(matches!(outcome.result, Ok(OperationOutput::Extracted(_))));
    assert_eq!(common::list_files(&out.join("release")), vec!["README", "bin/tool"]);
    assert_eq!(fs::read_to_string(out.join("release/README")).unwrap(), "read me");

    let again = runner
        .run(Operation::Download {
            group: "Alpha".into(),
            version: "release".into(),
            destination: out.clone(),
        })
        .unwrap();
    assert!(matches!(again.result, Err(EngineError::AlreadyExists(_))));

    let file = runner
        .run(Operation::Download {
            group: "Alpha".into(),
            version: "manual.txt.enc".into(),
            destination: out.clone(),
        })
        .unwrap();
    assert!(file.is_success());
    assert_eq!(fs::read_to_string(out.join("manual.txt")).unwrap(), "steps");

    // Opening twice replaces the previous extracted copy.
    for _ in 0..2 {
        let opened = runner
            .run(Operation::Open {
                group: "Alpha".into(),
                version: "manual.txt.enc".into(),
                launch: false,
            })
            .unwrap();
        assert!(opened.is_success(), "{:?}", opened.result);
    }
    assert_eq!(
        fs::read_to_string(dir.path().join("tmp/Alpha/manual.txt")).unwrap(),
        "steps"
    );
}

/// Test: archives written with one key cannot be read with another; the
/// failure is classified as cryptographic and nothing is written.
#[test]
fn test_wrong_key_is_cryptographic_error() {
    let dir = tempdir().unwrap();
    let (runner, _events) = common::setup_runner(&dir);
    fs::create_dir(runner.context().catalog().group_path("Alpha")).unwrap();
    let source = common::write_tree(&dir.path().join("in/v1"), &[("a.txt", "secret")]);
    runner
        .run(Operation::AddVersion {
            group: "Alpha".into(),
            source,
            force: false,
        })
        .unwrap();

    let config = runner.context().config().clone();
    let other = ArchiveContext::from_parts(config, runner.context().root(), generate_key().unwrap());
    let (other_runner, _other_events) = JobRunner::new(std::sync::Arc::new(other));
    let out = dir.path().join("out");
    let outcome = other_runner
        .run(Operation::Download {
            group: "Alpha".into(),
            version: "v1".into(),
            destination: out.clone(),
        })
        .unwrap();
    let err = outcome.result.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Cryptographic);
    assert_eq!(outcome.status, 3);
    assert!(common::list_files(&out).is_empty());
}

#[test]
fn test_delete_operations() {
    let dir = tempdir().unwrap();
    let (runner, _events) = common::setup_runner(&dir);
    common::seed_groups(runner.context().root());

    let outcome = runner
        .run(Operation::DeleteFile {
            group: "Alpha".into(),
            version: "v2 05.01.2024".into(),
        })
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(
        runner.context().catalog().actual_version("Alpha").as_deref(),
        Some("v1 01.01.2024")
    );

    let missing = runner
        .run(Operation::DeleteFile {
            group: "Alpha".into(),
            version: "nope".into(),
        })
        .unwrap();
    assert_eq!(missing.status, 6);

    assert!(
        runner
            .run(Operation::DeleteGroup {
                group: "Beta".into()
            })
            .unwrap()
            .is_success()
    );
    assert_eq!(runner.context().catalog().list_groups(), vec!["Alpha"]);
}

#[test]
fn test_create_group_twice_is_already_exists() {
    let dir = tempdir().unwrap();
    let (runner, _events) = common::setup_runner(&dir);
    let op = Operation::CreateGroup {
        group: "Gamma".into(),
    };
    assert!(runner.run(op.clone()).unwrap().is_success());
    let second = runner.run(op).unwrap();
    assert!(matches!(second.result, Err(EngineError::AlreadyExists(_))));
    assert_eq!(second.status, 5);
}
