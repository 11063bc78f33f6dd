//! Bodies of the mutating operations. Each runs on a worker thread and
//! reports through its [`Emitter`].

use std::fs;
use std::path::{Path, PathBuf};
use crate::catalog::VersionKind;
use crate::common::names::{encrypted_path, logical_name, validate_entry_name};
use crate::config::ArchiveContext;
use crate::diff::{compare_archived, DiffResult};
use crate::error::EngineError;
use crate::jobs::events::{Emitter, Severity};
use crate::transfer::{copy_decrypt, copy_encrypt, decrypt_file, encrypt_file};

/// A unit of work the job runner can execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateGroup { group: String },
    /// Stores a directory or a file as a new version. Unless `force` is set,
    /// a directory identical to the actual version is refused.
    AddVersion { group: String, source: PathBuf, force: bool },
    /// Stores a single file in the group.
    AddInstruction { group: String, file: PathBuf },
    DeleteGroup { group: String },
    DeleteFile { group: String, version: String },
    Download { group: String, version: String, destination: PathBuf },
    /// Decrypts into the temp area; with `launch`, opens the result with the
    /// system default application.
    Open { group: String, version: String, launch: bool },
}

/// Used to allow one in-flight job per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateGroup,
    AddVersion,
    AddInstruction,
    DeleteGroup,
    DeleteFile,
    Download,
    Open,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::CreateGroup { .. } => OperationKind::CreateGroup,
            Operation::AddVersion { .. } => OperationKind::AddVersion,
            Operation::AddInstruction { .. } => OperationKind::AddInstruction,
            Operation::DeleteGroup { .. } => OperationKind::DeleteGroup,
            Operation::DeleteFile { .. } => OperationKind::DeleteFile,
            Operation::Download { .. } => OperationKind::Download,
            Operation::Open { .. } => OperationKind::Open,
        }
    }

    /// Name carried by the completion event.
    pub fn name(&self) -> &'static str {
        match self.kind() {
            OperationKind::CreateGroup => "create_group",
            OperationKind::AddVersion => "add_version",
            OperationKind::AddInstruction => "add_instruction",
            OperationKind::DeleteGroup => "delete_group",
            OperationKind::DeleteFile => "delete_file",
            OperationKind::Download => "download",
            OperationKind::Open => "open",
        }
    }
}

/// What a successful operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    Done,
    /// A new version was written at `path`.
    Stored { path: PathBuf, diff: Option<DiffResult> },
    /// Plaintext was written at this path.
    Extracted(PathBuf),
}

pub(crate) fn execute(
    operation: &Operation,
    context: &ArchiveContext,
    emitter: &Emitter,
) -> Result<OperationOutput, EngineError> {
    match operation {
        Operation::CreateGroup { group } => create_group(context, group),
        Operation::AddVersion { group, source, force } => {
            add_version(context, group, source, *force, emitter)
        }
        Operation::AddInstruction { group, file } => add_instruction(context, group, file, emitter),
        Operation::DeleteGroup { group } => delete_group(context, group),
        Operation::DeleteFile { group, version } => delete_file(context, group, version),
        Operation::Download { group, version, destination } => {
            download(context, group, version, destination, emitter)
        }
        Operation::Open { group, version, launch } => {
            open_version(context, group, version, *launch, emitter)
        }
    }
}

fn checked_name(name: &str) -> Result<(), EngineError> {
    validate_entry_name(name).map_err(EngineError::InvalidName)
}

fn existing_group(context: &ArchiveContext, group: &str) -> Result<PathBuf, EngineError> {
    checked_name(group)?;
    let path = context.catalog().group_path(group);
    if !path.is_dir() {
        return Err(EngineError::NotFound(path));
    }
    Ok(path)
}

fn existing_version(
    context: &ArchiveContext,
    group: &str,
    version: &str,
) -> Result<(PathBuf, VersionKind), EngineError> {
    existing_group(context, group)?;
    checked_name(version)?;
    let path = context.catalog().version_path(group, version);
    match context.catalog().version_kind(group, version) {
        Some(kind) => Ok((path, kind)),
        None => Err(EngineError::NotFound(path)),
    }
}

fn source_name(source: &Path) -> Result<String, EngineError> {
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EngineError::InvalidName(source.display().to_string()))?;
    checked_name(name)?;
    Ok(name.to_string())
}

pub fn create_group(context: &ArchiveContext, group: &str) -> Result<OperationOutput, EngineError> {
    checked_name(group)?;
    context.check_root()?;
    let path = context.catalog().group_path(group);
    fs::create_dir(&path).map_err(|e| EngineError::from_io(&path, e))?;
    tracing::info!(group, "group created");
    Ok(OperationOutput::Done)
}

/// Compares a directory candidate against the group's actual version when
/// that is also a directory.
fn verify_against_actual(
    context: &ArchiveContext,
    group: &str,
    candidate: &Path,
    emitter: &Emitter,
) -> Result<Option<DiffResult>, EngineError> {
    let Some(actual) = context.catalog().actual_version(group) else {
        return Ok(None);
    };
    if context.catalog().version_kind(group, &actual) != Some(VersionKind::Directory) {
        return Ok(None);
    }
    let diff = compare_archived(
        &context.catalog().version_path(group, &actual),
        candidate,
        context.key(),
    )?;
    emitter.notify(
        Severity::Info,
        format!("Compared with '{}': {}", actual, diff.summary()),
    );
    Ok(Some(diff))
}

pub fn add_version(
    context: &ArchiveContext,
    group: &str,
    source: &Path,
    force: bool,
    emitter: &Emitter,
) -> Result<OperationOutput, EngineError> {
    let group_path = existing_group(context, group)?;
    if !source.exists() {
        return Err(EngineError::NotFound(source.to_path_buf()));
    }
    if source.is_file() {
        return add_single_file(context, group, source, emitter);
    }

    let name = source_name(source)?;
    let target = group_path.join(&name);
    if target.exists() {
        return Err(EngineError::AlreadyExists(target));
    }

    let diff = verify_against_actual(context, group, source, emitter)?;
    if let Some(diff) = &diff {
        if diff.needs_confirmation() && !force {
            return Err(EngineError::NoMeaningfulChanges(diff.summary()));
        }
    }

    // Claim the name first; a concurrent job for the same version fails here.
    fs::create_dir(&target).map_err(|e| EngineError::from_io(&target, e))?;
    let mut sink = |stage: &str, percent: u8| emitter.progress(stage, percent);
    let report = copy_encrypt(source, &target, context.key(), &mut sink)?;
    tracing::info!(group, version = %name, files = report.files, "version stored");
    Ok(OperationOutput::Stored { path: target, diff })
}

fn add_single_file(
    context: &ArchiveContext,
    group: &str,
    file: &Path,
    emitter: &Emitter,
) -> Result<OperationOutput, EngineError> {
    let group_path = existing_group(context, group)?;
    let name = source_name(file)?;
    let target = encrypted_path(&group_path.join(&name));
    if target.exists() {
        return Err(EngineError::AlreadyExists(target));
    }
    let mut sink = |stage: &str, percent: u8| emitter.progress(stage, percent);
    let stored = encrypt_file(file, &group_path, context.key(), &mut sink)?;
    tracing::info!(group, file = %name, "file stored");
    Ok(OperationOutput::Stored {
        path: stored,
        diff: None,
    })
}

pub fn add_instruction(
    context: &ArchiveContext,
    group: &str,
    file: &Path,
    emitter: &Emitter,
) -> Result<OperationOutput, EngineError> {
    if !file.exists() {
        return Err(EngineError::NotFound(file.to_path_buf()));
    }
    if !file.is_file() {
        return Err(EngineError::InvalidName(format!(
            "{} is not a file",
            file.display()
        )));
    }
    add_single_file(context, group, file, emitter)
}

pub fn delete_group(context: &ArchiveContext, group: &str) -> Result<OperationOutput, EngineError> {
    let path = existing_group(context, group)?;
    fs::remove_dir_all(&path).map_err(|e| EngineError::from_io(&path, e))?;
    tracing::info!(group, "group deleted");
    Ok(OperationOutput::Done)
}

pub fn delete_file(
    context: &ArchiveContext,
    group: &str,
    version: &str,
) -> Result<OperationOutput, EngineError> {
    let (path, kind) = existing_version(context, group, version)?;
    match kind {
        VersionKind::File => fs::remove_file(&path),
        VersionKind::Directory => fs::remove_dir_all(&path),
    }
    .map_err(|e| EngineError::from_io(&path, e))?;
    tracing::info!(group, version, "version deleted");
    Ok(OperationOutput::Done)
}

/// Decrypts a version into `destination` (a directory).
fn extract(
    context: &ArchiveContext,
    group: &str,
    version: &str,
    destination: &Path,
    emitter: &Emitter,
) -> Result<PathBuf, EngineError> {
    let (source, kind) = existing_version(context, group, version)?;
    let target = destination.join(logical_name(version));
    if target.exists() {
        return Err(EngineError::AlreadyExists(target));
    }
    fs::create_dir_all(destination).map_err(|e| EngineError::from_io(destination, e))?;
    let mut sink = |stage: &str, percent: u8| emitter.progress(stage, percent);
    match kind {
        VersionKind::File => {
            decrypt_file(&source, destination, context.key(), &mut sink)?;
        }
        VersionKind::Directory => {
            copy_decrypt(&source, &target, context.key(), &mut sink)?;
        }
    }
    Ok(target)
}

pub fn download(
    context: &ArchiveContext,
    group: &str,
    version: &str,
    destination: &Path,
    emitter: &Emitter,
) -> Result<OperationOutput, EngineError> {
    let target = extract(context, group, version, destination, emitter)?;
    tracing::info!(group, version, target = %target.display(), "version downloaded");
    Ok(OperationOutput::Extracted(target))
}

pub fn open_version(
    context: &ArchiveContext,
    group: &str,
    version: &str,
    launch: bool,
    emitter: &Emitter,
) -> Result<OperationOutput, EngineError> {
    existing_version(context, group, version)?;
    let scratch = context.open_dir().join(group);
    // Always show the current archived content, not a stale copy.
    let stale = scratch.join(logical_name(version));
    if stale.is_dir() {
        fs::remove_dir_all(&stale).map_err(|e| EngineError::from_io(&stale, e))?;
    } else if stale.exists() {
        fs::remove_file(&stale).map_err(|e| EngineError::from_io(&stale, e))?;
    }
    let target = extract(context, group, version, &scratch, emitter)?;
    if launch {
        opener::open(&target).map_err(|e| EngineError::Launch {
            path: target.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(OperationOutput::Extracted(target))
}
