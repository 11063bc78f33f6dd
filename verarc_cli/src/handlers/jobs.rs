//! Commands that run as background jobs.

use crate::errors::CliError;
use crate::handlers::Session;
use crate::ui::progress::follow;
use std::path::PathBuf;
use verarc::EngineError;
use verarc::jobs::{JobOutcome, JobRunner, Operation, OperationOutput};

/// Submits `operation` and renders its progress until it finishes.
fn run_job(session: &Session, operation: Operation) -> Result<JobOutcome, CliError> {
    let (runner, events) = JobRunner::new(session.context.clone());
    let handle = runner.submit(operation)?;
    Ok(follow(handle, &events))
}

fn finish(outcome: JobOutcome) -> Result<OperationOutput, CliError> {
    tracing::debug!(job = %outcome.id, status = outcome.status, "{} done", outcome.operation);
    Ok(outcome.result?)
}

pub fn handle_create_group(session: &Session, group: String) -> Result<(), CliError> {
    session.authorize()?;
    finish(run_job(session, Operation::CreateGroup { group: group.clone() })?)?;
    println!("Group '{}' created.", group);
    Ok(())
}

pub fn handle_add_version(
    session: &Session,
    group: String,
    source: PathBuf,
    force: bool,
) -> Result<(), CliError> {
    session.authorize()?;
    let operation = Operation::AddVersion {
        group: group.clone(),
        source: source.clone(),
        force,
    };
    let outcome = match run_job(session, operation)?.result {
        Err(EngineError::NoMeaningfulChanges(summary)) => {
            println!("The new version matches the actual one ({}).", summary);
            if !session.confirm("Store it anyway?")? {
                println!("Operation cancelled.");
                return Ok(());
            }
            let forced = Operation::AddVersion {
                group: group.clone(),
                source,
                force: true,
            };
            finish(run_job(session, forced)?)?
        }
        other => other?,
    };
    if let OperationOutput::Stored { path, .. } = outcome {
        println!("Version stored at {:?}", path);
    }
    Ok(())
}

pub fn handle_add_instruction(session: &Session, group: String, file: PathBuf) -> Result<(), CliError> {
    session.authorize()?;
    if let OperationOutput::Stored { path, .. } =
        finish(run_job(session, Operation::AddInstruction { group, file })?)?
    {
        println!("File stored at {:?}", path);
    }
    Ok(())
}

pub fn handle_delete_group(session: &Session, group: String) -> Result<(), CliError> {
    session.authorize()?;
    let versions = session.context.catalog().list_versions(&group).len();
    let prompt = format!(
        "This will PERMANENTLY DELETE group '{}' and its {} version(s). Are you sure?",
        group, versions
    );
    if !session.confirm(&prompt)? {
        println!("Operation cancelled.");
        return Ok(());
    }
    finish(run_job(session, Operation::DeleteGroup { group: group.clone() })?)?;
    println!("Group '{}' deleted.", group);
    Ok(())
}

pub fn handle_delete_file(session: &Session, group: String, version: String) -> Result<(), CliError> {
    session.authorize()?;
    let prompt = format!(
        "This will PERMANENTLY DELETE '{}' from group '{}'. Are you sure?",
        version, group
    );
    if !session.confirm(&prompt)? {
        println!("Operation cancelled.");
        return Ok(());
    }
    finish(run_job(
        session,
        Operation::DeleteFile {
            group,
            version: version.clone(),
        },
    )?)?;
    println!("'{}' deleted.", version);
    Ok(())
}

pub fn handle_download(
    session: &Session,
    group: String,
    version: String,
    destination: PathBuf,
) -> Result<(), CliError> {
    let outcome = finish(run_job(
        session,
        Operation::Download {
            group,
            version,
            destination,
        },
    )?)?;
    if let OperationOutput::Extracted(path) = outcome {
        println!("Downloaded to {:?}", path);
    }
    Ok(())
}

pub fn handle_open(
    session: &Session,
    group: String,
    version: Option<String>,
    launch: bool,
) -> Result<(), CliError> {
    let version = match version {
        Some(v) => v,
        None => session
            .context
            .catalog()
            .actual_version(&group)
            .ok_or_else(|| CliError::NoVersions(group.clone()))?,
    };
    let outcome = finish(run_job(
        session,
        Operation::Open {
            group,
            version,
            launch,
        },
    )?)?;
    if let OperationOutput::Extracted(path) = outcome {
        println!("Extracted to {:?}", path);
    }
    Ok(())
}
