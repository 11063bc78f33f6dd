use crate::errors::CliError;
use crate::handlers::Session;
use crate::ui::printer::print_diff;
use std::path::Path;
use verarc::EngineError;
use verarc::common::names::validate_entry_name;
use verarc::diff::compare_archived;

fn checked(name: &str) -> Result<(), CliError> {
    validate_entry_name(name).map_err(|reason| EngineError::InvalidName(reason).into())
}

/// Compares `candidate` with an archived version without storing anything.
pub fn handle_diff(
    session: &Session,
    group: &str,
    version: Option<&str>,
    candidate: &Path,
    json: bool,
) -> Result<(), CliError> {
    checked(group)?;
    let catalog = session.context.catalog();
    let version = match version {
        Some(v) => {
            checked(v)?;
            v.to_string()
        }
        None => catalog
            .actual_version(group)
            .ok_or_else(|| CliError::NoVersions(group.to_string()))?,
    };
    let existing = catalog.version_path(group, &version);
    if !existing.exists() {
        return Err(EngineError::NotFound(existing).into());
    }

    let result = compare_archived(&existing, candidate, session.context.key())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Comparing {:?} with '{}/{}':", candidate, group, version);
        print_diff(&result);
    }
    Ok(())
}
