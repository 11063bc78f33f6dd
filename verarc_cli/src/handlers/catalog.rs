use crate::errors::CliError;
use crate::handlers::Session;
use crate::ui::printer::{print_groups, print_search_hits, print_versions};

pub fn handle_groups(session: &Session) -> Result<(), CliError> {
    let catalog = session.context.catalog();
    let groups: Vec<(String, Option<String>)> = catalog
        .list_groups()
        .into_iter()
        .map(|group| {
            let actual = catalog.actual_version(&group);
            (group, actual)
        })
        .collect();
    if groups.is_empty() {
        println!("No groups found in {:?}.", session.context.root());
    } else {
        print_groups(&groups);
    }
    Ok(())
}

pub fn handle_versions(session: &Session, group: &str) -> Result<(), CliError> {
    let catalog = session.context.catalog();
    let versions = catalog
        .try_list_versions(group)
        .map_err(verarc::EngineError::from)?;
    if versions.is_empty() {
        println!("Group '{}' has no versions.", group);
        return Ok(());
    }
    print_versions(catalog, group, &versions);
    Ok(())
}

pub fn handle_search(session: &Session, query: &str, all: bool) -> Result<(), CliError> {
    let catalog = session.context.catalog();
    let hits = if all {
        catalog.search_all(query)
    } else {
        catalog.search(query)
    };
    if hits.is_empty() {
        println!("Nothing matches '{}'.", query);
    } else {
        println!("Found {} match(es) for '{}':", hits.len(), query);
        print_search_hits(&hits);
    }
    Ok(())
}
