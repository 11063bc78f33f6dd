//! Functions for printing catalog items to the console.

use verarc::catalog::{Catalog, SearchHit, VersionKind};
use verarc::common::names::logical_name;
use verarc::diff::DiffResult;
use verarc::version::extract_date;

/// One line per group: name and actual version.
pub fn print_groups(groups: &[(String, Option<String>)]) {
    let width = groups.iter().map(|(g, _)| g.len()).max().unwrap_or(0).max(5);
    println!("{:<width$}  ACTUAL", "GROUP", width = width);
    for (group, actual) in groups {
        let actual = actual.as_deref().map(logical_name).unwrap_or("-");
        println!("{:<width$}  {}", group, actual, width = width);
    }
}

/// Versions in recency order; the first one is the actual version.
pub fn print_versions(catalog: &Catalog, group: &str, versions: &[String]) {
    for (i, version) in versions.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        let kind = match catalog.version_kind(group, version) {
            Some(VersionKind::Directory) => "--[folder]--",
            Some(VersionKind::File) => "--[file]----",
            None => "--[gone]----",
        };
        let date = extract_date(version)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "undated".to_string());
        println!("{} {} {:<10} {}", marker, kind, date, logical_name(version));
    }
}

pub fn print_search_hits(hits: &[SearchHit]) {
    for hit in hits {
        match &hit.version {
            Some(version) => println!("  {} / {}", hit.group, logical_name(version)),
            None => println!("  {} (no versions)", hit.group),
        }
    }
}

/// Human-readable diff: one section per non-empty category.
pub fn print_diff(result: &DiffResult) {
    let sections = [
        ("Changed", &result.changed),
        ("New", &result.new),
        ("Missing", &result.missing),
    ];
    for (title, paths) in sections {
        if paths.is_empty() {
            continue;
        }
        println!("{} ({}):", title, paths.len());
        for path in paths {
            println!("  {}", path.display());
        }
    }
    println!("Summary: {}", result.summary());
    if result.needs_confirmation() {
        println!("No meaningful changes against the archived version.");
    }
}
