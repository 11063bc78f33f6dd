mod cli;
pub mod errors;
mod handlers;
mod ui;

use crate::cli::{Cli, Command};
use crate::errors::CliError;
use crate::handlers::Session;
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use verarc::ArchiveConfig;

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,verarc=debug,verarc_cli=debug"
    } else {
        "warn,verarc=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = match cli.config {
        Some(path) => path,
        None => ArchiveConfig::default_location()?,
    };

    if let Command::Init { versions_path } = &cli.command {
        return handlers::init::handle_init(&config_path, versions_path, cli.password_stdin);
    }

    let session = Session::open(&config_path, cli.yes, cli.password_stdin)?;
    match cli.command {
        Command::Init { .. } => unreachable!("handled above"),
        Command::Groups => handlers::catalog::handle_groups(&session),
        Command::Versions { group } => handlers::catalog::handle_versions(&session, &group),
        Command::Search { query, all } => handlers::catalog::handle_search(&session, &query, all),
        Command::Diff {
            group,
            candidate,
            against,
            json,
        } => handlers::diff::handle_diff(&session, &group, against.as_deref(), &candidate, json),
        Command::CreateGroup { group } => handlers::jobs::handle_create_group(&session, group),
        Command::AddVersion {
            group,
            source,
            force,
        } => handlers::jobs::handle_add_version(&session, group, source, force),
        Command::AddInstruction { group, file } => {
            handlers::jobs::handle_add_instruction(&session, group, file)
        }
        Command::DeleteGroup { group } => handlers::jobs::handle_delete_group(&session, group),
        Command::DeleteFile { group, version } => {
            handlers::jobs::handle_delete_file(&session, group, version)
        }
        Command::Download {
            group,
            version,
            destination,
        } => handlers::jobs::handle_download(&session, group, version, destination),
        Command::Open {
            group,
            version,
            no_launch,
        } => handlers::jobs::handle_open(&session, group, version, !no_launch),
        Command::Passwd => handlers::passwd::handle_passwd(&session),
    }
}
