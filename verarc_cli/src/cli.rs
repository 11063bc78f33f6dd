use std::path::PathBuf;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Versioned encrypted archive", long_about = None)]
pub struct Cli {
    /// Path to config.yaml (default: next to the executable)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Read passwords from stdin, one per line, instead of the terminal
    #[arg(long, global = true)]
    pub password_stdin: bool,

    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a config file and generate a key file; with --password-stdin
    /// also set the password
    Init {
        /// Storage root holding one directory per group
        #[arg(required = true)]
        versions_path: PathBuf,
    },
    /// List groups with their actual version
    #[command(visible_alias = "ls")]
    Groups,
    /// List a group's versions, most relevant first
    Versions {
        #[arg(required = true)]
        group: String,
    },
    /// Case-insensitive search over group and version names
    Search {
        #[arg(required = true)]
        query: String,

        /// Match every version, not only the actual one
        #[arg(short, long)]
        all: bool,
    },
    /// Compare a local directory with an archived version
    Diff {
        #[arg(required = true)]
        group: String,

        /// Local directory to compare
        #[arg(required = true)]
        candidate: PathBuf,

        /// Archived version to compare against (default: actual version)
        #[arg(short, long, value_name = "VERSION")]
        against: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    CreateGroup {
        #[arg(required = true)]
        group: String,
    },
    /// Store a directory or file as a new version
    AddVersion {
        #[arg(required = true)]
        group: String,

        #[arg(required = true)]
        source: PathBuf,

        /// Store even when nothing changed against the actual version
        #[arg(short, long)]
        force: bool,
    },
    /// Store a single file (instructions, notes) in a group
    AddInstruction {
        #[arg(required = true)]
        group: String,

        #[arg(required = true)]
        file: PathBuf,
    },
    /// Permanently delete a group and all its versions
    DeleteGroup {
        #[arg(required = true)]
        group: String,
    },
    /// Permanently delete one version
    #[command(visible_alias = "rm")]
    DeleteFile {
        #[arg(required = true)]
        group: String,

        #[arg(required = true)]
        version: String,
    },
    /// Decrypt a version into a local directory
    #[command(visible_alias = "get")]
    Download {
        #[arg(required = true)]
        group: String,

        #[arg(required = true)]
        version: String,

        /// Directory the version is written into
        #[arg(required = true)]
        destination: PathBuf,
    },
    /// Decrypt a version to the temp area and open it
    Open {
        #[arg(required = true)]
        group: String,

        /// Version to open (default: actual version)
        version: Option<String>,

        /// Only extract; do not launch an application
        #[arg(long)]
        no_launch: bool,
    },
    /// Set or change the password guarding mutating commands
    Passwd,
}
