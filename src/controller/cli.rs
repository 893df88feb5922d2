use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use crate::container_management::Verb;
use crate::storage::csv_loader::DEFAULT_DATA_DIR;

#[derive(Debug, Parser)]
#[command(name = "sqlctl")]
#[command(version)]
#[command(about = "Manage a containerized SQL Server instance for local development")]
pub struct Cli {
    /// Settings file (TOML). Defaults to ./sqlctl.toml when present.
    #[arg(short, long, env = "SQLCTL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Action {
    /// Create or start the SQL Server container
    Start {
        /// Also wait until SQL Server accepts logins
        #[arg(long)]
        wait_ready: bool,
    },
    /// Stop the container, keeping it for a later start
    Stop,
    /// Stop then start the container
    Restart,
    /// Stop and delete the container
    Remove,
    /// Show container state and connection settings
    Status,
    /// Print the container output
    Logs {
        /// Only the last N lines
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Connect and print the server version
    Connect,
    /// Create the products table and insert sample data
    InitSchema,
    /// Load every CSV file in a directory into the products table
    LoadCsv {
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },
}

impl Action {
    /// The lifecycle verb behind this action, if it is one.
    pub fn verb(&self) -> Option<Verb> {
        match self {
            Action::Start { .. } => Some(Verb::Start),
            Action::Stop => Some(Verb::Stop),
            Action::Restart => Some(Verb::Restart),
            Action::Remove => Some(Verb::Remove),
            Action::Status => Some(Verb::Status),
            Action::Logs { tail } => Some(Verb::Logs { tail: *tail }),
            Action::Connect | Action::InitSchema | Action::LoadCsv { .. } => None,
        }
    }
}

/// What the command line asked for.
#[derive(Debug)]
pub enum Invocation {
    Run(Cli),
    /// Help or version text; exits 0.
    Help(String),
    /// Parse error followed by the full usage; exits 1.
    Usage(String),
}

pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

pub fn parse_args<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) if cli.command.is_none() => Invocation::Help(usage()),
        Ok(cli) => Invocation::Run(cli),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                Invocation::Help(e.to_string())
            }
            _ => Invocation::Usage(format!("{}\n{}", e.render(), usage())),
        },
    }
}
