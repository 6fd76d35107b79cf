//! Dojo command line
//!
//! Usage:
//!   dojo create-room office Blue Red
//!   dojo add-person "Ann Lee" fellow Y
//!   dojo print-allocations -o allocations.txt
//!
//! State lives in a SQLite file (`--db`, `DOJO_DB`, or `~/.dojo/dojo.db`).

mod app;
mod people_file;
mod report;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::prelude::*;

use dojo_core::config::{StoreConfig, DB_ENV_VAR};

use app::{App, Command};

#[derive(Debug, Parser)]
#[command(name = "dojo", version, about = "Office and living space allocation")]
struct Cli {
    /// Working database
    #[arg(long, global = true, env = DB_ENV_VAR)]
    db: Option<PathBuf>,

    /// Log allocation decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.db {
        Some(path) => StoreConfig::default().with_path(path),
        None => StoreConfig::from_env(),
    };
    let mut app = App::open_for(config, &cli.command)?;
    let stdout = io::stdout();
    app.execute(cli.command, &mut stdout.lock())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
