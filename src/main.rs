//! sprepl - An Interactive Shell for an Embedded Ordered Key-Value Store
//!
//! This is the main entry point. It parses the command line, sets up
//! logging, opens the session and hands the terminal to the REPL loop.

use anyhow::Context;
use clap::Parser;
use sprepl::repl::{Session, SessionConfig, Terminal};
use sprepl::storage::StoreConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Interactive shell for inspecting a store directory
#[derive(Debug, Parser)]
#[command(name = "sprepl", version, about)]
struct Args {
    /// Database directory
    #[arg(value_name = "DATABASE", default_value = sprepl::DEFAULT_DATABASE_PATH)]
    database: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Logs go to stderr and stay quiet unless RUST_LOG asks for more
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = SessionConfig::new(StoreConfig::new(&args.database));
    info!(version = sprepl::VERSION, database = %args.database.display(), "Starting");

    // Dropping a partially built session closes whatever was opened
    let mut session = Session::open(config)?;
    let mut terminal = Terminal::new().context("Failed to start line editor")?;

    session.run(&mut terminal)?;
    session.close();

    Ok(())
}
