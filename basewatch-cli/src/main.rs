//! Basewatch CLI - command-line interface
//!
//! This binary provides a command-line interface to the basewatch library.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod error;

#[derive(Parser)]
#[command(name = "basewatch")]
#[command(version = basewatch::VERSION)]
#[command(about = "Track sequencing run progress and serve live status", long_about = None)]
struct Cli {
    /// Path to config.ini (defaults to ~/.basewatch/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the poll loop and the status server
    Start {
        /// Listen address, overriding the config file
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a single poll pass and print run summaries
    Check,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start { bind } => commands::start::run(cli.config.as_deref(), bind),
        Command::Check => commands::check::run(cli.config.as_deref()),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
