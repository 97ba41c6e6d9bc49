//! fanjoin CLI - Command-line interface
//!
//! This binary drives the fanjoin orchestrator over an input file, either as
//! a batch run or interactively.

mod commands;
mod error;
mod runner;
mod sink;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::config::ConfigCommands;
use commands::console::ConsoleArgs;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "fanjoin")]
#[command(version = fanjoin::VERSION)]
#[command(about = "Compute F(x) + G(x) for a stream of inputs with timeouts, caching and a failure circuit breaker", long_about = None)]
struct Args {
    /// Config file to use instead of ~/.fanjoin/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (also mirrored to stderr)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every integer in the input file, then exit
    Run {
        /// Whitespace-separated integers
        #[arg(long, short, default_value = "input.txt")]
        input: PathBuf,
    },

    /// Control a run interactively from stdin
    Console {
        /// Whitespace-separated integers
        #[arg(long, short, default_value = "input.txt")]
        input: PathBuf,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let args = Args::parse();

    let result = match args.command {
        Commands::Run { input } => commands::run::run(RunArgs {
            input,
            config: args.config,
            debug: args.debug,
        }),
        Commands::Console { input } => commands::console::run(ConsoleArgs {
            input,
            config: args.config,
            debug: args.debug,
        }),
        Commands::Config { command } => commands::config::run(command, args.config),
    };

    if let Err(e) = result {
        e.exit();
    }
}
