//! Console command - drive a run interactively from stdin.
//!
//! Reads one administrative command per line while results stream to
//! stdout:
//!
//! ```text
//! start    reset, then begin processing the input file
//! pause    stop showing output (computation continues)
//! resume   show output again
//! cancel   pause output and cancel all pending work
//! reset    fresh pool, empty cache, zero counters
//! status   counters, cache, pool and run state
//! quit     cancel anything running and exit
//! ```
//!
//! Every `start` begins from a fresh state. `cancel` does not reset: a reset
//! is refused while cancelled work is still draining, so it is left to the
//! next `start` or an explicit `reset`. `status` prints one snapshot and
//! returns, so it leaves the output gate alone.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use fanjoin::lifecycle::{LifecycleController, LifecycleError, RunHandle, RunOutcome};
use fanjoin::source::SourceError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the console command.
pub struct ConsoleArgs {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub debug: bool,
}

/// One line of console input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Pause,
    Resume,
    Cancel,
    Reset,
    Status,
    Help,
    Quit,
}

/// Unrecognized console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command '{}' (type 'help')", self.0)
    }
}

impl FromStr for ConsoleCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" | "s" => Ok(Self::Start),
            "pause" | "p" => Ok(Self::Pause),
            "resume" | "r" => Ok(Self::Resume),
            "cancel" | "c" => Ok(Self::Cancel),
            "reset" => Ok(Self::Reset),
            "status" | "st" => Ok(Self::Status),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// Run the console command.
pub fn run(args: ConsoleArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("console");

    let controller = runner.create_controller();
    runner.block_on(console_loop(controller, &args.input))
}

async fn console_loop(controller: Arc<LifecycleController>, input: &Path) -> Result<(), CliError> {
    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut watcher: Option<JoinHandle<()>> = None;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CliError::Input(SourceError::Read(e)))?
    {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        debug!(?command, "Console command");

        match command {
            ConsoleCommand::Start => match start_run(&controller, input).await {
                Ok(handle) => {
                    if let Some(previous) = watcher.replace(tokio::spawn(report(handle))) {
                        let _ = previous.await;
                    }
                }
                Err(e) => eprintln!("{}", e),
            },
            ConsoleCommand::Pause => controller.pause_output(),
            ConsoleCommand::Resume => controller.resume_output(),
            ConsoleCommand::Cancel => {
                controller.force_cancel();
                println!("Cancelled; output paused until reset or resume");
            }
            ConsoleCommand::Reset => match controller.reset() {
                Ok(()) => println!("Reset complete"),
                Err(e) => eprintln!("{}", e),
            },
            ConsoleCommand::Status => println!("{}", controller.status()),
            ConsoleCommand::Help => print_help(),
            ConsoleCommand::Quit => break,
        }
    }

    if controller.is_running() {
        controller.force_cancel();
    }
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }
    info!(
        computed = controller.total_computed(),
        failed = controller.total_failed(),
        "Console closed"
    );
    Ok(())
}

async fn start_run(controller: &Arc<LifecycleController>, input: &Path) -> Result<RunHandle, CliError> {
    if controller.is_running() {
        return Err(LifecycleError::AlreadyRunning.into());
    }
    controller.reset()?;
    let source = controller.open_source(input).await?;
    Ok(controller.start(source)?)
}

/// Prints how a run ended once it does.
async fn report(handle: RunHandle) {
    match handle.wait().await {
        Ok(summary) => match summary.outcome {
            RunOutcome::Completed => {
                println!("Run completed: {} inputs", summary.processed)
            }
            RunOutcome::Cancelled => {
                println!("Run cancelled after {} inputs", summary.processed)
            }
            RunOutcome::Halted(condition) => {
                eprintln!("Run halted: {} (reset to start again)", condition)
            }
            RunOutcome::InputFailed(msg) => eprintln!("Input ended early: {}", msg),
        },
        Err(e) => eprintln!("{}", e),
    }
}

fn print_help() {
    println!("Commands: start | pause | resume | cancel | reset | status | help | quit");
}
