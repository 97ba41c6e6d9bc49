//! Run command - process an input file from start to end.

use std::path::PathBuf;
use std::sync::Arc;

use fanjoin::lifecycle::RunOutcome;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
pub struct RunArgs {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub debug: bool,
}

/// Run the run command.
///
/// Succeeds when the input is exhausted or the run is interrupted; a run
/// halted by the error threshold is an error (exit status 1).
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("run");

    let controller = runner.create_controller();

    let on_interrupt = Arc::clone(&controller);
    if let Err(e) = ctrlc::set_handler(move || on_interrupt.force_cancel()) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let summary = runner.block_on(async {
        let source = controller.open_source(&args.input).await?;
        Ok::<_, CliError>(controller.run(source).await?)
    })?;

    info!(
        processed = summary.processed,
        computed = controller.total_computed(),
        failed = controller.total_failed(),
        "Run ended: {}", summary.outcome
    );

    match summary.outcome {
        RunOutcome::Halted(condition) => Err(CliError::Halted(condition)),
        RunOutcome::Cancelled => {
            eprintln!("Cancelled after {} inputs", summary.processed);
            Ok(())
        }
        RunOutcome::InputFailed(msg) => {
            eprintln!("Input ended early: {}", msg);
            Ok(())
        }
        RunOutcome::Completed => Ok(()),
    }
}
