//! Process entry: arguments, logging, runtime, and exit codes.
use std::sync::Arc;

use clap::Parser;
use tracing::{error, warn};

use crate::args::StampedeArgs;
use crate::config::{build_plan, load_config};
use crate::engine::{Engine, TestResult};
use crate::error::{AppError, AppResult};
use crate::script::StepScript;
use crate::shutdown::StopSignal;
use crate::shutdown_handlers::setup_signal_shutdown_handler;
use crate::summary::{export_summary, print_summary};

/// Exit code for invalid arguments or config.
pub const EXIT_CONFIG_ERROR: i32 = 104;
/// Exit code for failures outside the test itself.
pub const EXIT_INTERNAL_ERROR: i32 = 1;

/// Parses the command line, runs the test, and returns the process exit code.
#[must_use]
pub fn run() -> i32 {
    let args = StampedeArgs::parse();
    crate::system::logger::init_logging(args.verbose, args.quiet, args.no_color);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start the async runtime: {}", err);
            return EXIT_INTERNAL_ERROR;
        }
    };

    match runtime.block_on(run_async(&args)) {
        Ok(result) => result.exit_code(),
        Err(err) => {
            error!("{}", err);
            exit_code_for(&err)
        }
    }
}

const fn exit_code_for(err: &AppError) -> i32 {
    if matches!(err, AppError::Config(_)) {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_INTERNAL_ERROR
    }
}

async fn run_async(args: &StampedeArgs) -> AppResult<TestResult> {
    let config = load_config(args.config.as_deref())?;
    let plan = build_plan(&config, args.base_url.as_deref())?;
    let script = StepScript::from_config(config.steps.as_deref().unwrap_or(&[]))?;
    let engine = Engine::new(plan)?;

    let finished = StopSignal::new();
    let signals = setup_signal_shutdown_handler(&engine.interrupt_signal(), &finished);
    let result = engine.run(Arc::new(script)).await;
    finished.trigger();
    if let Err(err) = signals.await {
        warn!("Signal handler failed: {}", err);
    }

    if let Some(path) = args.summary_export.as_deref()
        && let Err(err) = export_summary(path, &result).await
    {
        error!("{}", err);
    }
    if !args.quiet {
        print_summary(&result);
    }
    Ok(result)
}
