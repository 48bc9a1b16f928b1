//! Library entry points
//!
//! Discovery, scheduling, dispatch and reporting wired together for a whole
//! registry ([`run_all`], [`main_ci`]) or a single module ([`main_test`]).

use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

use crate::config::HarnessConfig;
use crate::discovery::Discovery;
use crate::error::HarnessError;
use crate::models::{RunReport, TestUnit};
use crate::output::{write_report, Reporter};
use crate::pool::{Dispatcher, ProcessWorkerFactory, WorkerCommand};
use crate::registry::ModuleRegistry;
use crate::utils::Stopwatch;

/// Exit status when the engine itself could not complete a run
pub const EXIT_HARNESS_ERROR: i32 = 2;

/// Options for running a single module
#[derive(Clone, Debug, Default)]
pub struct MainTestOptions {
    /// Print one line per passing unit
    pub verbose: bool,
    /// Restrict the run to matching units of the module
    pub run_only: Option<String>,
    /// Worker command; the current binary when unset
    pub worker: Option<WorkerCommand>,
}

/// Discover, schedule and run every unit of `registry` and the configured
/// documentation directories. Writes the failure summary to stdout.
pub async fn run_all(
    registry: &ModuleRegistry,
    config: &HarnessConfig,
) -> Result<RunReport, HarnessError> {
    config.validate()?;
    let units = Discovery::new(registry)
        .with_doc_dirs(config.doc_dirs.iter().cloned())
        .discover();
    run_units(units, config).await
}

/// Run the units of one registered module
pub async fn main_test(
    registry: &ModuleRegistry,
    module: &str,
    options: MainTestOptions,
) -> Result<RunReport, HarnessError> {
    if !registry.contains(module) {
        return Err(HarnessError::UnknownModule(module.to_string()));
    }

    let config = HarnessConfig {
        verbose: options.verbose,
        run_only: options.run_only,
        worker: options.worker,
        ..HarnessConfig::default()
    };
    let units = Discovery::new(registry).discover_module(module);
    run_units(units, &config).await
}

/// [`run_all`] on a fresh runtime, then exit with the report's exit code
pub fn main_ci(registry: &ModuleRegistry, config: &HarnessConfig) -> ! {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            eprintln!("Error: failed to start runtime: {e}");
            std::process::exit(EXIT_HARNESS_ERROR);
        }
    };

    let code = match runtime.block_on(run_all(registry, config)) {
        Ok(report) => report.exit_code,
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_HARNESS_ERROR
        }
    };
    drop(runtime);
    std::process::exit(code)
}

async fn run_units(units: Vec<TestUnit>, config: &HarnessConfig) -> Result<RunReport, HarnessError> {
    let started_at = Utc::now();
    let mut stopwatch = Stopwatch::new();

    let scheduler = config
        .scheduler()
        .map_err(|e| HarnessError::Config(format!("{e:#}")))?;
    let unit_ids: Vec<String> = scheduler.schedule(units).into_iter().map(|u| u.id).collect();
    stopwatch.lap("schedule");

    let worker_options = config
        .worker_options()
        .to_json()
        .map_err(|e| HarnessError::Config(format!("{e:#}")))?;
    let factory = ProcessWorkerFactory::new(config.worker_command()?, worker_options);

    let reporter = Arc::new(Mutex::new(Reporter::stdout(config.verbose)));
    let mut dispatcher = Dispatcher::new(factory, config.dispatch_options());
    if config.verbose {
        let sink = Arc::clone(&reporter);
        dispatcher = dispatcher.on_outcome(move |outcome| {
            if let Ok(mut reporter) = sink.lock() {
                if let Err(e) = reporter.progress(outcome) {
                    warn!("Failed to write progress: {}", e);
                }
            }
        });
    }

    let outcomes = dispatcher.dispatch(unit_ids).await?;
    stopwatch.lap("dispatch");

    let report = RunReport::new(outcomes, started_at);
    if let Ok(mut reporter) = reporter.lock() {
        if let Err(e) = reporter.summary(&report) {
            warn!("Failed to write summary: {}", e);
        }
    }
    if let Some(path) = &config.output {
        write_report(path, &report).map_err(|e| HarnessError::Report(format!("{e:#}")))?;
    }
    stopwatch.lap("report");

    debug!("Run timings: {}", stopwatch.format());
    Ok(report)
}
