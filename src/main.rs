//! tessitura - process-isolated test orchestration
//!
//! Discovers state tests and documentation examples from a module registry,
//! runs them across a pool of worker processes and reports failures.
//!
//! ## Usage
//!
//! ```bash
//! # Run everything, quiet unless something fails
//! tessitura run
//!
//! # Same, but exit 1 on any failure
//! tessitura ci --workers 4 --slow
//!
//! # Run one unit, module or unit name
//! tessitura ci pitch::test_middle_c
//!
//! # Show what would run
//! tessitura list --all
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use tessitura::cli::{Args, Command, ListArgs};
use tessitura::config::{EnvConfig, HarnessConfig};
use tessitura::discovery::Discovery;
use tessitura::harness::{main_ci, run_all, EXIT_HARNESS_ERROR};
use tessitura::models::{RunReport, EXIT_SUCCESS};
use tessitura::output::ResultFormatter;
use tessitura::pool::WorkerCommand;
use tessitura::registry::ModuleRegistry;
use tessitura::utils::init_logger;
use tessitura::worker::{serve, WorkerOptions};
use tessitura::HarnessError;

fn main() {
    let args = Args::parse();
    let env = EnvConfig::load();
    init_logger(args.log_level(&env));

    let code = match execute(&args, &env) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_HARNESS_ERROR
        }
    };
    std::process::exit(code);
}

fn execute(args: &Args, env: &EnvConfig) -> Result<i32> {
    let registry = args.suite.registry();

    match &args.command {
        Command::Worker => {
            serve(&registry, &WorkerOptions::from_env()?)?;
            Ok(EXIT_SUCCESS)
        }
        Command::Ci(_) => {
            let config = build_config(args, env)?;
            main_ci(&registry, &config)
        }
        Command::Run(_) => {
            let config = build_config(args, env)?;
            let report = run(&registry, &config)?;
            info!("{}", report);
            Ok(EXIT_SUCCESS)
        }
        Command::List(list_args) => {
            let config = build_config(args, env)?;
            list_units(&registry, &config, list_args)?;
            Ok(EXIT_SUCCESS)
        }
    }
}

/// Defaults, then config file, then environment, then flags
fn build_config(args: &Args, env: &EnvConfig) -> Result<HarnessConfig> {
    let mut config = match args.config_file(env) {
        Some(path) => HarnessConfig::load(&path)?,
        None => HarnessConfig::load_default()?,
    };
    if env.has_any() {
        debug!("Applying TESSITURA_* overrides");
    }
    env.apply(&mut config);
    args.apply(&mut config);
    config.validate()?;

    let mut worker = WorkerCommand::current_exe()?
        .arg("--suite")
        .arg(args.suite.name());
    if let Some(level) = &args.log_level {
        worker = worker.arg("--log-level").arg(level.clone());
    }
    config.worker = Some(worker);
    Ok(config)
}

#[tokio::main]
async fn run(registry: &ModuleRegistry, config: &HarnessConfig) -> Result<RunReport, HarnessError> {
    run_all(registry, config).await
}

fn list_units(registry: &ModuleRegistry, config: &HarnessConfig, list_args: &ListArgs) -> Result<()> {
    let mut units = Discovery::new(registry)
        .with_doc_dirs(config.doc_dirs.iter().cloned())
        .discover();

    if list_args.all {
        units.sort_by(|a, b| a.id.cmp(&b.id));
    } else {
        units = config
            .scheduler()
            .context("Failed to build schedule")?
            .schedule(units);
    }

    print!("{}", ResultFormatter::new().no_color().format_listing(&units));
    Ok(())
}
