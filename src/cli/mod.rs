//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{EnvConfig, HarnessConfig};
use crate::suites::Suite;
use crate::utils::LogLevel;

/// Process-isolated test orchestration for state tests and documentation examples
#[derive(Parser, Debug)]
#[command(name = "tessitura")]
#[command(author = "hephaex@gmail.com")]
#[command(version = "0.1.0")]
#[command(about = "Run state tests and documentation examples in isolated worker processes")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Built-in module set to run
    #[arg(long, value_enum, default_value_t = Suite::Sample, global = true)]
    pub suite: Suite,

    /// Directory scanned for documentation transcripts (repeatable)
    #[arg(long = "docs", value_name = "DIR", global = true)]
    pub docs: Vec<PathBuf>,

    /// Number of worker processes
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Include slow units
    #[arg(long, global = true)]
    pub slow: bool,

    /// File listing unit ids to dispatch first
    #[arg(long, value_name = "FILE", global = true)]
    pub boost_file: Option<PathBuf>,

    /// Per-unit timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub unit_timeout: Option<u64>,

    /// Timeout for the whole run in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub run_timeout: Option<u64>,

    /// Print a line for every passing unit
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write the JSON run report to this file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run units and print a summary of failures
    Run(RunArgs),

    /// Run units and exit non-zero if any failed
    Ci(RunArgs),

    /// List discovered units
    List(ListArgs),

    /// Worker process loop (started by the harness)
    #[command(hide = true)]
    Worker,
}

/// Arguments for run and ci
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Only run units matching this id, unit name or module
    pub unit: Option<String>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Include units a default run leaves out
    #[arg(short, long)]
    pub all: bool,
}

impl Args {
    /// Override `config` with every flag given on the command line
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.slow {
            config.include_slow = true;
        }
        if let Some(path) = &self.boost_file {
            config.boost_file = Some(path.clone());
        }
        if let Some(secs) = self.unit_timeout {
            config.unit_timeout_secs = secs;
        }
        if let Some(secs) = self.run_timeout {
            config.run_timeout_secs = Some(secs);
        }
        if self.verbose {
            config.verbose = true;
        }
        if let Some(path) = &self.output {
            config.output = Some(path.clone());
        }
        config.doc_dirs.extend(self.docs.iter().cloned());

        if let Command::Run(run) | Command::Ci(run) = &self.command {
            if let Some(unit) = &run.unit {
                config.run_only = Some(unit.clone());
            }
        }
    }

    /// Flag first, then `TESSITURA_LOG`, then the quiet default
    pub fn log_level(&self, env: &EnvConfig) -> LogLevel {
        self.log_level
            .as_deref()
            .or(env.log_level.as_deref())
            .and_then(LogLevel::from_str)
            .unwrap_or_default()
    }

    /// Explicit config file: flag, then `TESSITURA_CONFIG`
    pub fn config_file(&self, env: &EnvConfig) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| env.config_file.as_ref().map(PathBuf::from))
    }
}
