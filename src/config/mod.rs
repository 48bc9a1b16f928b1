//! Configuration module
//!
//! Run settings come from defaults, then a config file, then `TESSITURA_*`
//! environment variables, then command-line flags.

pub mod env;
pub mod file;

pub use env::EnvConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::HarnessError;
use crate::executor::MatchOptions;
use crate::pool::{default_workers, DispatchOptions, WorkerCommand, DEFAULT_UNIT_TIMEOUT_SECS};
use crate::scheduler::{BoostList, BoostOrder, Scheduler};
use crate::worker::WorkerOptions;

/// Settings for one harness run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Number of worker processes
    pub workers: usize,

    /// Dispatch units of the slow class
    pub include_slow: bool,

    /// Per-unit limit before the worker is killed
    pub unit_timeout_secs: u64,

    /// Limit for the whole dispatch
    pub run_timeout_secs: Option<u64>,

    /// Unit ids moved to the front of the run
    pub boost: Vec<String>,

    /// File with more boosted ids, one per line
    pub boost_file: Option<PathBuf>,

    pub boost_order: BoostOrder,

    /// Directories scanned for documentation transcripts
    pub doc_dirs: Vec<PathBuf>,

    pub matching: MatchOptions,

    /// Print one line per passing unit
    pub verbose: bool,

    /// Restrict the run to units matching this name
    pub run_only: Option<String>,

    /// Write the JSON report here
    pub output: Option<PathBuf>,

    /// How worker processes are started; the current binary when unset
    #[serde(skip)]
    pub worker: Option<WorkerCommand>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            include_slow: false,
            unit_timeout_secs: DEFAULT_UNIT_TIMEOUT_SECS,
            run_timeout_secs: None,
            boost: Vec::new(),
            boost_file: None,
            boost_order: BoostOrder::default(),
            doc_dirs: Vec::new(),
            matching: MatchOptions::default(),
            verbose: false,
            run_only: None,
            output: None,
            worker: None,
        }
    }
}

impl HarnessConfig {
    /// Reject settings no run can use
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.workers == 0 {
            return Err(HarnessError::Config("workers must be at least 1".into()));
        }
        if self.unit_timeout_secs == 0 {
            return Err(HarnessError::Config(
                "unit_timeout_secs must be positive".into(),
            ));
        }
        if self.run_timeout_secs == Some(0) {
            return Err(HarnessError::Config(
                "run_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Boosted ids from the config list followed by the boost file
    pub fn boost_list(&self) -> Result<BoostList> {
        let mut list = BoostList::new(self.boost.iter().cloned());
        if let Some(path) = &self.boost_file {
            let from_file = BoostList::load(path)?;
            list.extend(from_file.ids().iter().cloned());
        }
        Ok(list)
    }

    pub fn scheduler(&self) -> Result<Scheduler> {
        Ok(Scheduler::new(self.boost_list()?)
            .boost_order(self.boost_order)
            .include_slow(self.include_slow)
            .run_only(self.run_only.clone()))
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            workers: self.workers,
            unit_timeout: Duration::from_secs(self.unit_timeout_secs),
            run_timeout: self.run_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            doc_dirs: self.doc_dirs.clone(),
            matching: self.matching,
        }
    }

    pub fn worker_command(&self) -> Result<WorkerCommand, HarnessError> {
        match &self.worker {
            Some(command) => Ok(command.clone()),
            None => WorkerCommand::current_exe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert!(config.workers >= 1);
        assert_eq!(config.unit_timeout_secs, 600);
        assert!(!config.include_slow);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let zero_workers = HarnessConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_workers.validate(),
            Err(HarnessError::Config(_))
        ));

        let zero_run = HarnessConfig {
            run_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(zero_run.validate().is_err());
    }

    #[test]
    fn test_boost_list_merges_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# measured slow\nsample.pitch::test_scale\ninterval::test_table").unwrap();

        let config = HarnessConfig {
            boost: vec!["interval::test_table".into(), "a::test_x".into()],
            boost_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let list = config.boost_list().unwrap();
        assert_eq!(
            list.ids(),
            ["interval::test_table", "a::test_x", "sample.pitch::test_scale"]
        );
    }

    #[test]
    fn test_missing_boost_file_is_an_error() {
        let config = HarnessConfig {
            boost_file: Some(PathBuf::from("/nonexistent/boost.txt")),
            ..Default::default()
        };
        assert!(config.boost_list().is_err());
    }

    #[test]
    fn test_dispatch_options() {
        let config = HarnessConfig {
            workers: 3,
            unit_timeout_secs: 5,
            run_timeout_secs: Some(60),
            ..Default::default()
        };
        let options = config.dispatch_options();
        assert_eq!(options.workers, 3);
        assert_eq!(options.unit_timeout, Duration::from_secs(5));
        assert_eq!(options.run_timeout, Some(Duration::from_secs(60)));
    }
}
