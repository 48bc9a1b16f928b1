//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use super::HarnessConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TESSITURA";

/// Overrides read from `TESSITURA_*` variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// TESSITURA_WORKERS
    pub workers: Option<usize>,
    /// TESSITURA_SLOW
    pub slow: Option<bool>,
    /// TESSITURA_UNIT_TIMEOUT
    pub unit_timeout: Option<u64>,
    /// TESSITURA_RUN_TIMEOUT
    pub run_timeout: Option<u64>,
    /// TESSITURA_BOOST, comma separated
    pub boost: Option<Vec<String>>,
    /// TESSITURA_VERBOSE
    pub verbose: Option<bool>,
    /// TESSITURA_CONFIG
    pub config_file: Option<String>,
    /// TESSITURA_LOG
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));
        let flag = |name: &str| get(name).map(|v| parse_bool(&v));

        Self {
            workers: parse(get("WORKERS")),
            slow: flag("SLOW"),
            unit_timeout: parse(get("UNIT_TIMEOUT")),
            run_timeout: parse(get("RUN_TIMEOUT")),
            boost: get("BOOST").map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            }),
            verbose: flag("VERBOSE"),
            config_file: get("CONFIG"),
            log_level: get("LOG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    /// Override `config` with every variable that is set
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(slow) = self.slow {
            config.include_slow = slow;
        }
        if let Some(secs) = self.unit_timeout {
            config.unit_timeout_secs = secs;
        }
        if let Some(secs) = self.run_timeout {
            config.run_timeout_secs = Some(secs);
        }
        if let Some(boost) = &self.boost {
            config.boost = boost.clone();
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
    }
}

/// Parse a variable value, ignoring values that do not parse
fn parse<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}
