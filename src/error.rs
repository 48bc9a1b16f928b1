//! Engine errors
//!
//! Only failures that stop a whole run surface here. Everything that goes
//! wrong inside a single unit is captured as that unit's outcome instead.

use thiserror::Error;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to spawn worker {slot}: {reason}")]
    Spawn { slot: usize, reason: String },

    #[error("No worker could be started ({0})")]
    NoWorkers(String),

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Failed to write report: {0}")]
    Report(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = HarnessError::Spawn {
            slot: 2,
            reason: "permission denied".into(),
        };
        assert_eq!(err.to_string(), "Failed to spawn worker 2: permission denied");
        assert_eq!(
            HarnessError::Config("workers must be at least 1".into()).to_string(),
            "Invalid configuration: workers must be at least 1"
        );
    }
}
