//! Execution outcome models
//!
//! Defines the status and result of running one test unit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Test execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    /// An expectation was violated
    Fail,
    /// The unit or its harness faulted
    Error,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pass => "✓",
            TestStatus::Fail => "✗",
            TestStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of a single unit execution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub unit_id: String,
    pub status: TestStatus,
    /// Failure diagnostic or fault text; empty on pass
    pub message: String,
    pub duration_ms: u64,
}

impl ExecutionOutcome {
    pub fn pass(unit_id: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            unit_id: unit_id.into(),
            status: TestStatus::Pass,
            message: String::new(),
            duration_ms,
        }
    }

    pub fn fail(unit_id: impl Into<String>, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            status: TestStatus::Fail,
            message: message.into(),
            duration_ms,
        }
    }

    pub fn error(unit_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            status: TestStatus::Error,
            message: error.into(),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.unit_id,
            self.duration_ms
        )?;
        if !self.message.is_empty() {
            write!(f, " - {}", self.message)?;
        }
        Ok(())
    }
}
