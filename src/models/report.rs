//! Run report
//!
//! Folds execution outcomes into the aggregate result of one invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::outcome::{ExecutionOutcome, TestStatus};

/// Process exit status for a run with no failures or errors
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit status for a run with any failure or error
pub const EXIT_FAILURE: i32 = 1;

/// One entry of the failure list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub unit_id: String,
    pub status: TestStatus,
    pub message: String,
}

/// Aggregated outcome of one orchestration invocation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    /// Failing units in the order their outcomes arrived
    pub failure_details: Vec<FailureDetail>,
    pub exit_code: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Wall-clock time of the whole run
    pub duration_ms: u64,
    /// Every outcome, in arrival order
    pub outcomes: Vec<ExecutionOutcome>,
}

impl RunReport {
    /// Fold outcomes given in arrival order
    pub fn new(outcomes: Vec<ExecutionOutcome>, started_at: DateTime<Utc>) -> Self {
        let finished_at = Utc::now();
        let mut passed = 0;
        let mut failed = 0;
        let mut errored = 0;
        let mut failure_details = Vec::new();

        for outcome in &outcomes {
            match outcome.status {
                TestStatus::Pass => passed += 1,
                TestStatus::Fail => failed += 1,
                TestStatus::Error => errored += 1,
            }
            if !outcome.status.is_success() {
                failure_details.push(FailureDetail {
                    unit_id: outcome.unit_id.clone(),
                    status: outcome.status,
                    message: outcome.message.clone(),
                });
            }
        }

        let exit_code = if failed == 0 && errored == 0 {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        };

        Self {
            total: outcomes.len(),
            passed,
            failed,
            errored,
            failure_details,
            exit_code,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            outcomes,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_SUCCESS
    }

    /// Look up the outcome recorded for a unit
    pub fn outcome(&self, unit_id: &str) -> Option<&ExecutionOutcome> {
        self.outcomes.iter().find(|o| o.unit_id == unit_id)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Error: {} | Duration: {}ms",
            self.total, self.passed, self.failed, self.errored, self.duration_ms
        )
    }
}
