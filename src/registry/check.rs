//! State-check primitives
//!
//! A state test is a plain function receiving a fresh [`StateContext`] and
//! returning [`CheckResult`]. Assertion helpers return
//! [`CheckError::Assertion`]; any other error propagated with `?` is a fault.

use std::collections::HashMap;
use std::fmt::Debug;
use thiserror::Error;

use crate::interp::Value;

/// Signature of a registered state test
pub type StateCheck = fn(&mut StateContext) -> CheckResult;

pub type CheckResult = Result<(), CheckError>;

/// Why a state check did not succeed
#[derive(Error, Debug)]
pub enum CheckError {
    /// An expectation was violated
    #[error("{0}")]
    Assertion(String),

    /// The check faulted for a reason other than a violated expectation
    #[error("{0}")]
    Fault(String),
}

impl From<anyhow::Error> for CheckError {
    fn from(err: anyhow::Error) -> Self {
        CheckError::Fault(format!("{err:#}"))
    }
}

impl From<crate::interp::Raised> for CheckError {
    fn from(err: crate::interp::Raised) -> Self {
        CheckError::Fault(err.to_string())
    }
}

/// Fresh, empty scratch space handed to each state check
#[derive(Debug, Default)]
pub struct StateContext {
    values: HashMap<String, Value>,
}

impl StateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fail unless `actual == expected`
pub fn equal<T: PartialEq + Debug>(actual: T, expected: T) -> CheckResult {
    if actual == expected {
        Ok(())
    } else {
        Err(CheckError::Assertion(format!("{actual:?} != {expected:?}")))
    }
}

/// Fail if `actual == unexpected`
pub fn not_equal<T: PartialEq + Debug>(actual: T, unexpected: T) -> CheckResult {
    if actual != unexpected {
        Ok(())
    } else {
        Err(CheckError::Assertion(format!("{actual:?} == {unexpected:?}")))
    }
}

/// Fail unless `condition` holds
pub fn that(condition: bool, message: impl Into<String>) -> CheckResult {
    if condition {
        Ok(())
    } else {
        Err(CheckError::Assertion(message.into()))
    }
}

/// Fail unless the values agree when rounded to `places` decimal places
pub fn almost_equal(actual: f64, expected: f64, places: i32) -> CheckResult {
    let scale = 10f64.powi(places);
    if ((actual - expected) * scale).round() == 0.0 {
        Ok(())
    } else {
        Err(CheckError::Assertion(format!(
            "{actual} != {expected} within {places} places"
        )))
    }
}
