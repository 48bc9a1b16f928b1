//! Data models for test orchestration
//!
//! This module contains the unit, outcome and report types shared by every stage.

mod outcome;
mod report;
mod unit;

pub use outcome::{ExecutionOutcome, TestStatus};
pub use report::{FailureDetail, RunReport, EXIT_FAILURE, EXIT_SUCCESS};
pub use unit::{
    ExampleStep, Expected, SourceLocation, SpeedClass, TestUnit, Transcript, UnitBody, UnitKind,
};
