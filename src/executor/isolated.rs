//! Isolated execution of a single unit
//!
//! State checks get a fresh [`StateContext`]; transcripts get a fresh
//! interpreter session. Every panic is caught here so exactly one outcome
//! leaves this module per unit.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

use super::matching::{canonical, output_matches, MatchOptions};
use crate::interp::{Evaluation, ExampleEnvironment, Renderer, StatementExecutor};
use crate::models::{ExecutionOutcome, Expected, TestUnit, Transcript, UnitBody};
use crate::registry::{CheckError, StateCheck, StateContext};
use crate::utils::Timer;

/// Runs one unit at a time and never panics past its boundary
#[derive(Clone, Copy, Debug, Default)]
pub struct Executor {
    options: MatchOptions,
}

impl Executor {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    /// Execute `unit` and return its outcome
    pub fn execute(&self, unit: &TestUnit) -> ExecutionOutcome {
        debug!("Executing {}", unit);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(unit)));
        outcome.unwrap_or_else(|payload| {
            ExecutionOutcome::error(
                &unit.id,
                format!("executor fault: {}", panic_message(payload.as_ref())),
            )
        })
    }

    fn dispatch(&self, unit: &TestUnit) -> ExecutionOutcome {
        match &unit.body {
            UnitBody::State(check) => self.run_state(unit, *check),
            UnitBody::Example {
                transcript,
                environment,
                renderer,
            } => self.run_example(unit, transcript, environment.as_ref(), renderer.as_ref()),
            UnitBody::Broken { reason } => ExecutionOutcome::error(&unit.id, reason.clone()),
        }
    }

    fn run_state(&self, unit: &TestUnit, check: StateCheck) -> ExecutionOutcome {
        let mut context = StateContext::new();

        let timer = Timer::start(&unit.id);
        let result = panic::catch_unwind(AssertUnwindSafe(|| check(&mut context)));
        let elapsed = timer.stop();
        drop(context);

        match result {
            Ok(Ok(())) => ExecutionOutcome::pass(&unit.id, elapsed),
            Ok(Err(CheckError::Assertion(message))) => {
                ExecutionOutcome::fail(&unit.id, elapsed, message)
            }
            Ok(Err(CheckError::Fault(message))) => {
                ExecutionOutcome::error(&unit.id, message).with_duration(elapsed)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                if message.starts_with("assertion") {
                    ExecutionOutcome::fail(&unit.id, elapsed, message)
                } else {
                    ExecutionOutcome::error(&unit.id, format!("panicked: {message}"))
                        .with_duration(elapsed)
                }
            }
        }
    }

    fn run_example(
        &self,
        unit: &TestUnit,
        transcript: &Transcript,
        environment: &dyn ExampleEnvironment,
        renderer: &dyn Renderer,
    ) -> ExecutionOutcome {
        let mut session = environment.session();

        let timer = Timer::start(&unit.id);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.check_transcript(session.as_mut(), transcript, renderer)
        }));
        let elapsed = timer.stop();
        drop(session);

        match result {
            Ok(mismatches) if mismatches.is_empty() => ExecutionOutcome::pass(&unit.id, elapsed),
            Ok(mismatches) => ExecutionOutcome::fail(&unit.id, elapsed, mismatches.join("\n")),
            Err(payload) => ExecutionOutcome::error(
                &unit.id,
                format!("interpreter fault: {}", panic_message(payload.as_ref())),
            )
            .with_duration(elapsed),
        }
    }

    /// Run every statement in order; returns one line per mismatch
    fn check_transcript(
        &self,
        session: &mut dyn StatementExecutor,
        transcript: &Transcript,
        renderer: &dyn Renderer,
    ) -> Vec<String> {
        let mut mismatches = Vec::new();

        for step in &transcript.steps {
            let result = session.execute(&step.statement);
            let describe = |detail: String| {
                format!("line {}: {}: {}", step.line, step.statement, detail)
            };

            match (&step.expected, result) {
                (Expected::Output(expected), Ok(evaluation)) => {
                    let actual = rendered_text(&evaluation, renderer);
                    if !output_matches(&actual, expected, self.options) {
                        mismatches.push(describe(format!(
                            "{:?} != {:?}",
                            canonical(&actual, self.options),
                            canonical(expected, self.options)
                        )));
                    }
                }
                (Expected::Output(expected), Err(raised)) => {
                    mismatches.push(describe(format!(
                        "raised {:?}, expected {:?}",
                        raised.to_string(),
                        canonical(expected, self.options)
                    )));
                }
                (Expected::Raises(expected), Ok(evaluation)) => {
                    mismatches.push(describe(format!(
                        "expected {:?} to be raised, got {:?}",
                        expected,
                        rendered_text(&evaluation, renderer)
                    )));
                }
                (Expected::Raises(expected), Err(raised)) => {
                    let actual = raised.to_string();
                    if !output_matches(&actual, expected, self.options) {
                        mismatches.push(describe(format!("raised {actual:?} != {expected:?}")));
                    }
                }
            }
        }

        mismatches
    }
}

/// Printed output followed by the rendered value, one block of text
fn rendered_text(evaluation: &Evaluation, renderer: &dyn Renderer) -> String {
    let mut text = evaluation
        .printed
        .strip_suffix('\n')
        .unwrap_or(&evaluation.printed)
        .to_string();
    if let Some(value) = &evaluation.value {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&renderer.render(value));
    }
    text
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{CalcEnvironment, ReprRenderer, Value};
    use crate::models::{ExampleStep, SourceLocation, SpeedClass, TestStatus};
    use crate::registry::{check, CheckResult};
    use std::sync::Arc;

    fn state_unit(check: StateCheck) -> TestUnit {
        TestUnit::state("m", "test_x", SpeedClass::Normal, check)
    }

    fn example_unit(steps: &[(&str, Expected)]) -> TestUnit {
        let transcript = Transcript {
            steps: steps
                .iter()
                .enumerate()
                .map(|(i, (statement, expected))| ExampleStep {
                    statement: statement.to_string(),
                    expected: expected.clone(),
                    line: i + 1,
                })
                .collect(),
        };
        TestUnit::example(
            "m::f::example_1",
            SourceLocation::module("m"),
            transcript,
            Arc::new(CalcEnvironment::new()),
            Arc::new(ReprRenderer),
        )
    }

    fn out(text: &str) -> Expected {
        Expected::Output(text.to_string())
    }

    fn run(unit: &TestUnit) -> ExecutionOutcome {
        Executor::default().execute(unit)
    }

    #[test]
    fn test_state_pass() {
        fn one_is_one(_: &mut StateContext) -> CheckResult {
            check::equal(1, 1)
        }
        assert_eq!(run(&state_unit(one_is_one)).status, TestStatus::Pass);
    }

    #[test]
    fn test_state_assertion_is_fail() {
        fn mismatch(_: &mut StateContext) -> CheckResult {
            check::equal("C4", "D4")
        }
        let outcome = run(&state_unit(mismatch));
        assert_eq!(outcome.status, TestStatus::Fail);
        assert_eq!(outcome.message, "\"C4\" != \"D4\"");
    }

    #[test]
    fn test_state_fault_is_error() {
        fn fault(_: &mut StateContext) -> CheckResult {
            Err(anyhow::anyhow!("corpus missing").into())
        }
        let outcome = run(&state_unit(fault));
        assert_eq!(outcome.status, TestStatus::Error);
        assert_eq!(outcome.message, "corpus missing");
    }

    #[test]
    fn test_panics_are_classified() {
        fn assert_panic(_: &mut StateContext) -> CheckResult {
            assert_eq!(1 + 1, 3);
            Ok(())
        }
        fn other_panic(_: &mut StateContext) -> CheckResult {
            let items: Vec<u8> = Vec::new();
            let _ = items[items.len()];
            Ok(())
        }

        let outcome = run(&state_unit(assert_panic));
        assert_eq!(outcome.status, TestStatus::Fail);
        assert!(outcome.message.starts_with("assertion"));

        let outcome = run(&state_unit(other_panic));
        assert_eq!(outcome.status, TestStatus::Error);
        assert!(outcome.message.starts_with("panicked: index out of bounds"));
    }

    #[test]
    fn test_context_is_fresh() {
        fn uses_context(ctx: &mut StateContext) -> CheckResult {
            check::that(ctx.is_empty(), "context carried state")?;
            ctx.set("leak", Value::Int(1));
            Ok(())
        }
        let unit = state_unit(uses_context);
        assert_eq!(run(&unit).status, TestStatus::Pass);
        assert_eq!(run(&unit).status, TestStatus::Pass);
    }

    #[test]
    fn test_example_pass_and_mismatch() {
        let pass = example_unit(&[("1+2", out("3"))]);
        assert_eq!(run(&pass).status, TestStatus::Pass);

        let fail = example_unit(&[("1+2", out("4"))]);
        let outcome = run(&fail);
        assert_eq!(outcome.status, TestStatus::Fail);
        assert_eq!(outcome.message, "line 1: 1+2: \"3\" != \"4\"");
    }

    #[test]
    fn test_example_expected_raise() {
        let unit = example_unit(&[(
            "1/0",
            Expected::Raises("ZeroDivisionError: division by zero".into()),
        )]);
        assert_eq!(run(&unit).status, TestStatus::Pass);

        let wrong = example_unit(&[("1/0", Expected::Raises("ValueError: nope".into()))]);
        assert_eq!(run(&wrong).status, TestStatus::Fail);

        let missing = example_unit(&[("1", Expected::Raises("ValueError: nope".into()))]);
        let outcome = run(&missing);
        assert_eq!(outcome.status, TestStatus::Fail);
        assert!(outcome.message.contains("to be raised"));
    }

    #[test]
    fn test_unexpected_raise_is_fail() {
        let unit = example_unit(&[("missing", out(""))]);
        let outcome = run(&unit);
        assert_eq!(outcome.status, TestStatus::Fail);
        assert!(outcome.message.contains("NameError"));
    }

    #[test]
    fn test_examples_do_not_share_namespace() {
        let first = example_unit(&[("x = 1", out("")), ("x", out("1"))]);
        let second = example_unit(&[("x", out("1"))]);
        let executor = Executor::default();
        assert_eq!(executor.execute(&first).status, TestStatus::Pass);
        assert_eq!(executor.execute(&second).status, TestStatus::Fail);
    }

    #[test]
    fn test_printed_and_value_are_joined() {
        let unit = example_unit(&[("print('a') or 2", out("a\n2"))]);
        assert_eq!(run(&unit).status, TestStatus::Pass);
    }

    #[test]
    fn test_all_mismatches_reported() {
        let unit = example_unit(&[("1", out("2")), ("3", out("3")), ("4", out("5"))]);
        let outcome = run(&unit);
        assert_eq!(outcome.message.lines().count(), 2);
        assert!(outcome.message.starts_with("line 1:"));
    }

    #[test]
    fn test_broken_unit_is_error() {
        let unit = TestUnit::broken("docs.bad", "module failed to load: bad bytes");
        let outcome = run(&unit);
        assert_eq!(outcome.status, TestStatus::Error);
        assert!(outcome.message.contains("bad bytes"));
    }
}
