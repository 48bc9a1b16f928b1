//! Test unit models
//!
//! Defines discovered test units, their kinds, speed classes and bodies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::interp::{ExampleEnvironment, Renderer};
use crate::registry::StateCheck;

/// Kind of executable check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// A named check asserting program state
    StateTest,
    /// A transcript extracted from documentation text
    ExampleTest,
}

impl UnitKind {
    pub fn name(&self) -> &'static str {
        match self {
            UnitKind::StateTest => "state",
            UnitKind::ExampleTest => "example",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared speed class of a unit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedClass {
    #[default]
    Normal,
    /// Observable side effects (windows, audio, network); manual runs only
    External,
    /// Long running; excluded from the default fast pass
    Slow,
}

impl SpeedClass {
    pub fn name(&self) -> &'static str {
        match self {
            SpeedClass::Normal => "normal",
            SpeedClass::External => "external",
            SpeedClass::Slow => "slow",
        }
    }
}

impl fmt::Display for SpeedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a unit came from. Diagnostic only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub module: String,
    pub line: Option<usize>,
}

impl SourceLocation {
    pub fn module(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.module, line),
            None => f.write_str(&self.module),
        }
    }
}

/// What a transcript statement is expected to produce
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expected {
    /// Exact text (possibly empty) printed or rendered by the statement
    Output(String),
    /// The statement must raise with this `Kind: message` text
    Raises(String),
}

/// One statement of a documentation transcript
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExampleStep {
    pub statement: String,
    pub expected: Expected,
    /// Line of the prompt within the documentation text (1-based)
    pub line: usize,
}

/// Ordered statement/expected-output pairs of one transcript block
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    pub steps: Vec<ExampleStep>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Executable content of a unit
#[derive(Clone)]
pub enum UnitBody {
    State(StateCheck),
    Example {
        transcript: Transcript,
        environment: Arc<dyn ExampleEnvironment>,
        renderer: Arc<dyn Renderer>,
    },
    /// Synthetic unit standing in for a module that could not be loaded
    Broken { reason: String },
}

impl fmt::Debug for UnitBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitBody::State(_) => f.write_str("State(..)"),
            UnitBody::Example { transcript, .. } => f
                .debug_struct("Example")
                .field("steps", &transcript.steps.len())
                .finish_non_exhaustive(),
            UnitBody::Broken { reason } => f.debug_struct("Broken").field("reason", reason).finish(),
        }
    }
}

/// One discoverable, independently executable check
#[derive(Clone, Debug)]
pub struct TestUnit {
    pub id: String,
    pub kind: UnitKind,
    pub speed: SpeedClass,
    pub source: SourceLocation,
    pub body: UnitBody,
}

impl TestUnit {
    pub fn state(
        module: &str,
        name: &str,
        speed: SpeedClass,
        check: StateCheck,
    ) -> Self {
        Self {
            id: format!("{module}::{name}"),
            kind: UnitKind::StateTest,
            speed,
            source: SourceLocation::module(module),
            body: UnitBody::State(check),
        }
    }

    pub fn example(
        id: impl Into<String>,
        source: SourceLocation,
        transcript: Transcript,
        environment: Arc<dyn ExampleEnvironment>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: UnitKind::ExampleTest,
            speed: SpeedClass::Normal,
            source,
            body: UnitBody::Example {
                transcript,
                environment,
                renderer,
            },
        }
    }

    /// Synthetic unit reporting a module that failed to load
    pub fn broken(module: &str, reason: impl Into<String>) -> Self {
        Self {
            id: format!("{module}::<load>"),
            kind: UnitKind::StateTest,
            speed: SpeedClass::Normal,
            source: SourceLocation::module(module),
            body: UnitBody::Broken {
                reason: reason.into(),
            },
        }
    }

    /// Last `::` segment of the id
    pub fn short_name(&self) -> &str {
        self.id.rsplit("::").next().unwrap_or(&self.id)
    }
}

impl fmt::Display for TestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {}]", self.id, self.kind, self.speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CheckResult;
    use crate::registry::StateContext;

    fn noop(_: &mut StateContext) -> CheckResult {
        Ok(())
    }

    #[test]
    fn test_state_unit_id() {
        let unit = TestUnit::state("pitch", "test_middle_c", SpeedClass::Normal, noop);
        assert_eq!(unit.id, "pitch::test_middle_c");
        assert_eq!(unit.kind, UnitKind::StateTest);
        assert_eq!(unit.short_name(), "test_middle_c");
    }

    #[test]
    fn test_broken_unit() {
        let unit = TestUnit::broken("docs.usage", "invalid UTF-8");
        assert_eq!(unit.id, "docs.usage::<load>");
        assert!(matches!(unit.body, UnitBody::Broken { .. }));
    }

    #[test]
    fn test_source_location_display() {
        assert_eq!(SourceLocation::module("pitch").to_string(), "pitch");
        assert_eq!(
            SourceLocation::module("pitch").at_line(12).to_string(),
            "pitch:12"
        );
    }
}
