//! Example interpreter
//!
//! Documentation transcripts are executed through a pluggable pair: an
//! [`ExampleEnvironment`] hands out fresh [`StatementExecutor`] sessions, and
//! a [`Renderer`] turns resulting values into the text compared against the
//! transcript. The built-in [`CalcEnvironment`] is a small expression
//! language with module-registered native functions.

mod eval;
mod lexer;
mod parser;
mod value;

pub use eval::Session;
pub use value::{Raised, Value};

use std::collections::HashMap;
use std::sync::Arc;

/// A function a module exposes to its documentation examples
pub type NativeFn = fn(&[Value]) -> Result<Value, Raised>;

/// What one statement produced
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    /// Text written by `print` while the statement ran
    pub printed: String,
    /// Resulting value; `None` for assignments and `None`-valued expressions
    pub value: Option<Value>,
}

/// Executes transcript statements in order against private state
pub trait StatementExecutor {
    fn execute(&mut self, statement: &str) -> Result<Evaluation, Raised>;
}

/// Factory for isolated executor sessions
pub trait ExampleEnvironment: Send + Sync {
    /// A session with an empty namespace
    fn session(&self) -> Box<dyn StatementExecutor>;
}

/// Human-readable rendering a module declares for its values
pub trait Renderer: Send + Sync {
    fn render(&self, value: &Value) -> String;
}

/// Renders values the way an interactive prompt echoes them
#[derive(Clone, Copy, Debug, Default)]
pub struct ReprRenderer;

impl Renderer for ReprRenderer {
    fn render(&self, value: &Value) -> String {
        value.repr()
    }
}

/// Built-in expression-language environment
#[derive(Clone, Default)]
pub struct CalcEnvironment {
    natives: Arc<HashMap<String, NativeFn>>,
}

impl CalcEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a native function to every session of this environment
    pub fn with_native(mut self, name: impl Into<String>, function: NativeFn) -> Self {
        Arc::make_mut(&mut self.natives).insert(name.into(), function);
        self
    }
}

impl ExampleEnvironment for CalcEnvironment {
    fn session(&self) -> Box<dyn StatementExecutor> {
        Box::new(Session::new(Arc::clone(&self.natives)))
    }
}
