//! Module registration
//!
//! Modules declare their checks explicitly: a [`Module`] lists its test
//! groups (one per speed class) and its documented callables. Modules are
//! registered in a [`ModuleRegistry`] through loaders, so a module that fails
//! to load can be reported without aborting discovery.

pub mod check;

pub use check::{CheckError, CheckResult, StateCheck, StateContext};

use anyhow::Result;
use std::sync::Arc;

use crate::interp::{CalcEnvironment, ExampleEnvironment, Renderer, ReprRenderer};
use crate::models::SpeedClass;

/// Prefix a registered check name must carry to become a unit
pub const TEST_PREFIX: &str = "test";

/// Checks of one speed class declared by a module
#[derive(Clone, Debug)]
pub struct TestGroup {
    pub speed: SpeedClass,
    pub checks: Vec<(String, StateCheck)>,
}

/// Documentation attached to one callable
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocEntry {
    pub callable: String,
    pub text: String,
}

/// Everything a module exposes to discovery
#[derive(Clone)]
pub struct Module {
    pub name: String,
    pub groups: Vec<TestGroup>,
    pub docs: Vec<DocEntry>,
    pub environment: Arc<dyn ExampleEnvironment>,
    pub renderer: Arc<dyn Renderer>,
}

impl Module {
    /// A module using the built-in example environment and repr rendering
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            docs: Vec::new(),
            environment: Arc::new(CalcEnvironment::new()),
            renderer: Arc::new(ReprRenderer),
        }
    }

    fn group(mut self, speed: SpeedClass, checks: &[(&str, StateCheck)]) -> Self {
        let checks = checks
            .iter()
            .map(|(name, check)| (name.to_string(), *check));
        match self.groups.iter_mut().find(|g| g.speed == speed) {
            Some(group) => group.checks.extend(checks),
            None => self.groups.push(TestGroup {
                speed,
                checks: checks.collect(),
            }),
        }
        self
    }

    /// Default test group
    pub fn tests(self, checks: &[(&str, StateCheck)]) -> Self {
        self.group(SpeedClass::Normal, checks)
    }

    /// Checks with observable side effects
    pub fn external(self, checks: &[(&str, StateCheck)]) -> Self {
        self.group(SpeedClass::External, checks)
    }

    /// Long-running checks
    pub fn slow(self, checks: &[(&str, StateCheck)]) -> Self {
        self.group(SpeedClass::Slow, checks)
    }

    pub fn doc(mut self, callable: impl Into<String>, text: impl Into<String>) -> Self {
        self.docs.push(DocEntry {
            callable: callable.into(),
            text: text.into(),
        });
        self
    }

    pub fn environment(mut self, environment: impl ExampleEnvironment + 'static) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }
}

type Loader = Box<dyn Fn() -> Result<Module> + Send + Sync>;

struct Entry {
    name: String,
    loader: Loader,
}

/// Ordered set of registered modules
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<Entry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module produced lazily by `loader`
    pub fn register<F>(&mut self, name: impl Into<String>, loader: F) -> &mut Self
    where
        F: Fn() -> Result<Module> + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            name: name.into(),
            loader: Box::new(loader),
        });
        self
    }

    /// Register an already built module
    pub fn add(&mut self, module: Module) -> &mut Self {
        let name = module.name.clone();
        self.register(name, move || Ok(module.clone()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load one module by its registered name
    pub fn load(&self, name: &str) -> Option<Result<Module>> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| (e.loader)())
    }

    /// Load every module; each item is the registered name and the load result
    pub fn load_all(&self) -> impl Iterator<Item = (&str, Result<Module>)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), (e.loader)()))
    }
}
