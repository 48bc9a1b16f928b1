//! Test discovery
//!
//! Turns registered modules and documentation directories into a flat list
//! of [`TestUnit`]s without executing anything.

pub mod docfiles;
pub mod transcript;

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::models::{SourceLocation, TestUnit, UnitBody};
use crate::registry::{Module, ModuleRegistry, TEST_PREFIX};

/// Discovers units from a registry plus optional documentation roots
pub struct Discovery<'a> {
    registry: &'a ModuleRegistry,
    doc_dirs: Vec<PathBuf>,
}

impl<'a> Discovery<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self {
            registry,
            doc_dirs: Vec::new(),
        }
    }

    pub fn with_doc_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.doc_dirs.extend(dirs);
        self
    }

    /// Discover every unit of every module
    pub fn discover(&self) -> Vec<TestUnit> {
        let mut collector = Collector::default();

        for (name, loaded) in self.registry.load_all() {
            collector.module(name, loaded);
        }
        for dir in &self.doc_dirs {
            for (name, loaded) in docfiles::scan(dir) {
                collector.module(&name, loaded);
            }
        }

        debug!("Discovered {} units", collector.units.len());
        collector.units
    }

    /// Discover only the units of one registered module
    pub fn discover_module(&self, module: &str) -> Vec<TestUnit> {
        let mut collector = Collector::default();
        if let Some(loaded) = self.registry.load(module) {
            collector.module(module, loaded);
        }
        collector.units
    }
}

#[derive(Default)]
struct Collector {
    units: Vec<TestUnit>,
    seen: HashSet<String>,
}

impl Collector {
    fn module(&mut self, name: &str, loaded: Result<Module>) {
        match loaded {
            Ok(module) => {
                for unit in module_units(&module) {
                    self.push(unit);
                }
            }
            Err(err) => {
                warn!("Module {} failed to load: {:#}", name, err);
                self.push(TestUnit::broken(name, format!("module failed to load: {err:#}")));
            }
        }
    }

    fn push(&mut self, mut unit: TestUnit) {
        if !self.seen.contains(&unit.id) {
            self.seen.insert(unit.id.clone());
            self.units.push(unit);
            return;
        }

        warn!("Duplicate unit id {}", unit.id);
        let original = unit.id.clone();
        let mut suffix = 1;
        while self.seen.contains(&unit.id) {
            unit.id = if suffix == 1 {
                format!("{original}#duplicate")
            } else {
                format!("{original}#duplicate{suffix}")
            };
            suffix += 1;
        }
        unit.body = UnitBody::Broken {
            reason: format!("duplicate unit id {original}"),
        };
        self.seen.insert(unit.id.clone());
        self.units.push(unit);
    }
}

/// Units declared by one loaded module
pub fn module_units(module: &Module) -> Vec<TestUnit> {
    let mut units = Vec::new();

    for group in &module.groups {
        for (name, check) in &group.checks {
            if name.starts_with(TEST_PREFIX) {
                units.push(TestUnit::state(&module.name, name, group.speed, *check));
            }
        }
    }

    for doc in &module.docs {
        for (index, block) in transcript::extract(&doc.text).into_iter().enumerate() {
            units.push(TestUnit::example(
                format!("{}::{}::example_{}", module.name, doc.callable, index + 1),
                SourceLocation::module(&module.name).at_line(block.line),
                block.transcript,
                module.environment.clone(),
                module.renderer.clone(),
            ));
        }
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SpeedClass, UnitKind};
    use crate::registry::{CheckResult, StateContext};

    fn ok_check(_: &mut StateContext) -> CheckResult {
        Ok(())
    }

    fn sample_module() -> Module {
        Module::new("pitch")
            .tests(&[("test_name", ok_check), ("helper", ok_check)])
            .slow(&[("test_all", ok_check)])
            .external(&[("test_play", ok_check)])
            .doc("midi_name", ">>> 1\n1\n\n>>> 2\n2\n")
    }

    #[test]
    fn test_module_units() {
        let units = module_units(&sample_module());
        let ids: Vec<_> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "pitch::test_name",
                "pitch::test_all",
                "pitch::test_play",
                "pitch::midi_name::example_1",
                "pitch::midi_name::example_2",
            ]
        );
        assert_eq!(units[1].speed, SpeedClass::Slow);
        assert_eq!(units[2].speed, SpeedClass::External);
        assert_eq!(units[3].kind, UnitKind::ExampleTest);
        assert_eq!(units[4].source.line, Some(4));
    }

    #[test]
    fn test_module_without_groups_yields_nothing() {
        assert!(module_units(&Module::new("empty")).is_empty());
    }

    #[test]
    fn test_load_failure_becomes_broken_unit() {
        let mut registry = ModuleRegistry::new();
        registry
            .add(sample_module())
            .register("corpus", || anyhow::bail!("missing data file"));

        let units = Discovery::new(&registry).discover();
        let broken = units.iter().find(|u| u.id == "corpus::<load>").unwrap();
        match &broken.body {
            UnitBody::Broken { reason } => assert!(reason.contains("missing data file")),
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(units.len(), 6);
    }

    #[test]
    fn test_duplicate_ids_are_kept_as_broken_units() {
        let mut registry = ModuleRegistry::new();
        registry
            .add(Module::new("m").tests(&[("test_a", ok_check)]))
            .add(Module::new("m").tests(&[("test_a", ok_check)]));

        let units = Discovery::new(&registry).discover();
        let ids: Vec<_> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["m::test_a", "m::test_a#duplicate"]);
        assert!(matches!(units[1].body, UnitBody::Broken { .. }));
    }

    #[test]
    fn test_discover_module_filters() {
        let mut registry = ModuleRegistry::new();
        registry
            .add(sample_module())
            .add(Module::new("other").tests(&[("test_x", ok_check)]));

        let units = Discovery::new(&registry).discover_module("other");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].id, "other::test_x");
    }

    #[test]
    fn test_doc_dir_with_wide_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("guide");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("notes.txt"), "  >>> 'a'\n\u{3000}'a'\n").unwrap();

        let units = Discovery::new(&ModuleRegistry::new())
            .with_doc_dirs([root])
            .discover();
        let ids: Vec<_> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["guide.notes::doc::example_1"]);
    }
}
