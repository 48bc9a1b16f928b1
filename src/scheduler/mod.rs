//! Dispatch ordering
//!
//! Units are dispatched in reverse lexicographic order of their ids, with
//! boosted (historically slow) units moved to the front so they overlap
//! with the rest of the run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;

use crate::models::{SpeedClass, TestUnit};

/// Tie-break among boosted units
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostOrder {
    /// Reverse lexicographic by id, like the remainder
    #[default]
    ReverseId,
    /// In the order the boost list names them
    Listed,
}

impl BoostOrder {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "reverse_id" => Some(BoostOrder::ReverseId),
            "listed" => Some(BoostOrder::Listed),
            _ => None,
        }
    }
}

/// Ordered set of unit ids promoted to the front of the run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoostList {
    ids: Vec<String>,
}

impl BoostList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        list.extend(ids);
        list
    }

    /// One id per line; blank lines and `#` comments are ignored
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(|line| line.split('#').next().unwrap_or("").trim())
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read boost file: {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn extend<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|b| b == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Whether `name` selects the unit with id `unit_id`: the full id, its last
/// `::` segment, or a whole module prefix.
pub fn matches_name(unit_id: &str, name: &str) -> bool {
    unit_id == name
        || unit_id.rsplit("::").next() == Some(name)
        || unit_id
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with("::"))
}

/// Selects and orders units for dispatch
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    boost: BoostList,
    boost_order: BoostOrder,
    include_slow: bool,
    run_only: Option<String>,
}

impl Scheduler {
    pub fn new(boost: BoostList) -> Self {
        Self {
            boost,
            ..Self::default()
        }
    }

    pub fn boost_order(mut self, order: BoostOrder) -> Self {
        self.boost_order = order;
        self
    }

    pub fn include_slow(mut self, include: bool) -> Self {
        self.include_slow = include;
        self
    }

    pub fn run_only(mut self, name: Option<String>) -> Self {
        self.run_only = name;
        self
    }

    /// Drop units the run must not dispatch
    pub fn select(&self, units: Vec<TestUnit>) -> Vec<TestUnit> {
        let before = units.len();
        let selected: Vec<TestUnit> = units
            .into_iter()
            .filter(|unit| match &self.run_only {
                Some(name) => matches_name(&unit.id, name),
                None => match unit.speed {
                    SpeedClass::Normal => true,
                    SpeedClass::Slow => self.include_slow,
                    SpeedClass::External => false,
                },
            })
            .collect();
        debug!("Selected {} of {} units", selected.len(), before);
        selected
    }

    /// Strict dispatch order: boosted units first, each part reverse by id
    pub fn order(&self, units: Vec<TestUnit>) -> Vec<TestUnit> {
        let (mut boosted, mut rest): (Vec<_>, Vec<_>) = units
            .into_iter()
            .partition(|unit| self.boost.contains(&unit.id));

        rest.sort_by(|a, b| b.id.cmp(&a.id));
        boosted.sort_by(|a, b| self.compare_boosted(a, b));

        boosted.extend(rest);
        boosted
    }

    fn compare_boosted(&self, a: &TestUnit, b: &TestUnit) -> Ordering {
        match self.boost_order {
            BoostOrder::ReverseId => b.id.cmp(&a.id),
            BoostOrder::Listed => self
                .boost
                .position(&a.id)
                .cmp(&self.boost.position(&b.id))
                .then_with(|| b.id.cmp(&a.id)),
        }
    }

    pub fn schedule(&self, units: Vec<TestUnit>) -> Vec<TestUnit> {
        self.order(self.select(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CheckResult, StateContext};

    fn ok_check(_: &mut StateContext) -> CheckResult {
        Ok(())
    }

    fn unit(id: &str, speed: SpeedClass) -> TestUnit {
        let mut unit = TestUnit::state("m", "t", speed, ok_check);
        unit.id = id.to_string();
        unit
    }

    fn units(ids: &[&str]) -> Vec<TestUnit> {
        ids.iter().map(|id| unit(id, SpeedClass::Normal)).collect()
    }

    fn ids(units: &[TestUnit]) -> Vec<&str> {
        units.iter().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn test_reverse_lexicographic_order() {
        let ordered = Scheduler::default().schedule(units(&["b", "a", "c"]));
        assert_eq!(ids(&ordered), ["c", "b", "a"]);
    }

    #[test]
    fn test_boosted_unit_moves_to_front() {
        let scheduler = Scheduler::new(BoostList::new(["a"]));
        let ordered = scheduler.schedule(units(&["b", "a", "c"]));
        assert_eq!(ids(&ordered), ["a", "c", "b"]);
    }

    #[test]
    fn test_boost_tie_break() {
        let input = || units(&["x", "a", "m", "b"]);
        let boost = BoostList::new(["a", "m"]);

        let ordered = Scheduler::new(boost.clone()).schedule(input());
        assert_eq!(ids(&ordered), ["m", "a", "x", "b"]);

        let ordered = Scheduler::new(boost)
            .boost_order(BoostOrder::Listed)
            .schedule(input());
        assert_eq!(ids(&ordered), ["a", "m", "x", "b"]);
    }

    #[test]
    fn test_speed_class_selection() {
        let input = || {
            vec![
                unit("m::fast", SpeedClass::Normal),
                unit("m::slow", SpeedClass::Slow),
                unit("m::window", SpeedClass::External),
            ]
        };

        let default = Scheduler::default().schedule(input());
        assert_eq!(ids(&default), ["m::fast"]);

        let with_slow = Scheduler::default().include_slow(true).schedule(input());
        assert_eq!(ids(&with_slow), ["m::slow", "m::fast"]);
    }

    #[test]
    fn test_run_only_reaches_external_units() {
        let input = vec![
            unit("m::fast", SpeedClass::Normal),
            unit("m::window", SpeedClass::External),
        ];
        let selected = Scheduler::default()
            .run_only(Some("window".into()))
            .schedule(input);
        assert_eq!(ids(&selected), ["m::window"]);
    }

    #[test]
    fn test_matches_name() {
        assert!(matches_name("pitch::test_middle_c", "pitch::test_middle_c"));
        assert!(matches_name("pitch::test_middle_c", "test_middle_c"));
        assert!(matches_name("pitch::test_middle_c", "pitch"));
        assert!(!matches_name("pitches::test_x", "pitch"));
        assert!(!matches_name("pitch::test_middle_c", "test_middle"));
    }

    #[test]
    fn test_boost_list_parse() {
        let list = BoostList::parse("# slow units\nb::x\n\n a::y  # corpus scan\nb::x\n");
        assert_eq!(list.len(), 2);
        assert_eq!(list.position("a::y"), Some(1));
    }
}
