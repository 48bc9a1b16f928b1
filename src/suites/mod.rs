//! Module sets shipped with the binary

pub mod faults;
pub mod sample;

use clap::ValueEnum;

use crate::registry::ModuleRegistry;

/// Built-in suite selectable with `--suite`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    /// Pitch and interval helpers; everything passes
    #[default]
    Sample,
    /// Failing, faulting, crashing and hanging units
    Faults,
}

impl Suite {
    pub fn name(self) -> &'static str {
        match self {
            Suite::Sample => "sample",
            Suite::Faults => "faults",
        }
    }

    pub fn registry(self) -> ModuleRegistry {
        match self {
            Suite::Sample => sample::registry(),
            Suite::Faults => faults::registry(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suites_register_modules() {
        assert_eq!(Suite::Sample.registry().names().collect::<Vec<_>>(), ["pitch", "interval"]);
        assert_eq!(Suite::Faults.registry().len(), 3);
        assert_eq!(Suite::default().name(), "sample");
    }
}
