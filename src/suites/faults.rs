//! Units that misbehave on purpose: mismatches, faults, panics, a worker
//! abort, a hang and a module that cannot be loaded.

use std::io::Write;
use std::time::Duration;

use crate::registry::check::{self, CheckResult};
use crate::registry::{Module, ModuleRegistry, StateContext};

fn test_one_equals_one(_: &mut StateContext) -> CheckResult {
    check::equal(1, 1)
}

const ADD_DOC: &str = "\
>>> 1 + 2
3

>>> 1 + 2
4
";

fn test_wrong_pitch(_: &mut StateContext) -> CheckResult {
    check::equal("C4", "D4")
}

fn test_missing_fixture(_: &mut StateContext) -> CheckResult {
    let corpus = std::fs::read_to_string("/nonexistent/tessitura/corpus.txt")
        .map_err(|e| anyhow::anyhow!("fixture unavailable: {e}"))?;
    check::that(!corpus.is_empty(), "empty corpus")
}

fn test_unexpected_panic(_: &mut StateContext) -> CheckResult {
    let scale: Vec<u8> = Vec::new();
    check::equal(scale[7], 0)
}

fn test_abort_worker(_: &mut StateContext) -> CheckResult {
    std::process::abort()
}

fn test_chatty(_: &mut StateContext) -> CheckResult {
    print!("tuning up");
    std::io::stdout().flush().map_err(anyhow::Error::from)?;
    Ok(())
}

fn test_hangs(_: &mut StateContext) -> CheckResult {
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

fn arith() -> Module {
    Module::new("arith")
        .tests(&[("test_one_equals_one", test_one_equals_one)])
        .doc("add", ADD_DOC)
}

fn crash() -> Module {
    Module::new("crash")
        .tests(&[
            ("test_wrong_pitch", test_wrong_pitch),
            ("test_missing_fixture", test_missing_fixture),
            ("test_unexpected_panic", test_unexpected_panic),
            ("test_abort_worker", test_abort_worker),
            ("test_chatty", test_chatty),
        ])
        .slow(&[("test_hangs", test_hangs)])
}

/// Modules of the `faults` suite
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry
        .register("arith", || Ok(arith()))
        .register("crash", || Ok(crash()))
        .register("broken", || {
            anyhow::bail!("cannot load broken: missing dependency 'tuning'")
        });
    registry
}
