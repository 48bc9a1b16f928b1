//! Process-isolated test orchestration
//!
//! Units come from a [`registry::ModuleRegistry`]: state tests registered by
//! each module and interactive-session examples found in the module's
//! documentation or in documentation directories. They run in a pool of
//! worker processes so a crash or hang costs one unit, not the run.
//!
//! ```no_run
//! use tessitura::{run_all, HarnessConfig};
//!
//! # async fn demo() -> Result<(), tessitura::HarnessError> {
//! let registry = tessitura::suites::sample::registry();
//! let report = run_all(&registry, &HarnessConfig::default()).await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod harness;
pub mod interp;
pub mod models;
pub mod output;
pub mod pool;
pub mod registry;
pub mod scheduler;
pub mod suites;
pub mod utils;
pub mod worker;

pub use config::HarnessConfig;
pub use error::HarnessError;
pub use harness::{main_ci, main_test, run_all, MainTestOptions};
