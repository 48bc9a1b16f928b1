//! Unit execution engine
//!
//! Runs exactly one unit in isolation and captures its outcome.

mod isolated;
mod matching;

pub use isolated::Executor;
pub use matching::{canonical, output_matches, MatchOptions};
