//! Worker process loop
//!
//! A harness binary calls [`serve`] from its hidden `worker` subcommand. The
//! worker rediscovers the same units as the dispatcher, then answers one
//! `run` request at a time on stdin/stdout until told to shut down or until
//! stdin closes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::panic;
use std::path::PathBuf;
use tracing::debug;

use crate::discovery::Discovery;
use crate::executor::{Executor, MatchOptions};
use crate::models::{ExecutionOutcome, TestUnit};
use crate::pool::protocol::{encode_reply, Reply, Request};
use crate::pool::WORKER_OPTIONS_ENV;
use crate::registry::ModuleRegistry;

/// Settings a worker needs to rebuild the dispatcher's unit set
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerOptions {
    pub doc_dirs: Vec<PathBuf>,
    pub matching: MatchOptions,
}

impl WorkerOptions {
    /// Options passed down by the dispatcher, or defaults when run by hand
    pub fn from_env() -> Result<Self> {
        match std::env::var(WORKER_OPTIONS_ENV) {
            Ok(json) => serde_json::from_str(&json)
                .with_context(|| format!("Invalid {WORKER_OPTIONS_ENV}")),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize worker options")
    }
}

/// Serve run requests until shutdown or end of input
pub fn serve(registry: &ModuleRegistry, options: &WorkerOptions) -> Result<()> {
    let units: HashMap<String, TestUnit> = Discovery::new(registry)
        .with_doc_dirs(options.doc_dirs.clone())
        .discover()
        .into_iter()
        .map(|unit| (unit.id.clone(), unit))
        .collect();

    // Panics are reported through outcomes, not stderr.
    panic::set_hook(Box::new(|_| {}));

    let executor = Executor::new(options.matching);
    let mut stdout = io::stdout();
    reply(&mut stdout, &Reply::Ready { units: units.len() })?;

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str(&line).with_context(|| format!("Bad request: {line}"))? {
            Request::Run { unit_id } => {
                let outcome = match units.get(&unit_id) {
                    Some(unit) => executor.execute(unit),
                    None => ExecutionOutcome::error(&unit_id, "unit not found in worker"),
                };
                reply(&mut stdout, &Reply::Outcome { outcome })?;
            }
            Request::Shutdown => break,
        }
    }

    debug!("Worker exiting");
    Ok(())
}

fn reply(out: &mut impl Write, reply: &Reply) -> Result<()> {
    let line = encode_reply(reply).context("Failed to encode reply")?;
    out.write_all(line.as_bytes())?;
    out.flush().context("Failed to flush reply")
}
