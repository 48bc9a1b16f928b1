//! Worker pool dispatcher
//!
//! Runs an ordered list of unit ids to completion on a fixed number of
//! workers. Every worker task pulls the next id from the front of a shared
//! queue and sends its outcome down one channel; the dispatcher collects
//! until every id has exactly one outcome.

pub mod process;
pub mod protocol;

pub use process::{
    ProcessWorker, ProcessWorkerFactory, Worker, WorkerCommand, WorkerFactory, WorkerFault,
    WORKER_OPTIONS_ENV,
};

use futures::future::join_all;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::HarnessError;
use crate::models::ExecutionOutcome;

/// Default per-unit timeout in seconds
pub const DEFAULT_UNIT_TIMEOUT_SECS: u64 = 600;

/// Default pool size: available parallelism minus one, at least one
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Called with every accepted outcome as it arrives
pub type Progress = Arc<dyn Fn(&ExecutionOutcome) + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOptions {
    pub workers: usize,
    pub unit_timeout: Duration,
    pub run_timeout: Option<Duration>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            unit_timeout: Duration::from_secs(DEFAULT_UNIT_TIMEOUT_SECS),
            run_timeout: None,
        }
    }
}

/// State shared by the worker tasks of one dispatch
struct Shared<F> {
    factory: Arc<F>,
    queue: Mutex<VecDeque<String>>,
    unit_timeout: Duration,
    deadline: Option<Instant>,
}

impl<F> Shared<F> {
    async fn next_unit(&self) -> Option<String> {
        self.queue.lock().await.pop_front()
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time budget for the next unit and whether the run deadline bounds it
    fn limit(&self) -> (Duration, bool) {
        match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining < self.unit_timeout {
                    (remaining, true)
                } else {
                    (self.unit_timeout, false)
                }
            }
            None => (self.unit_timeout, false),
        }
    }
}

/// Fire-and-collect executor over a [`WorkerFactory`]
pub struct Dispatcher<F> {
    factory: Arc<F>,
    options: DispatchOptions,
    progress: Option<Progress>,
}

impl<F> Dispatcher<F>
where
    F: WorkerFactory + 'static,
{
    pub fn new(factory: F, options: DispatchOptions) -> Self {
        Self {
            factory: Arc::new(factory),
            options,
            progress: None,
        }
    }

    pub fn on_outcome(mut self, callback: impl Fn(&ExecutionOutcome) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Run `unit_ids` in the given order; one outcome per id, in arrival order
    pub async fn dispatch(
        &self,
        unit_ids: Vec<String>,
    ) -> Result<Vec<ExecutionOutcome>, HarnessError> {
        if unit_ids.is_empty() {
            return Ok(Vec::new());
        }

        let pool_size = self.options.workers.clamp(1, unit_ids.len());
        let workers = self.start_workers(pool_size).await?;
        info!(
            "Dispatching {} units on {} workers",
            unit_ids.len(),
            workers.len()
        );

        let shared = Arc::new(Shared {
            factory: Arc::clone(&self.factory),
            queue: Mutex::new(unit_ids.iter().cloned().collect()),
            unit_timeout: self.options.unit_timeout,
            deadline: self.options.run_timeout.map(|t| Instant::now() + t),
        });

        let (tx, mut rx) = mpsc::channel(workers.len() * 4);
        let handles: Vec<_> = workers
            .into_iter()
            .map(|(slot, worker)| {
                tokio::spawn(work_loop(slot, worker, Arc::clone(&shared), tx.clone()))
            })
            .collect();
        drop(tx);

        let expected: HashSet<&str> = unit_ids.iter().map(String::as_str).collect();
        let mut received: HashSet<String> = HashSet::new();
        let mut outcomes = Vec::with_capacity(unit_ids.len());

        while let Some(outcome) = rx.recv().await {
            if !expected.contains(outcome.unit_id.as_str()) {
                warn!("Discarding outcome for unknown unit {}", outcome.unit_id);
                continue;
            }
            if !received.insert(outcome.unit_id.clone()) {
                warn!("Discarding duplicate outcome for {}", outcome.unit_id);
                continue;
            }
            if let Some(progress) = &self.progress {
                progress(&outcome);
            }
            outcomes.push(outcome);
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                warn!("Worker task failed: {}", e);
            }
        }

        let unserved: HashSet<String> = shared.queue.lock().await.drain(..).collect();
        for id in unit_ids {
            if received.contains(&id) {
                continue;
            }
            let message = if unserved.contains(&id) {
                "no worker available"
            } else {
                "no outcome received from worker"
            };
            let outcome = ExecutionOutcome::error(&id, message);
            if let Some(progress) = &self.progress {
                progress(&outcome);
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn start_workers(&self, count: usize) -> Result<Vec<(usize, F::Worker)>, HarnessError> {
        let spawned = join_all((0..count).map(|slot| self.factory.spawn(slot))).await;

        let mut workers = Vec::with_capacity(count);
        let mut last_error = None;
        for (slot, result) in spawned.into_iter().enumerate() {
            match result {
                Ok(worker) => workers.push((slot, worker)),
                Err(e) => {
                    warn!("{}", e);
                    last_error = Some(e);
                }
            }
        }

        if workers.is_empty() {
            let reason = last_error.map_or_else(|| "pool is empty".to_string(), |e| e.to_string());
            return Err(HarnessError::NoWorkers(reason));
        }
        Ok(workers)
    }
}

async fn work_loop<F: WorkerFactory>(
    slot: usize,
    worker: F::Worker,
    shared: Arc<Shared<F>>,
    tx: mpsc::Sender<ExecutionOutcome>,
) {
    let mut worker = Some(worker);

    loop {
        if shared.deadline_passed() {
            while let Some(unit_id) = shared.next_unit().await {
                let outcome = ExecutionOutcome::error(unit_id, "not started before run timeout");
                if tx.send(outcome).await.is_err() {
                    break;
                }
            }
            break;
        }

        let Some(unit_id) = shared.next_unit().await else {
            break;
        };

        let mut active = match worker.take() {
            Some(active) => active,
            None => match shared.factory.spawn(slot).await {
                Ok(replacement) => {
                    debug!("Worker {} respawned", slot);
                    replacement
                }
                Err(e) => {
                    warn!("{}; returning {} to the queue", e, unit_id);
                    shared.queue.lock().await.push_front(unit_id);
                    return;
                }
            },
        };

        let (limit, bounded_by_run) = shared.limit();
        let result = tokio::time::timeout(limit, active.run_unit(&unit_id)).await;
        let outcome = match result {
            Ok(Ok(outcome)) => {
                worker = Some(active);
                outcome
            }
            Ok(Err(fault)) => {
                warn!("Worker {} failed on {}: {}", slot, unit_id, fault);
                active.terminate().await;
                ExecutionOutcome::error(&unit_id, format!("worker failure: {fault}"))
            }
            Err(_) => {
                active.terminate().await;
                let reason = if bounded_by_run {
                    "run timeout".to_string()
                } else {
                    format!("timed out after {}s", limit.as_secs_f64())
                };
                warn!("Unit {} on worker {}: {}", unit_id, slot, reason);
                ExecutionOutcome::error(&unit_id, reason).with_duration(limit.as_millis() as u64)
            }
        };

        if tx.send(outcome).await.is_err() {
            break;
        }
    }

    if let Some(mut worker) = worker {
        worker.shutdown().await;
    }
}
