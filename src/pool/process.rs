//! Worker handles and the process-backed worker
//!
//! A [`Worker`] runs one unit at a time on behalf of the dispatcher. The
//! production worker is a child process speaking the line protocol in
//! [`super::protocol`]; the dispatcher only sees the trait.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::protocol::{decode_line, Line, Reply, Request};
use crate::error::HarnessError;
use crate::models::ExecutionOutcome;

/// Environment variable carrying serialized worker options to the child
pub const WORKER_OPTIONS_ENV: &str = "TESSITURA_WORKER_OPTIONS";

const READY_TIMEOUT: Duration = Duration::from_secs(30);
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Why a worker could not deliver an outcome
#[derive(Error, Debug)]
pub enum WorkerFault {
    #[error("worker exited ({0})")]
    Exited(String),

    #[error("malformed reply: {0}")]
    Malformed(String),

    #[error("worker io error: {0}")]
    Io(String),
}

/// One execution slot of the pool
pub trait Worker: Send {
    /// Execute one unit and return its outcome
    fn run_unit(
        &mut self,
        unit_id: &str,
    ) -> impl Future<Output = Result<ExecutionOutcome, WorkerFault>> + Send;

    /// Ask the worker to exit once its queue is drained
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send;

    /// Kill the worker immediately
    fn terminate(&mut self) -> impl Future<Output = ()> + Send;
}

/// Creates (and re-creates) workers for pool slots
pub trait WorkerFactory: Send + Sync {
    type Worker: Worker + 'static;

    fn spawn(&self, slot: usize) -> impl Future<Output = Result<Self::Worker, HarnessError>> + Send;
}

/// Program and arguments that start a worker process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// The running binary re-executed with its `worker` subcommand
    pub fn current_exe() -> Result<Self, HarnessError> {
        let program = std::env::current_exe().map_err(|e| HarnessError::Spawn {
            slot: 0,
            reason: format!("cannot locate current executable: {e}"),
        })?;
        Ok(Self::new(program).arg("worker"))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Spawns [`ProcessWorker`]s from a [`WorkerCommand`]
#[derive(Clone, Debug)]
pub struct ProcessWorkerFactory {
    command: WorkerCommand,
    options: String,
}

impl ProcessWorkerFactory {
    /// `options` is passed to every child through [`WORKER_OPTIONS_ENV`]
    pub fn new(command: WorkerCommand, options: String) -> Self {
        Self { command, options }
    }
}

impl WorkerFactory for ProcessWorkerFactory {
    type Worker = ProcessWorker;

    async fn spawn(&self, slot: usize) -> Result<ProcessWorker, HarnessError> {
        let spawn_error = |reason: String| HarnessError::Spawn { slot, reason };

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .env(WORKER_OPTIONS_ENV, &self.options)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                spawn_error(format!("{}: {e}", self.command.program.display()))
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(spawn_error("child stdio not captured".into()));
        };

        let mut worker = ProcessWorker {
            slot,
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            current: None,
        };

        match tokio::time::timeout(READY_TIMEOUT, worker.read_reply()).await {
            Ok(Ok(Reply::Ready { units })) => {
                debug!("Worker {} ready with {} units", slot, units);
                Ok(worker)
            }
            Ok(Ok(other)) => {
                worker.terminate().await;
                Err(spawn_error(format!("expected ready, got {other:?}")))
            }
            Ok(Err(fault)) => Err(spawn_error(fault.to_string())),
            Err(_) => {
                worker.terminate().await;
                Err(spawn_error("no ready signal".into()))
            }
        }
    }
}

/// A worker child process
pub struct ProcessWorker {
    slot: usize,
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// Unit in flight, for attributing stray output
    current: Option<String>,
}

impl ProcessWorker {
    async fn send(&mut self, request: &Request) -> Result<(), WorkerFault> {
        let mut line =
            serde_json::to_string(request).map_err(|e| WorkerFault::Io(e.to_string()))?;
        line.push('\n');

        let written: std::io::Result<()> = async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.flush().await
        }
        .await;

        match written {
            Ok(()) => Ok(()),
            Err(e) => {
                let status = self.exit_status().await;
                Err(WorkerFault::Io(format!("{e}; {status}")))
            }
        }
    }

    /// Next reply, forwarding unit output that reached stdout
    async fn read_reply(&mut self) -> Result<Reply, WorkerFault> {
        loop {
            let line = match self.stdout.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Err(WorkerFault::Exited(self.exit_status().await)),
                Err(e) => return Err(WorkerFault::Io(e.to_string())),
            };

            match decode_line(&line) {
                Line::Stray(text) => self.forward(&text),
                Line::Reply { stray, reply } => {
                    if !stray.is_empty() {
                        self.forward(&stray);
                    }
                    return Ok(reply);
                }
                Line::Malformed(detail) => return Err(WorkerFault::Malformed(detail)),
            }
        }
    }

    fn forward(&self, text: &str) {
        match &self.current {
            Some(unit_id) => warn!("worker {} [{}]: {}", self.slot, unit_id, text),
            None => warn!("worker {}: {}", self.slot, text),
        }
    }

    async fn exit_status(&mut self) -> String {
        match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => status.to_string(),
            Ok(Err(e)) => format!("exit status unavailable: {e}"),
            Err(_) => "still running".to_string(),
        }
    }
}

impl Worker for ProcessWorker {
    async fn run_unit(&mut self, unit_id: &str) -> Result<ExecutionOutcome, WorkerFault> {
        self.current = Some(unit_id.to_string());
        self.send(&Request::Run {
            unit_id: unit_id.to_string(),
        })
        .await?;

        let reply = self.read_reply().await;
        self.current = None;
        match reply? {
            Reply::Outcome { outcome } => Ok(outcome),
            Reply::Ready { .. } => Err(WorkerFault::Malformed("unexpected ready".into())),
        }
    }

    async fn shutdown(&mut self) {
        if self.send(&Request::Shutdown).await.is_ok()
            && tokio::time::timeout(EXIT_GRACE, self.child.wait())
                .await
                .is_ok()
        {
            return;
        }
        self.terminate().await;
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!("Worker {} kill failed: {}", self.slot, e);
        }
    }
}
