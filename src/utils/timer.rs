//! Unit durations and run phase timings

use std::time::{Duration, Instant};

/// Times one unit; the label is only used for trace output
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    /// Elapsed milliseconds since `start`
    pub fn stop(self) -> u64 {
        let elapsed = self.start.elapsed().as_millis() as u64;
        tracing::trace!("{} took {}ms", self.label, elapsed);
        elapsed
    }
}

/// Wall-clock split of a run into named phases
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    last: Instant,
    phases: Vec<(String, Duration)>,
}

impl Stopwatch {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            phases: Vec::new(),
        }
    }

    /// Close the current phase under `label`
    pub fn lap(&mut self, label: impl Into<String>) {
        let now = Instant::now();
        self.phases.push((label.into(), now - self.last));
        self.last = now;
    }

    /// `schedule 1ms, dispatch 250ms (total 251ms)`
    pub fn format(&self) -> String {
        let phases = self
            .phases
            .iter()
            .map(|(label, spent)| format!("{label} {}ms", spent.as_millis()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{phases} (total {}ms)", self.start.elapsed().as_millis())
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
