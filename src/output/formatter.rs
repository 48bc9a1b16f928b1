//! Text formatting for run output

use crate::models::{ExecutionOutcome, FailureDetail, RunReport, TestStatus, TestUnit};

/// Formats outcomes, failure summaries and unit listings
#[derive(Clone, Copy, Debug)]
pub struct ResultFormatter {
    colorize: bool,
}

impl ResultFormatter {
    pub fn new() -> Self {
        Self { colorize: true }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn status_label(&self, status: TestStatus) -> String {
        let label = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return label;
        }
        match status {
            TestStatus::Pass => format!("\x1b[32m{label}\x1b[0m"),
            TestStatus::Fail | TestStatus::Error => format!("\x1b[31m{label}\x1b[0m"),
        }
    }

    /// Verbose line for a passing unit; `None` for anything else
    pub fn format_progress(&self, outcome: &ExecutionOutcome) -> Option<String> {
        outcome
            .status
            .is_success()
            .then(|| format!("ok {} ({}ms)", outcome.unit_id, outcome.duration_ms))
    }

    /// One failing unit: status and id, then the message indented
    pub fn format_failure(&self, detail: &FailureDetail) -> String {
        let mut output = format!("{} {}\n", self.status_label(detail.status), detail.unit_id);
        for line in detail.message.lines() {
            output.push_str("    ");
            output.push_str(line);
            output.push('\n');
        }
        output
    }

    /// Failure summary; empty when the run succeeded
    pub fn format_summary(&self, report: &RunReport) -> String {
        if report.is_success() {
            return String::new();
        }

        let mut output = String::new();
        output.push_str(&format!(
            "\n{} of {} units did not pass:\n\n",
            report.failed + report.errored,
            report.total
        ));
        for detail in &report.failure_details {
            output.push_str(&self.format_failure(detail));
        }
        output.push('\n');
        output.push_str(&report.to_string());
        output.push('\n');
        output
    }

    /// `list` output: id, kind and speed class per unit
    pub fn format_listing(&self, units: &[TestUnit]) -> String {
        let width = units.iter().map(|u| u.id.len()).max().unwrap_or(0);
        let mut output = String::new();
        for unit in units {
            output.push_str(&format!(
                "{:width$}  {:7}  {}\n",
                unit.id,
                unit.kind.name(),
                unit.speed.name(),
                width = width
            ));
        }
        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new()
    }
}
