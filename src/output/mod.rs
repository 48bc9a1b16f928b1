//! Run output
//!
//! A successful run prints nothing. A run with failures prints a summary of
//! every failing unit followed by the totals line. The JSON report file is
//! written whenever one is requested.

mod formatter;

pub use formatter::ResultFormatter;

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;
use tracing::info;

use crate::models::{ExecutionOutcome, RunReport};

/// Writes run output to a sink (stdout by default)
pub struct Reporter<W> {
    out: W,
    formatter: ResultFormatter,
    verbose: bool,
}

impl Reporter<io::Stdout> {
    /// Reporter on stdout; colors only when stdout is a terminal
    pub fn stdout(verbose: bool) -> Self {
        let out = io::stdout();
        let formatter = if out.is_terminal() {
            ResultFormatter::new()
        } else {
            ResultFormatter::new().no_color()
        };
        Self {
            out,
            formatter,
            verbose,
        }
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, formatter: ResultFormatter, verbose: bool) -> Self {
        Self {
            out,
            formatter,
            verbose,
        }
    }

    /// Called as each outcome arrives
    pub fn progress(&mut self, outcome: &ExecutionOutcome) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        match self.formatter.format_progress(outcome) {
            Some(line) => writeln!(self.out, "{line}"),
            None => Ok(()),
        }
    }

    /// Final summary; writes nothing for a successful run
    pub fn summary(&mut self, report: &RunReport) -> io::Result<()> {
        let text = self.formatter.format_summary(report);
        if text.is_empty() {
            return Ok(());
        }
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Write the full report as pretty JSON
pub fn write_report(path: impl AsRef<Path>, report: &RunReport) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).context("Failed to write report")?;
    writer.flush().context("Failed to write report")?;

    info!("Saved run report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn reporter(verbose: bool) -> Reporter<Vec<u8>> {
        Reporter::new(Vec::new(), ResultFormatter::new().no_color(), verbose)
    }

    #[test]
    fn test_silent_on_success() {
        let mut reporter = reporter(false);
        let outcome = ExecutionOutcome::pass("m::test_a", 1);
        reporter.progress(&outcome).unwrap();
        reporter
            .summary(&RunReport::new(vec![outcome], Utc::now()))
            .unwrap();
        assert!(reporter.into_inner().is_empty());
    }

    #[test]
    fn test_verbose_progress() {
        let mut reporter = reporter(true);
        reporter
            .progress(&ExecutionOutcome::pass("m::test_a", 4))
            .unwrap();
        reporter
            .progress(&ExecutionOutcome::error("m::test_b", "boom"))
            .unwrap();
        assert_eq!(
            String::from_utf8(reporter.into_inner()).unwrap(),
            "ok m::test_a (4ms)\n"
        );
    }

    #[test]
    fn test_failure_summary_written() {
        let mut reporter = reporter(false);
        let report = RunReport::new(
            vec![ExecutionOutcome::fail("m::test_b", 1, "\"C4\" != \"D4\"")],
            Utc::now(),
        );
        reporter.summary(&report).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.contains("m::test_b"));
        assert!(text.contains("Fail: 1"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let report = RunReport::new(vec![ExecutionOutcome::pass("m::test_a", 1)], Utc::now());

        write_report(&path, &report).unwrap();

        let loaded: RunReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.total, 1);
        assert_eq!(loaded.exit_code, 0);
        assert_eq!(loaded.outcomes[0].unit_id, "m::test_a");
    }
}
