//! Suite results and their console/JSON renderings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed { reason: String },
}

impl TestStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestStatus::Passed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub number: usize,
    pub name: String,
    pub keywords: String,
    #[serde(flatten)]
    pub status: TestStatus,
    pub duration: Duration,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub seed: u64,
    pub threads: usize,
    /// Number of registered tests, selected or not
    pub total: usize,
    /// Outcomes of the selected tests, ordered by test number
    pub outcomes: Vec<TestOutcome>,
}

/// Output format for a finished suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Console,
    Json,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn not_run(&self) -> usize {
        self.total.saturating_sub(self.outcomes.len())
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_passed())
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, serde_json::Error> {
        match format {
            ReportFormat::Console => Ok(self.to_console()),
            ReportFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    fn to_console(&self) -> String {
        let mut output = String::new();

        for outcome in &self.outcomes {
            let verdict = match &outcome.status {
                TestStatus::Passed => "ok",
                TestStatus::Failed { .. } => "failed",
            };
            let _ = writeln!(output, "{}: {}: {}", outcome.number, outcome.name, verdict);
        }

        if !self.success() {
            let _ = writeln!(output);
            for outcome in self.failures() {
                if let TestStatus::Failed { reason } = &outcome.status {
                    let _ = writeln!(
                        output,
                        "test {} ({}) failed in {}:",
                        outcome.number,
                        outcome.name,
                        outcome.dir.display()
                    );
                    for line in reason.lines() {
                        let _ = writeln!(output, "    {}", line);
                    }
                }
            }
        }

        let _ = writeln!(
            output,
            "\nOK: {}, failed: {}, not run: {}",
            self.passed(),
            self.failed(),
            self.not_run()
        );
        let _ = writeln!(output, "seed: {}", self.seed);
        output
    }
}
