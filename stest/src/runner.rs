//! Parallel execution of a [`TestSuite`].
//!
//! Each selected test runs on a blocking worker in its own scratch
//! directory. A semaphore bounds how many run at once; outcomes are
//! collected and reported in test-number order no matter when they finish.

use crate::config::RunnerConfig;
use crate::context::TestContext;
use crate::error::{SuiteError, SuiteResult};
use crate::report::{SuiteReport, TestOutcome, TestStatus};
use crate::suite::{TestBody, TestSuite};
use chrono::Utc;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

struct Job {
    number: usize,
    name: String,
    keywords: String,
    body: Arc<TestBody>,
    dir: PathBuf,
    seed: u64,
    maxtime: Option<Duration>,
}

impl TestSuite {
    /// Run the selected tests and collect their outcomes.
    pub async fn run(&self, config: &RunnerConfig) -> SuiteResult<SuiteReport> {
        config.validate()?;

        if let Some(number) = config.select.iter().find(|&&n| n > self.len()) {
            return Err(SuiteError::InvalidConfig {
                message: format!(
                    "Test {} does not exist, the suite has {} tests",
                    number,
                    self.len()
                ),
            });
        }

        let selection = config.selection()?;
        let selected = self.select(&selection);
        // Never more workers than selected tests
        let threads = config
            .threads
            .unwrap_or_else(|| self.nof_threads())
            .min(selected.len())
            .max(1);
        let started_at = Utc::now();

        let work_root = prepare_work_root(&config.work_root).map_err(|source| {
            SuiteError::WorkRoot {
                path: config.work_root.clone(),
                source,
            }
        })?;

        info!(
            selected = selected.len(),
            total = self.len(),
            threads,
            seed = config.seed,
            "Starting test suite"
        );

        let semaphore = Arc::new(Semaphore::new(threads));
        let mut workers = JoinSet::new();

        for (number, case) in selected {
            let job = Job {
                number,
                name: case.name().to_string(),
                keywords: case.keywords().to_string(),
                body: case.body(),
                dir: work_root.join(format!("test{}", number)),
                seed: config.seed,
                maxtime: config.maxtime,
            };
            let semaphore = Arc::clone(&semaphore);

            workers.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SuiteError::Worker(e.to_string()))?;
                tokio::task::spawn_blocking(move || execute(job))
                    .await
                    .map_err(|e| SuiteError::Worker(e.to_string()))
            });
        }

        let mut outcomes = Vec::with_capacity(workers.len());
        while let Some(joined) = workers.join_next().await {
            let outcome = joined.map_err(|e| SuiteError::Worker(e.to_string()))??;
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|outcome| outcome.number);

        let report = SuiteReport {
            started_at,
            seed: config.seed,
            threads,
            total: self.len(),
            outcomes,
        };

        info!(
            passed = report.passed(),
            failed = report.failed(),
            not_run = report.not_run(),
            "Test suite finished"
        );

        Ok(report)
    }
}

fn execute(job: Job) -> TestOutcome {
    let start = Instant::now();
    let status = match run_body(&job) {
        Ok(()) => TestStatus::Passed,
        Err(reason) => {
            warn!(test = job.number, name = %job.name, %reason, "Test failed");
            TestStatus::Failed { reason }
        }
    };
    debug!(test = job.number, elapsed = ?start.elapsed(), "Test done");

    TestOutcome {
        number: job.number,
        name: job.name,
        keywords: job.keywords,
        status,
        duration: start.elapsed(),
        dir: job.dir,
    }
}

fn run_body(job: &Job) -> Result<(), String> {
    prepare_dir(&job.dir)
        .map_err(|e| format!("cannot prepare {}: {}", job.dir.display(), e))?;

    let mut ctx = TestContext::new(job.number, &job.dir, job.seed).with_maxtime(job.maxtime);
    match panic::catch_unwind(AssertUnwindSafe(|| (job.body)(&mut ctx))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

/// Captured output paths are handed to commands running inside the test
/// directories, so the root has to be absolute.
fn prepare_work_root(root: &Path) -> std::io::Result<PathBuf> {
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };
    fs::create_dir_all(&root)?;
    Ok(root)
}

/// Start every test from an empty directory.
fn prepare_dir(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
