use crate::error::{SuiteError, SuiteResult};
use crate::keywords::KeywordExpr;
use crate::suite::Selection;
use rand::Rng;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Seeds are drawn from `0..2^31`.
pub const SEED_RANGE: u64 = 1 << 31;

pub const DEFAULT_WORK_ROOT: &str = "stest_testsuite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Overrides the suite's own thread count when set
    pub threads: Option<usize>,
    pub seed: u64,
    /// Parent of the per-test `test<N>` directories
    pub work_root: PathBuf,
    /// Default time limit per command
    pub maxtime: Option<Duration>,
    pub keywords: Option<String>,
    pub select: Vec<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            threads: None,
            seed: random_seed(),
            work_root: PathBuf::from(DEFAULT_WORK_ROOT),
            maxtime: Some(Duration::from_secs(60)),
            keywords: None,
            select: Vec::new(),
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    pub fn with_maxtime(mut self, maxtime: Option<Duration>) -> Self {
        self.maxtime = maxtime;
        self
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn with_select(mut self, select: Vec<usize>) -> Self {
        self.select = select;
        self
    }

    pub fn validate(&self) -> SuiteResult<()> {
        if self.threads == Some(0) {
            return Err(invalid("Thread count must be greater than 0"));
        }

        if self.threads.is_some_and(|threads| threads > Semaphore::MAX_PERMITS) {
            return Err(invalid(&format!(
                "Thread count cannot exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }

        if self.maxtime.is_some_and(|maxtime| maxtime.is_zero()) {
            return Err(invalid("Maxtime must be greater than 0"));
        }

        if self.select.contains(&0) {
            return Err(invalid("Test numbers start at 1"));
        }

        if self.work_root.as_os_str().is_empty() {
            return Err(invalid("Work root cannot be empty"));
        }

        self.selection()?;
        Ok(())
    }

    /// Build the test selection from the keyword expression and numbers.
    pub fn selection(&self) -> SuiteResult<Selection> {
        let keywords = match &self.keywords {
            Some(expr) => KeywordExpr::parse(expr)?,
            None => KeywordExpr::Any,
        };
        Ok(Selection {
            keywords,
            numbers: self.select.clone(),
        })
    }

    /// Layer the values of a TOML file over this configuration.
    pub fn merge_toml_str(mut self, content: &str, origin: &Path) -> SuiteResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| SuiteError::ConfigFile {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(threads) = file.threads {
            self.threads = Some(threads);
        }
        if let Some(seed) = file.seed {
            self.seed = seed;
        }
        if let Some(work_root) = file.work_root {
            self.work_root = work_root;
        }
        if let Some(secs) = file.maxtime {
            self.maxtime = Some(Duration::from_secs(secs));
        }
        if let Some(keywords) = file.keywords {
            self.keywords = Some(keywords);
        }
        if let Some(select) = file.select {
            self.select = select;
        }
        Ok(self)
    }

    pub fn merge_toml_file(self, path: &Path) -> SuiteResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SuiteError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.merge_toml_str(&content, path)
    }
}

/// On-disk form; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    threads: Option<usize>,
    seed: Option<u64>,
    work_root: Option<PathBuf>,
    /// Seconds
    maxtime: Option<u64>,
    keywords: Option<String>,
    select: Option<Vec<usize>>,
}

pub fn random_seed() -> u64 {
    rand::thread_rng().gen_range(0..SEED_RANGE)
}

fn invalid(message: &str) -> SuiteError {
    SuiteError::InvalidConfig {
        message: message.to_string(),
    }
}
