//! Per-test execution context.
//!
//! Every test body receives a [`TestContext`] bound to its own scratch
//! directory. Commands run through `sh -c` inside that directory; their
//! stdout and stderr are captured into numbered files so later steps can
//! `diff` against them.

use crate::error::{StepError, StepResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STDERR_TAIL_LINES: usize = 20;

/// Options for a single command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Expected exit code
    pub retval: i32,
    /// Upper bound on wall time, overriding the context default
    pub maxtime: Option<Duration>,
    /// Extra variables for this command only
    pub env: Vec<(String, String)>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retval(mut self, retval: i32) -> Self {
        self.retval = retval;
        self
    }

    pub fn with_maxtime(mut self, maxtime: Duration) -> Self {
        self.maxtime = Some(maxtime);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// What a finished command left behind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub exit_code: i32,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

pub struct TestContext {
    number: usize,
    dir: PathBuf,
    seed: u64,
    maxtime: Option<Duration>,
    env: BTreeMap<String, String>,
    commands: Vec<CommandRecord>,
}

impl TestContext {
    /// Create a context working in `dir`, which must already exist.
    pub fn new(number: usize, dir: impl Into<PathBuf>, seed: u64) -> Self {
        Self {
            number,
            dir: dir.into(),
            seed,
            maxtime: None,
            env: BTreeMap::new(),
            commands: Vec::new(),
        }
    }

    /// Default time limit for commands that don't set their own
    pub fn with_maxtime(mut self, maxtime: Option<Duration>) -> Self {
        self.maxtime = maxtime;
        self
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn commands(&self) -> &[CommandRecord] {
        &self.commands
    }

    /// Resolve a file name inside the scratch directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Run a command expecting exit code 0.
    pub fn run(&mut self, command: &str) -> StepResult<CommandRecord> {
        self.run_with(command, RunOptions::default())
    }

    /// Run a command and check its exit code against `opts.retval`.
    pub fn run_with(&mut self, command: &str, opts: RunOptions) -> StepResult<CommandRecord> {
        let index = self.commands.len() + 1;
        let stdout_path = self.dir.join(format!("stdout_{}", index));
        let stderr_path = self.dir.join(format!("stderr_{}", index));

        debug!(test = self.number, index, command, "Running command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.dir)
            .envs(&self.env)
            .envs(opts.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(File::create(&stdout_path)?)
            .stderr(File::create(&stderr_path)?);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Every pipeline stage shares the group, so a timeout can reap them all
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|source| StepError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let limit = opts.maxtime.or(self.maxtime);
        let status = wait_with_limit(&mut child, limit).map_err(|e| match e {
            WaitError::Io(e) => StepError::Io(e),
            WaitError::TimedOut(limit) => StepError::Timeout {
                command: command.to_string(),
                limit,
            },
        })?;

        let record = CommandRecord {
            command: command.to_string(),
            exit_code: exit_code(status),
            stdout: stdout_path,
            stderr: stderr_path,
        };
        self.commands.push(record.clone());

        if record.exit_code != opts.retval {
            warn!(
                test = self.number,
                command,
                expected = opts.retval,
                actual = record.exit_code,
                "Unexpected exit code"
            );
            return Err(StepError::UnexpectedExitCode {
                command: command.to_string(),
                expected: opts.retval,
                actual: record.exit_code,
                stderr: tail(&record.stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(record)
    }

    /// Captured stdout of the most recent command
    pub fn last_stdout(&self) -> StepResult<PathBuf> {
        self.commands
            .last()
            .map(|record| record.stdout.clone())
            .ok_or(StepError::NoCommandRun)
    }

    /// Captured stderr of the most recent command
    pub fn last_stderr(&self) -> StepResult<PathBuf> {
        self.commands
            .last()
            .map(|record| record.stderr.clone())
            .ok_or(StepError::NoCommandRun)
    }

    /// Succeed if any line of `file` matches `pattern`.
    ///
    /// Relative paths are taken relative to the scratch directory.
    pub fn grep(&self, file: impl AsRef<Path>, pattern: &str) -> StepResult<()> {
        let regex = Regex::new(pattern).map_err(|source| StepError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let file = self.dir.join(file.as_ref());
        let bytes = fs::read(&file)?;
        let content = String::from_utf8_lossy(&bytes);

        if content.lines().any(|line| regex.is_match(line)) {
            Ok(())
        } else {
            Err(StepError::PatternNotFound {
                pattern: pattern.to_string(),
                file,
            })
        }
    }

    /// Fail the test with a message.
    pub fn fail<T>(&self, message: impl Into<String>) -> StepResult<T> {
        Err(StepError::Failed {
            message: message.into(),
        })
    }

    /// Run `f` with extra variables for every command it spawns.
    ///
    /// Only this context's commands see the variables; the process
    /// environment is left alone. Previous values are restored even if `f`
    /// panics.
    pub fn with_environment<K, V, T>(
        &mut self,
        vars: &[(K, V)],
        f: impl FnOnce(&mut Self) -> T,
    ) -> T
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let previous: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, value)| {
                let key = key.as_ref().to_string();
                let old = self.env.insert(key.clone(), value.as_ref().to_string());
                (key, old)
            })
            .collect();

        let result = panic::catch_unwind(AssertUnwindSafe(|| f(self)));

        for (key, value) in previous.into_iter().rev() {
            match value {
                Some(value) => self.env.insert(key, value),
                None => self.env.remove(&key),
            };
        }

        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Current environment overlay
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

enum WaitError {
    Io(std::io::Error),
    TimedOut(Duration),
}

fn wait_with_limit(child: &mut Child, limit: Option<Duration>) -> Result<ExitStatus, WaitError> {
    let Some(limit) = limit else {
        return child.wait().map_err(WaitError::Io);
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(WaitError::Io)? {
            return Ok(status);
        }
        if start.elapsed() >= limit {
            kill_process_group(child);
            let _ = child.wait();
            return Err(WaitError::TimedOut(limit));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the shell and everything it started. The child leads its own
/// process group, so signalling the negated pid reaches every stage.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    let group = format!("-{}", child.id());
    let killed = Command::new("kill")
        .args(["-KILL", "--", group.as_str()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false);
    if !killed {
        warn!(pid = child.id(), "Could not kill process group, killing shell only");
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    // Shell convention for signal deaths
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn tail(path: &Path, lines: usize) -> String {
    let Ok(bytes) = fs::read(path) else {
        return String::new();
    };
    let content = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = content.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
