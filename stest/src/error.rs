use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a single test step failed
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {actual}, expected {expected}{}", stderr_suffix(.stderr))]
    UnexpectedExitCode {
        command: String,
        expected: i32,
        actual: i32,
        stderr: String,
    },

    #[error("`{command}` killed after exceeding {limit:?}")]
    Timeout { command: String, limit: Duration },

    #[error("No command has been run in this test yet")]
    NoCommandRun,

    #[error("Pattern `{pattern}` not found in {}", .file.display())]
    PatternNotFound { pattern: String, file: PathBuf },

    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{message}")]
    Failed { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StepResult<T> = Result<T, StepError>;

/// Errors from keyword expression parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeywordError {
    #[error("Unexpected token `{token}` in keyword expression")]
    UnexpectedToken { token: String },

    #[error("Unexpected end of keyword expression")]
    UnexpectedEnd,

    #[error("Unbalanced parentheses in keyword expression")]
    UnbalancedParens,
}

/// Errors that abort a whole suite run
#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Cannot prepare work directory {}: {source}", .path.display())]
    WorkRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read config file {}: {reason}", .path.display())]
    ConfigFile { path: PathBuf, reason: String },

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("Keyword error: {0}")]
    Keywords(#[from] KeywordError),
}

pub type SuiteResult<T> = Result<T, SuiteError>;

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{}", stderr)
    }
}
