//! A small framework for suites of shell-pipeline tests.
//!
//! Tests are registered by name and keywords into a [`TestSuite`]. Each one
//! runs commands through its [`TestContext`], asserting exit codes and
//! comparing captured output against golden files, and the suite runs them
//! in parallel up to a configurable thread count.

pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod keywords;
pub mod report;
mod runner;
pub mod suite;

pub use config::{random_seed, RunnerConfig, DEFAULT_WORK_ROOT, SEED_RANGE};
pub use context::{CommandRecord, RunOptions, TestContext};
pub use env::with_environment;
pub use error::{KeywordError, StepError, StepResult, SuiteError, SuiteResult};
pub use keywords::KeywordExpr;
pub use report::{ReportFormat, SuiteReport, TestOutcome, TestStatus};
pub use suite::{Selection, TestBody, TestCase, TestSuite};

