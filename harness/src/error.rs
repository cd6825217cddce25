use stest::SuiteError;
use thiserror::Error;
use toolchain::ToolchainError;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    #[error("Suite error: {0}")]
    Suite(#[from] SuiteError),

    #[error("Report rendering failed: {0}")]
    Report(#[from] serde_json::Error),
}

pub type DriverResult<T> = Result<T, DriverError>;
