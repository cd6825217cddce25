pub mod cli;
pub mod driver;
pub mod error;
pub mod suites;

pub use cli::{Cli, Commands, SuiteArgs};
pub use driver::{build_suite, execute, DriverOutput};
pub use error::{DriverError, DriverResult};
pub use suites::GtSteps;
