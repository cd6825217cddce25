//! Ties the command line, the toolchain layout and the suites together.

use crate::cli::{Cli, Commands};
use crate::error::DriverResult;
use crate::suites;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use stest::{KeywordExpr, TestSuite};
use toolchain::{system_name, GtEnvironment};
use tracing::{info, warn};

/// Text to print and whether the run counts as a success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOutput {
    pub text: String,
    pub success: bool,
}

/// Build the full suite against a resolved toolchain.
pub fn build_suite(gt: Arc<GtEnvironment>) -> TestSuite {
    let mut suite = TestSuite::new();
    suites::register_all(&mut suite, &gt);
    suite
}

/// Execute the command described by `cli`, resolving paths against `cwd`.
pub async fn execute(cli: &Cli, cwd: &Path) -> DriverResult<DriverOutput> {
    if !cli.ignored.is_empty() {
        warn!(ignored = ?cli.ignored, "Ignoring unrecognized arguments");
    }

    let gt = Arc::new(GtEnvironment::resolve(&cli.args.gt_args(), cwd));
    let mut suite = build_suite(Arc::clone(&gt));

    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::List => {
            let keywords = match &cli.args.keywords {
                Some(expr) => KeywordExpr::parse(expr).map_err(stest::SuiteError::from)?,
                None => KeywordExpr::Any,
            };
            Ok(DriverOutput {
                text: listing(&suite, &keywords),
                success: true,
            })
        }
        Commands::Run => {
            let config = cli.args.runner_config()?;
            if let Some(threads) = config.threads {
                suite.set_nof_threads(threads);
            }

            info!(
                system = %system_name(),
                seed = config.seed,
                gt = %gt.gt(),
                testdata = %gt.testdata_dir.display(),
                "Running gt testsuite"
            );

            let report = suite.run(&config).await?;
            Ok(DriverOutput {
                text: report.render(cli.args.report_format())?,
                success: report.success(),
            })
        }
    }
}

fn listing(suite: &TestSuite, keywords: &KeywordExpr) -> String {
    let mut output = String::new();
    for (i, case) in suite.tests().iter().enumerate() {
        if keywords.matches(case.keywords()) {
            let _ = writeln!(output, "{:>3}: {} [{}]", i + 1, case.name(), case.keywords());
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_list_filters_by_keyword() {
        let cli = Cli::try_parse_from(["testsuite", "list", "--keywords", "ncrna"]).unwrap();
        let output = execute(&cli, Path::new("/src/gt/testsuite")).await.unwrap();

        assert!(output.success);
        let lines: Vec<&str> = output.text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "  6: ncrna: empty data [ncrna infernal infernal_to_gff3]"
        );
    }

    #[tokio::test]
    async fn test_unknown_keys_do_not_change_listing() {
        let plain = Cli::try_parse_from(["testsuite", "--keywords", "aragorn", "list"]).unwrap();
        let noisy = Cli::try_parse_from([
            "testsuite",
            "--memcheck",
            "--keywords",
            "aragorn",
            "list",
        ])
        .unwrap();
        assert_eq!(noisy.ignored, vec!["--memcheck"]);

        let cwd = Path::new("/src/gt/testsuite");
        let plain = execute(&plain, cwd).await.unwrap();
        let noisy = execute(&noisy, cwd).await.unwrap();
        assert_eq!(plain, noisy);
        assert_eq!(noisy.text.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_expression() {
        let cli = Cli::try_parse_from(["testsuite", "list", "--keywords", "(aragorn"]).unwrap();
        assert!(execute(&cli, Path::new("/t")).await.is_err());
    }
}
