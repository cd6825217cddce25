use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use stest::{ReportFormat, RunnerConfig, SuiteResult};
use toolchain::GtArgs;

#[derive(Parser, Debug)]
#[command(name = "testsuite")]
#[command(about = "Run the golden-file tests for the gt Lua converters")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub args: SuiteArgs,

    /// Keys the driver does not know; they are ignored so callers can pass
    /// settings meant for other drivers
    #[arg(hide = true, allow_hyphen_values = true)]
    pub ignored: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the selected tests (the default)
    Run,
    /// List the registered tests with their numbers and keywords
    List,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SuiteArgs {
    /// Prefix prepended to every tool invocation
    #[arg(long, global = true)]
    pub path: Option<String>,
    /// Directory containing the gt binary
    #[arg(long, global = true)]
    pub bin: Option<String>,
    /// Override for the current directory
    #[arg(long, global = true)]
    pub cur: Option<String>,
    /// Random seed handed to every test (default: random in 0..2^31)
    #[arg(long, global = true)]
    pub seed: Option<u64>,
    /// Number of tests to run in parallel
    #[arg(long, global = true)]
    pub threads: Option<usize>,
    /// Keyword expression, e.g. "aragorn and not malformed"
    #[arg(long, global = true)]
    pub keywords: Option<String>,
    /// Only run these test numbers
    #[arg(long, global = true, value_delimiter = ',')]
    pub select: Vec<usize>,
    /// Time limit per command in seconds
    #[arg(long, global = true)]
    pub maxtime: Option<u64>,
    /// Where the per-test scratch directories are created
    #[arg(long, global = true)]
    pub work_root: Option<PathBuf>,
    /// TOML file with runner settings; flags take precedence
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Print the report as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

impl SuiteArgs {
    pub fn gt_args(&self) -> GtArgs {
        GtArgs {
            path: self.path.clone(),
            bin: self.bin.clone(),
            cur: self.cur.clone(),
        }
    }

    /// Defaults, then the config file, then explicit flags.
    pub fn runner_config(&self) -> SuiteResult<RunnerConfig> {
        let mut config = RunnerConfig::default();
        if let Some(path) = &self.config {
            config = config.merge_toml_file(path)?;
        }

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(threads) = self.threads {
            config.threads = Some(threads);
        }
        if let Some(keywords) = &self.keywords {
            config.keywords = Some(keywords.clone());
        }
        if !self.select.is_empty() {
            config.select = self.select.clone();
        }
        if let Some(secs) = self.maxtime {
            config.maxtime = Some(Duration::from_secs(secs));
        }
        if let Some(work_root) = &self.work_root {
            config.work_root = work_root.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn report_format(&self) -> ReportFormat {
        if self.json {
            ReportFormat::Json
        } else {
            ReportFormat::Console
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stest::SuiteError;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["testsuite"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.args.gt_args(), GtArgs::default());

        let config = cli.args.runner_config().unwrap();
        assert_eq!(config.threads, None);
        assert_eq!(config.work_root, PathBuf::from(stest::DEFAULT_WORK_ROOT));
        assert_eq!(cli.args.report_format(), ReportFormat::Console);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "testsuite",
            "--path",
            "/usr/local/bin",
            "--bin",
            "/build/bin",
            "--seed",
            "42",
            "--threads",
            "4",
            "--keywords",
            "aragorn",
            "--select",
            "1,3",
            "--maxtime",
            "10",
            "--json",
        ])
        .unwrap();

        let gt = cli.args.gt_args();
        assert_eq!(gt.path.as_deref(), Some("/usr/local/bin"));
        assert_eq!(gt.bin.as_deref(), Some("/build/bin"));

        let config = cli.args.runner_config().unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.select, vec![1, 3]);
        assert_eq!(config.maxtime, Some(Duration::from_secs(10)));
        assert_eq!(cli.args.report_format(), ReportFormat::Json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["testsuite", "list", "--keywords", "ncrna"]).unwrap();
        assert_eq!(cli.command, Some(Commands::List));
        assert_eq!(cli.args.keywords.as_deref(), Some("ncrna"));
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.toml");
        std::fs::write(&path, "threads = 2\nseed = 5\n").unwrap();

        let cli = Cli::try_parse_from([
            "testsuite",
            "--config",
            path.to_str().unwrap(),
            "--threads",
            "8",
        ])
        .unwrap();
        let config = cli.args.runner_config().unwrap();
        assert_eq!(config.threads, Some(8));
        assert_eq!(config.seed, 5);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let cli = Cli::try_parse_from([
            "testsuite",
            "--memcheck",
            "yes",
            "--threads",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.ignored, vec!["--memcheck", "yes"]);
        assert_eq!(cli.command, None);
        let config = cli.args.runner_config().unwrap();
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn test_unknown_key_alone() {
        let cli = Cli::try_parse_from(["testsuite", "--valgrind"]).unwrap();
        assert_eq!(cli.ignored, vec!["--valgrind"]);
        assert_eq!(cli.args.gt_args(), GtArgs::default());
    }

    #[test]
    fn test_invalid_values() {
        let cli = Cli::try_parse_from(["testsuite", "--threads", "0"]).unwrap();
        assert!(matches!(
            cli.args.runner_config(),
            Err(SuiteError::InvalidConfig { .. })
        ));

        assert!(Cli::try_parse_from(["testsuite", "--threads", "many"]).is_err());
    }
}
