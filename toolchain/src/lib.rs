//! Locating the tool under test.
//!
//! The testsuite drives the `gt` binary and the Lua converters that ship in
//! its `bin/` directory. Everything here is resolved relative to the
//! directory the driver is started from (normally `<root>/testsuite`), with
//! optional overrides for the command prefix and the binary directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Environment variables injected into every tool invocation so that GLib
/// uses plain `malloc` and debug-friendly allocation.
pub const DEBUG_ALLOCATOR_ENV: [(&str, &str); 2] =
    [("G_DEBUG", "gc-friendly"), ("G_SLICE", "always-malloc")];

/// Errors related to resolving the toolchain layout
#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("Could not determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

pub type ToolchainResult<T> = Result<T, ToolchainError>;

/// Raw location overrides, as given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GtArgs {
    /// Prefix prepended to every debug-wrapped command
    pub path: Option<String>,
    /// Directory holding the `gt` binary
    pub bin: Option<String>,
    /// Override for the "current" directory
    pub cur: Option<String>,
}

impl GtArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = Some(bin.into());
        self
    }

    pub fn with_cur(mut self, cur: impl Into<String>) -> Self {
        self.cur = Some(cur.into());
        self
    }
}

/// Resolved locations of the binary, its scripts and the fixtures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GtEnvironment {
    /// Command prefix, empty or ending in `/`
    pub path_prefix: String,
    /// Binary directory prefix, empty or ending in `/`
    pub bin_prefix: String,
    pub cur: PathBuf,
    pub root_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub testdata_dir: PathBuf,
}

impl GtEnvironment {
    /// Resolve against an explicit working directory, normally
    /// [`current_dir`].
    pub fn resolve(args: &GtArgs, cwd: &Path) -> Self {
        let parent = cwd.join("..");
        let cur = match &args.cur {
            Some(cur) => PathBuf::from(cur),
            None => parent.clone(),
        };

        let env = Self {
            path_prefix: dir_prefix(args.path.as_deref()),
            bin_prefix: dir_prefix(args.bin.as_deref()),
            cur,
            root_dir: parent.join(".."),
            bin_dir: parent.join("..").join("bin"),
            testdata_dir: parent.join("testdata"),
        };
        debug!(?env, "Resolved gt environment");
        env
    }

    /// The `gt` executable, honouring the binary directory prefix
    pub fn gt(&self) -> String {
        format!("{}gt", self.bin_prefix)
    }

    /// A script from the distribution's `bin/` directory
    pub fn script(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name)
    }

    /// A fixture from the `testdata/` directory
    pub fn testdata(&self, name: &str) -> PathBuf {
        self.testdata_dir.join(name)
    }

    /// Wrap a command so the tool runs with the debug allocator settings.
    pub fn debug_command(&self, command: &str) -> String {
        let assignments: Vec<String> = DEBUG_ALLOCATOR_ENV
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        format!(
            "env {} {}{}",
            assignments.join(" "),
            self.path_prefix,
            command
        )
    }

    /// `gt <script>` for one of the bundled Lua converters
    pub fn converter(&self, script: &str) -> String {
        format!("{} {}", self.gt(), self.script(script).display())
    }
}

/// The directory the driver was started from
pub fn current_dir() -> ToolchainResult<PathBuf> {
    std::env::current_dir().map_err(ToolchainError::CurrentDir)
}

/// Name of the host operating system as reported by `uname -s`
pub fn system_name() -> String {
    match Command::new("uname").arg("-s").output() {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim_end().to_string()
        }
        _ => std::env::consts::OS.to_string(),
    }
}

/// Directory-prefix semantics: a given value always ends in a separator,
/// an absent or empty one yields no prefix at all.
fn dir_prefix(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => {
            if v.ends_with('/') {
                v.to_string()
            } else {
                format!("{}/", v)
            }
        }
        _ => String::new(),
    }
}
