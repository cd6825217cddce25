//! Test definitions for the bundled Lua converters.
//!
//! Every converter gets the same treatment: empty input must produce the
//! empty golden file, a regular file must round-trip through
//! `gt gff3 -sort -tidy -retainids` to the normalised golden annotation and
//! validate, and malformed input must be rejected.

pub mod aragorn;
pub mod ncrna;

use stest::{CommandRecord, RunOptions, StepResult, TestContext, TestSuite};
use std::path::Path;
use std::sync::Arc;
use toolchain::GtEnvironment;

/// Register every suite in the order the driver reports them.
pub fn register_all(suite: &mut TestSuite, gt: &Arc<GtEnvironment>) {
    aragorn::register(suite, gt);
    ncrna::register(suite, gt);
}

/// Steps shared by the converter tests
pub trait GtSteps {
    /// Run a tool invocation with the debug allocator environment.
    fn run_test(&mut self, gt: &GtEnvironment, command: &str) -> StepResult<CommandRecord>;

    fn run_test_with(
        &mut self,
        gt: &GtEnvironment,
        command: &str,
        opts: RunOptions,
    ) -> StepResult<CommandRecord>;

    /// `diff` the previous command's stdout against `expected`.
    fn diff_last_stdout(&mut self, expected: &Path) -> StepResult<CommandRecord>;
}

impl GtSteps for TestContext {
    fn run_test(&mut self, gt: &GtEnvironment, command: &str) -> StepResult<CommandRecord> {
        self.run_test_with(gt, command, RunOptions::default())
    }

    fn run_test_with(
        &mut self,
        gt: &GtEnvironment,
        command: &str,
        opts: RunOptions,
    ) -> StepResult<CommandRecord> {
        self.run_with(&gt.debug_command(command), opts)
    }

    fn diff_last_stdout(&mut self, expected: &Path) -> StepResult<CommandRecord> {
        let stdout = self.last_stdout()?;
        self.run(&format!("diff {} {}", stdout.display(), expected.display()))
    }
}

/// Converting empty input yields exactly the empty golden file.
pub(crate) fn empty_input(
    ctx: &mut TestContext,
    gt: &GtEnvironment,
    script: &str,
    golden: &str,
) -> StepResult<()> {
    ctx.run_test(gt, &format!("echo '' | {}", gt.converter(script)))?;
    ctx.diff_last_stdout(&gt.testdata(golden))?;
    Ok(())
}

/// Convert `raw` and compare it, normalised, with the normalised `golden`
/// annotation; then validate the normalised conversion.
pub(crate) fn regular_file(
    ctx: &mut TestContext,
    gt: &GtEnvironment,
    script: &str,
    golden: &str,
    raw: &str,
) -> StepResult<()> {
    let normalise = format!("{} gff3 -sort -tidy -retainids", gt.gt());

    ctx.run(&format!(
        "{} {} > ref",
        normalise,
        gt.testdata(golden).display()
    ))?;
    ctx.run_test(
        gt,
        &format!("{} < {}", gt.converter(script), gt.testdata(raw).display()),
    )?;
    let converted = ctx.last_stdout()?;
    ctx.run(&format!("{} {} | tee gff3", normalise, converted.display()))?;
    let reference = ctx.path("ref");
    ctx.diff_last_stdout(&reference)?;
    ctx.run_test(gt, &format!("{} gff3validator gff3", gt.gt()))?;
    Ok(())
}

/// Feed `raw` to the converter and expect exit code `retval`.
pub(crate) fn convert_expecting(
    ctx: &mut TestContext,
    gt: &GtEnvironment,
    script: &str,
    raw: &str,
    retval: i32,
) -> StepResult<()> {
    ctx.run_test_with(
        gt,
        &format!("{} < {}", gt.converter(script), gt.testdata(raw).display()),
        RunOptions::new().with_retval(retval),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use toolchain::GtArgs;

    #[test]
    fn test_run_test_injects_allocator_env() {
        let dir = tempfile::tempdir().unwrap();
        let gt = GtEnvironment::resolve(&GtArgs::default(), dir.path());
        let mut ctx = TestContext::new(1, dir.path(), 0);

        ctx.run_test(&gt, "sh -c 'printf \"%s %s\" \"$G_DEBUG\" \"$G_SLICE\"'")
            .unwrap();
        assert_eq!(
            fs::read_to_string(ctx.last_stdout().unwrap()).unwrap(),
            "gc-friendly always-malloc"
        );
    }

    #[test]
    fn test_diff_last_stdout() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("golden"), "##gff-version 3\n").unwrap();
        let mut ctx = TestContext::new(1, dir.path(), 0);

        ctx.run("echo '##gff-version 3'").unwrap();
        ctx.diff_last_stdout(&dir.path().join("golden")).unwrap();

        ctx.run("echo '##gff-version 2'").unwrap();
        assert!(ctx.diff_last_stdout(&dir.path().join("golden")).is_err());
    }

    #[test]
    fn test_register_all_counts() {
        let gt = Arc::new(GtEnvironment::resolve(
            &GtArgs::default(),
            Path::new("/src/gt/testsuite"),
        ));
        let mut suite = TestSuite::new();
        register_all(&mut suite, &gt);

        assert_eq!(suite.len(), 7);
        assert!(suite.tests()[0].name().starts_with("aragorn:"));
        assert!(suite.tests()[6].name().starts_with("ncrna:"));
    }
}
