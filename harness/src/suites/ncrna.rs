//! `infernal_to_gff3.lua`: ncRNA hits from Infernal tabular output.

use super::{empty_input, regular_file};
use stest::{TestCase, TestSuite};
use std::sync::Arc;
use toolchain::GtEnvironment;

const KEYWORDS: &str = "ncrna infernal infernal_to_gff3";
const SCRIPT: &str = "infernal_to_gff3.lua";

pub fn register(suite: &mut TestSuite, gt: &Arc<GtEnvironment>) {
    let env = Arc::clone(gt);
    suite.add(
        TestCase::new("ncrna: empty data", move |ctx| {
            empty_input(ctx, &env, SCRIPT, "infernal.empty.gff3")
        })
        .with_keywords(KEYWORDS),
    );

    let env = Arc::clone(gt);
    suite.add(
        TestCase::new("ncrna: infernal_to_gff3 regular file", move |ctx| {
            regular_file(ctx, &env, SCRIPT, "infernal.gff3", "infernal.out")
        })
        .with_keywords(KEYWORDS),
    );

    // TODO: malformed Infernal input cases once fixtures for truncated hit
    // tables exist in testdata/.
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use toolchain::GtArgs;

    #[test]
    fn test_registers_ncrna_tests() {
        let gt = Arc::new(GtEnvironment::resolve(&GtArgs::default(), Path::new("/t")));
        let mut suite = TestSuite::new();
        register(&mut suite, &gt);

        let names: Vec<&str> = suite.tests().iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["ncrna: empty data", "ncrna: infernal_to_gff3 regular file"]
        );
    }
}
