//! `aragorn_to_gff3.lua`: tRNA predictions from ARAGORN output.

use super::{convert_expecting, empty_input, regular_file};
use stest::{TestCase, TestSuite};
use std::sync::Arc;
use toolchain::GtEnvironment;

const KEYWORDS: &str = "aragorn aragorn_to_gff3";
const SCRIPT: &str = "aragorn_to_gff3.lua";

pub fn register(suite: &mut TestSuite, gt: &Arc<GtEnvironment>) {
    let env = Arc::clone(gt);
    suite.add(
        TestCase::new("aragorn: aragorn_to_gff3 empty data", move |ctx| {
            empty_input(ctx, &env, SCRIPT, "aragorn.empty.gff3")
        })
        .with_keywords(KEYWORDS),
    );

    let env = Arc::clone(gt);
    suite.add(
        TestCase::new("aragorn: aragorn_to_gff3 regular file", move |ctx| {
            regular_file(ctx, &env, SCRIPT, "aragorn.gff3", "aragorn.out")
        })
        .with_keywords(KEYWORDS),
    );

    let env = Arc::clone(gt);
    suite.add(
        TestCase::new(
            "aragorn: aragorn_to_gff3 special case ('???' amino acid, '.XX' anticodon)",
            move |ctx| convert_expecting(ctx, &env, SCRIPT, "aragorn.unreliable_codons.out", 0),
        )
        .with_keywords(KEYWORDS),
    );

    let env = Arc::clone(gt);
    suite.add(
        TestCase::new(
            "aragorn: aragorn_to_gff3 malformed file (incomplete lines)",
            move |ctx| convert_expecting(ctx, &env, SCRIPT, "aragorn.malformed.out", 1),
        )
        .with_keywords(KEYWORDS),
    );

    let env = Arc::clone(gt);
    suite.add(
        TestCase::new(
            "aragorn: aragorn_to_gff3 malformed file (no seqs)",
            move |ctx| convert_expecting(ctx, &env, SCRIPT, "aragorn.malformed2.out", 1),
        )
        .with_keywords(KEYWORDS),
    );
}
