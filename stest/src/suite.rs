use crate::context::TestContext;
use crate::error::StepResult;
use crate::keywords::KeywordExpr;
use std::fmt;
use std::sync::Arc;

/// Body of a test: a sequence of steps against its context
pub type TestBody = dyn Fn(&mut TestContext) -> StepResult<()> + Send + Sync;

/// A named test with its keywords
#[derive(Clone)]
pub struct TestCase {
    name: String,
    keywords: String,
    body: Arc<TestBody>,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut TestContext) -> StepResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            keywords: String::new(),
            body: Arc::new(body),
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    pub fn body(&self) -> Arc<TestBody> {
        Arc::clone(&self.body)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("keywords", &self.keywords)
            .finish_non_exhaustive()
    }
}

/// Which tests to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub keywords: KeywordExpr,
    /// Explicit 1-based test numbers; empty means all
    pub numbers: Vec<usize>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn includes(&self, number: usize, case: &TestCase) -> bool {
        (self.numbers.is_empty() || self.numbers.contains(&number))
            && self.keywords.matches(case.keywords())
    }
}

/// Registry of test cases, numbered from 1 in registration order
#[derive(Debug)]
pub struct TestSuite {
    tests: Vec<TestCase>,
    nof_threads: usize,
}

impl TestSuite {
    pub fn new() -> Self {
        Self {
            tests: Vec::new(),
            nof_threads: 1,
        }
    }

    pub fn add(&mut self, case: TestCase) -> &mut Self {
        self.tests.push(case);
        self
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    /// Number of tests allowed to run at once
    pub fn nof_threads(&self) -> usize {
        self.nof_threads
    }

    pub fn set_nof_threads(&mut self, threads: usize) {
        self.nof_threads = threads.max(1);
    }

    /// Numbered tests that pass `selection`, in registration order.
    pub fn select(&self, selection: &Selection) -> Vec<(usize, &TestCase)> {
        self.tests
            .iter()
            .enumerate()
            .map(|(i, case)| (i + 1, case))
            .filter(|(number, case)| selection.includes(*number, case))
            .collect()
    }
}

impl Default for TestSuite {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite() -> TestSuite {
        let mut suite = TestSuite::new();
        suite
            .add(TestCase::new("first", |_| Ok(())).with_keywords("aragorn aragorn_to_gff3"))
            .add(TestCase::new("second", |_| Ok(())).with_keywords("ncrna infernal"))
            .add(TestCase::new("third", |_| Ok(())).with_keywords("aragorn"));
        suite
    }

    #[test]
    fn test_registration_order() {
        let suite = suite();
        assert_eq!(suite.len(), 3);
        assert!(!suite.is_empty());
        let names: Vec<&str> = suite.tests().iter().map(TestCase::name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_select_all() {
        let suite = suite();
        let selected = suite.select(&Selection::all());
        let numbers: Vec<usize> = selected.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_select_by_keyword_and_number() {
        let suite = suite();
        let selection = Selection {
            keywords: KeywordExpr::parse("aragorn").unwrap(),
            numbers: vec![],
        };
        let numbers: Vec<usize> = suite.select(&selection).iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 3]);

        let selection = Selection {
            keywords: KeywordExpr::parse("aragorn").unwrap(),
            numbers: vec![2, 3],
        };
        let numbers: Vec<usize> = suite.select(&selection).iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![3]);
    }

    #[test]
    fn test_nof_threads_at_least_one() {
        let mut suite = TestSuite::new();
        assert_eq!(suite.nof_threads(), 1);
        suite.set_nof_threads(8);
        assert_eq!(suite.nof_threads(), 8);
        suite.set_nof_threads(0);
        assert_eq!(suite.nof_threads(), 1);
    }

    #[test]
    fn test_debug_omits_body() {
        let case = TestCase::new("dbg", |_| Ok(())).with_keywords("k");
        let rendered = format!("{:?}", case);
        assert!(rendered.contains("dbg"));
        assert!(rendered.contains(".."));
    }
}
