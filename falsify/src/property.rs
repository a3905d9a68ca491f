//! Test results, shrink trees and the property type the driver evaluates.
//!
//! Evaluating a [`Property`] at a random source and size yields a [`Rose`]:
//! the result for the generated case plus a lazily expanded sequence of
//! shrink candidates, each of which is itself a rose. Nothing below the
//! root is evaluated until the shrink search pulls it.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::rng::RandomSource;

/// Outcome of evaluating a property once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The case satisfied the property
    Pass,
    /// The case falsified the property
    Fail,
    /// The case did not meet a precondition and is not counted
    Discard,
}

/// Callback run once with the final failing result of a run
pub type FailureCallback = Arc<dyn Fn(&TestResult) + Send + Sync>;

/// Result of evaluating a property on one generated case
#[derive(Clone)]
pub struct TestResult {
    /// Pass, fail or discard
    pub verdict: Verdict,
    /// Human-readable explanation, empty for plain passes
    pub reason: String,
    /// Text of an error or panic raised by the predicate
    pub error: Option<String>,
    /// Rendered arguments, outermost first
    pub counterexamples: Vec<String>,
    /// Labels attached while evaluating
    pub labels: BTreeSet<String>,
    /// The property is expected to fail
    pub expect_failure: bool,
    /// Evaluation was cut short by cancellation
    pub aborted: bool,
    callbacks: Vec<FailureCallback>,
}

impl TestResult {
    fn with_verdict(verdict: Verdict, reason: impl Into<String>) -> Self {
        Self {
            verdict,
            reason: reason.into(),
            error: None,
            counterexamples: Vec::new(),
            labels: BTreeSet::new(),
            expect_failure: false,
            aborted: false,
            callbacks: Vec::new(),
        }
    }

    /// A passing result
    pub fn passed() -> Self {
        Self::with_verdict(Verdict::Pass, "")
    }

    /// A failing result with the given reason
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::with_verdict(Verdict::Fail, reason)
    }

    /// A discarded result
    pub fn discarded() -> Self {
        Self::with_verdict(Verdict::Discard, "")
    }

    /// A failure caused by an error or panic inside the predicate
    pub fn errored(reason: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::failed(reason);
        result.error = Some(error.into());
        result
    }

    /// A failure caused by cancellation rather than by the predicate
    pub fn aborted(reason: impl Into<String>) -> Self {
        let mut result = Self::failed(reason);
        result.aborted = true;
        result
    }

    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn is_failure(&self) -> bool {
        self.verdict == Verdict::Fail
    }

    pub fn is_discard(&self) -> bool {
        self.verdict == Verdict::Discard
    }

    /// Put `text` in front of the existing counterexamples
    pub fn with_counterexample(mut self, text: impl Into<String>) -> Self {
        self.counterexamples.insert(0, text.into());
        self
    }

    /// Attach a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    /// Mark the result as coming from a property expected to fail
    pub fn expecting_failure(mut self) -> Self {
        self.expect_failure = true;
        self
    }

    /// Register a callback to run if this ends up as the reported failure
    pub fn on_failure(mut self, callback: FailureCallback) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Run the failure callbacks with this result
    pub(crate) fn notify_failure(&self) {
        for callback in &self.callbacks {
            callback(self);
        }
    }
}

impl fmt::Debug for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResult")
            .field("verdict", &self.verdict)
            .field("reason", &self.reason)
            .field("error", &self.error)
            .field("counterexamples", &self.counterexamples)
            .field("labels", &self.labels)
            .field("expect_failure", &self.expect_failure)
            .field("aborted", &self.aborted)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

type ResultMap = Arc<dyn Fn(TestResult) -> TestResult + Send + Sync>;

/// A result together with its lazily evaluated shrink candidates
pub struct Rose {
    /// Result at this node
    pub result: TestResult,
    children: Box<dyn Iterator<Item = Rose>>,
}

impl Rose {
    /// A node with no shrink candidates
    pub fn leaf(result: TestResult) -> Self {
        Self {
            result,
            children: Box::new(std::iter::empty()),
        }
    }

    /// A node whose candidates are produced on demand by `children`
    pub fn new<I>(result: TestResult, children: I) -> Self
    where
        I: Iterator<Item = Rose> + 'static,
    {
        Self {
            result,
            children: Box::new(children),
        }
    }

    /// Split into the node's result and its remaining candidates
    pub fn into_parts(self) -> (TestResult, Box<dyn Iterator<Item = Rose>>) {
        (self.result, self.children)
    }

    /// Apply `f` to this result and, lazily, to every result below it
    pub fn map_results(self, f: ResultMap) -> Rose {
        let result = f(self.result);
        let children = self.children.map(move |child| child.map_results(Arc::clone(&f)));
        Rose::new(result, children)
    }
}

impl fmt::Debug for Rose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rose")
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

type PropertyFn = dyn Fn(RandomSource, usize, &CancelToken) -> Rose + Send + Sync;

/// Something the driver can evaluate repeatedly at different random sources
#[derive(Clone)]
pub struct Property {
    run: Arc<PropertyFn>,
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Property")
    }
}

impl Property {
    /// Create a property from a raw evaluation function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(RandomSource, usize, &CancelToken) -> Rose + Send + Sync + 'static,
    {
        Self { run: Arc::new(f) }
    }

    /// A property that always yields `result`
    pub fn from_result(result: TestResult) -> Self {
        Self::new(move |_, _, _| Rose::leaf(result.clone()))
    }

    /// Evaluate the property for one case
    pub fn run(&self, source: RandomSource, size: usize, cancel: &CancelToken) -> Rose {
        (self.run)(source, size, cancel)
    }

    /// Transform every result this property produces, shrink candidates included
    pub fn map_result<F>(self, f: F) -> Property
    where
        F: Fn(TestResult) -> TestResult + Send + Sync + 'static,
    {
        let f: ResultMap = Arc::new(f);
        Property::new(move |source, size, cancel| {
            self.run(source, size, cancel).map_results(Arc::clone(&f))
        })
    }

    /// Attach extra counterexample text, shown before the generated arguments
    pub fn counterexample(self, text: impl Into<String>) -> Property {
        let text = text.into();
        self.map_result(move |result| result.with_counterexample(text.clone()))
    }

    /// Attach a label to every result
    pub fn label(self, label: impl Into<String>) -> Property {
        let label = label.into();
        self.map_result(move |result| result.with_label(label.clone()))
    }

    /// Invert expectations: the run succeeds only if a failure is found
    pub fn expect_failure(self) -> Property {
        self.map_result(TestResult::expecting_failure)
    }

    /// Run `callback` once with the final, shrunk failure
    pub fn when_fail<F>(self, callback: F) -> Property
    where
        F: Fn(&TestResult) + Send + Sync + 'static,
    {
        let callback: FailureCallback = Arc::new(callback);
        self.map_result(move |result| result.on_failure(Arc::clone(&callback)))
    }

    /// Both properties must hold. A failing side is returned with its shrink
    /// tree intact.
    pub fn and<P: Testable>(self, other: P) -> Property {
        let other = other.property();
        Property::new(move |source, size, cancel| {
            let (left_source, right_source) = source.split();
            let left = self.run(left_source, size, cancel);
            if left.result.is_failure() {
                return left;
            }
            let right = other.run(right_source, size, cancel);
            if right.result.is_failure() {
                return right;
            }
            let (left, _) = left.into_parts();
            let (right, _) = right.into_parts();
            let mut merged = if left.is_discard() || right.is_discard() {
                TestResult::discarded()
            } else {
                TestResult::passed()
            };
            merged.labels = left.labels.union(&right.labels).cloned().collect();
            merged.expect_failure = left.expect_failure || right.expect_failure;
            Rose::leaf(merged)
        })
    }

    /// At least one property must hold. A double failure is reported
    /// without shrink candidates.
    pub fn or<P: Testable>(self, other: P) -> Property {
        let other = other.property();
        Property::new(move |source, size, cancel| {
            let (left_source, right_source) = source.split();
            let left = self.run(left_source, size, cancel);
            if left.result.is_pass() {
                return left;
            }
            let right = other.run(right_source, size, cancel);
            if right.result.is_pass() {
                return right;
            }
            let (left, _) = left.into_parts();
            let (right, _) = right.into_parts();
            if !(left.is_failure() && right.is_failure()) {
                return Rose::leaf(TestResult::discarded());
            }
            let mut merged = TestResult::failed(format!("{}; {}", left.reason, right.reason));
            merged.error = left.error.clone().or_else(|| right.error.clone());
            merged.aborted = left.aborted || right.aborted;
            merged.expect_failure = left.expect_failure || right.expect_failure;
            merged.counterexamples = left
                .counterexamples
                .iter()
                .chain(right.counterexamples.iter())
                .cloned()
                .collect();
            merged.labels = left.labels.union(&right.labels).cloned().collect();
            merged.callbacks = left.callbacks.iter().chain(&right.callbacks).cloned().collect();
            Rose::leaf(merged)
        })
    }
}

/// Evaluate `property` only when `condition` holds; otherwise discard the case
pub fn implies<P: Testable>(condition: bool, property: P) -> Property {
    if condition {
        property.property()
    } else {
        Property::from_result(TestResult::discarded())
    }
}

/// Values a predicate may return
pub trait Testable {
    /// Convert into a property
    fn property(self) -> Property;
}

impl Testable for Property {
    fn property(self) -> Property {
        self
    }
}

impl Testable for TestResult {
    fn property(self) -> Property {
        Property::from_result(self)
    }
}

impl Testable for bool {
    fn property(self) -> Property {
        if self {
            TestResult::passed().property()
        } else {
            TestResult::failed("Falsifiable").property()
        }
    }
}

impl Testable for () {
    fn property(self) -> Property {
        TestResult::passed().property()
    }
}

impl<T, E> Testable for Result<T, E>
where
    T: Testable,
    E: fmt::Display,
{
    fn property(self) -> Property {
        match self {
            Ok(value) => value.property(),
            Err(error) => TestResult::errored(
                format!("Test case returned an error: \"{}\"", error),
                error.to_string(),
            )
            .property(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn root(property: &Property) -> TestResult {
        property
            .run(RandomSource::new(1, 2), 10, &CancelToken::new())
            .result
    }

    #[test]
    fn test_testable_conversions() {
        assert!(root(&true.property()).is_pass());
        assert!(root(&().property()).is_pass());

        let failed = root(&false.property());
        assert!(failed.is_failure());
        assert_eq!(failed.reason, "Falsifiable");

        assert!(root(&TestResult::discarded().property()).is_discard());
    }

    #[test]
    fn test_result_conversion_keeps_error_text() {
        let ok: Result<bool, String> = Ok(true);
        assert!(root(&ok.property()).is_pass());

        let err: Result<bool, String> = Err("disk on fire".to_string());
        let result = root(&err.property());
        assert!(result.is_failure());
        assert_eq!(result.error.as_deref(), Some("disk on fire"));
        assert!(result.reason.contains("disk on fire"));
    }

    #[test]
    fn test_counterexample_prepends() {
        let property = false
            .property()
            .counterexample("inner")
            .counterexample("outer");
        assert_eq!(root(&property).counterexamples, vec!["outer", "inner"]);
    }

    #[test]
    fn test_label_and_expect_failure() {
        let property = true.property().label("small").label("even").expect_failure();
        let result = root(&property);
        assert!(result.expect_failure);
        assert_eq!(
            result.labels.into_iter().collect::<Vec<_>>(),
            vec!["even".to_string(), "small".to_string()]
        );
    }

    #[test]
    fn test_and_combinator() {
        assert!(root(&true.property().and(true)).is_pass());
        assert!(root(&true.property().and(false)).is_failure());
        assert!(root(&false.property().and(true)).is_failure());
        assert!(root(&true.property().and(TestResult::discarded())).is_discard());
        assert!(root(&TestResult::discarded().property().and(false)).is_failure());

        let labelled = true.property().label("a").and(true.property().label("b"));
        assert_eq!(root(&labelled).labels.len(), 2);
    }

    #[test]
    fn test_and_short_circuits_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = Arc::clone(&calls);
            Property::new(move |_, _, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Rose::leaf(TestResult::passed())
            })
        };
        let _ = root(&false.property().and(counted));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_or_combinator() {
        assert!(root(&false.property().or(true)).is_pass());
        assert!(root(&true.property().or(false)).is_pass());
        assert!(root(&TestResult::discarded().property().or(false)).is_discard());

        let both = false
            .property()
            .counterexample("left")
            .or(false.property().counterexample("right"));
        let result = root(&both);
        assert!(result.is_failure());
        assert_eq!(result.counterexamples, vec!["left", "right"]);
    }

    #[test]
    fn test_implies_discards_on_false_precondition() {
        assert!(root(&implies(false, false)).is_discard());
        assert!(root(&implies(true, false)).is_failure());
        assert!(root(&implies(true, true)).is_pass());
    }

    #[test]
    fn test_when_fail_callbacks_attach_to_results() {
        let calls = Arc::new(AtomicUsize::new(0));
        let property = {
            let calls = Arc::clone(&calls);
            false.property().when_fail(move |result| {
                assert!(result.is_failure());
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        let result = root(&property);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        result.notify_failure();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_map_results_is_lazy_and_recursive() {
        let tree = Rose::new(
            TestResult::failed("root"),
            vec![Rose::leaf(TestResult::failed("child"))].into_iter(),
        );
        let mapped = tree.map_results(Arc::new(|r: TestResult| r.with_counterexample("x")));
        let (result, mut children) = mapped.into_parts();
        assert_eq!(result.counterexamples, vec!["x"]);
        let child = children.next().expect("one child");
        assert_eq!(child.result.counterexamples, vec!["x"]);
        assert_eq!(child.result.reason, "child");
        assert!(children.next().is_none());
    }

    #[test]
    fn test_aborted_and_errored_constructors() {
        let aborted = TestResult::aborted("cancelled");
        assert!(aborted.is_failure());
        assert!(aborted.aborted);

        let errored = TestResult::errored("bad", "boom");
        assert!(errored.is_failure());
        assert_eq!(errored.error.as_deref(), Some("boom"));
        assert!(!errored.aborted);
    }
}
