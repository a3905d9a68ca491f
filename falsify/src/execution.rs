//! The driver: evaluates a property on fresh cases until enough pass, too
//! many are discarded, or one fails, then shrinks the failure.

use std::collections::BTreeSet;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, trace, warn};

use crate::cancel::{CancelOnDrop, CancelToken};
use crate::config::{CheckerConfig, ReplayToken, create_checker_config};
use crate::error::{CheckError, panic_message};
use crate::property::{Property, Rose, TestResult, Testable, Verdict};
use crate::report::{Report, Status};
use crate::rng::RandomSource;

/// Runs properties with a fixed configuration
#[derive(Debug, Clone)]
pub struct Checker {
    name: String,
    config: CheckerConfig,
    cancel: CancelToken,
}

impl Checker {
    /// Create a checker starting from the thread's global defaults
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: create_checker_config(),
            cancel: CancelToken::new(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: CheckerConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an externally controlled cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Token that cancels this checker's runs
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run `property` to a terminal state on the calling thread
    pub fn check<P: Testable>(&self, property: P) -> Result<Report, CheckError> {
        self.config.validate()?;
        Ok(self.drive(&property.property()))
    }

    /// Run `property` on a dedicated driver thread and await the report.
    ///
    /// The calling task is suspended rather than blocked while the run is in
    /// progress. Dropping the returned future cancels the run.
    pub fn check_async<P: Testable>(
        &self,
        property: P,
    ) -> impl Future<Output = Result<Report, CheckError>> + Send + 'static {
        let checker = self.clone();
        let property = property.property();
        async move {
            checker.config.validate()?;
            let (sender, receiver) = tokio::sync::oneshot::channel();
            let guard = CancelOnDrop::new(checker.cancel.clone());
            let spawned = std::thread::Builder::new()
                .name("falsify-driver".to_string())
                .spawn(move || {
                    let _ = sender.send(checker.drive(&property));
                });
            if let Err(e) = spawned {
                guard.disarm();
                return Err(CheckError::worker_lost(e.to_string()));
            }
            let report = receiver
                .await
                .map_err(|_| CheckError::worker_lost("driver thread exited without a report"));
            guard.disarm();
            report
        }
    }

    fn drive(&self, property: &Property) -> Report {
        let config = &self.config;
        let start = config
            .replay
            .map(|token| token.source())
            .unwrap_or_else(RandomSource::from_entropy);
        debug!(
            label = %self.name,
            seed = ?start.seed(),
            max_successful_tests = config.max_successful_tests,
            max_size = config.max_size,
            replay = config.replay.is_some(),
            "starting run"
        );

        let mut pinned = config.replay;
        let mut stream = match pinned {
            Some(_) => start.split().1,
            None => start,
        };
        let mut successes = 0;
        let mut discards = 0;
        let mut expect_failure = false;
        let mut labels = BTreeSet::new();

        while successes < config.max_successful_tests {
            if self.cancel.is_cancelled() {
                return self.cancelled(start, successes, discards);
            }

            let (case, size) = match pinned.take() {
                Some(token) => (token.source(), token.size),
                None => {
                    let (case, next) = stream.split();
                    stream = next;
                    (case, compute_size(config, successes, discards))
                }
            };

            let rose = self.evaluate(property, case, size);
            match rose.result.verdict {
                Verdict::Pass => {
                    successes += 1;
                    expect_failure |= rose.result.expect_failure;
                    labels.extend(rose.result.labels.iter().cloned());
                }
                Verdict::Discard => {
                    discards += 1;
                    if gives_up(config, successes, discards) {
                        debug!(label = %self.name, successes, discards, "discard ratio exceeded, giving up");
                        let mut report = Report::new(&self.name, Status::GaveUp, start.seed());
                        report.successes = successes;
                        report.discards = discards;
                        report.labels = labels;
                        report.reason = format!(
                            "Gave up after {} tests and {} discards",
                            successes, discards
                        );
                        return report;
                    }
                }
                Verdict::Fail if rose.result.aborted => {
                    return self.cancelled(start, successes, discards);
                }
                Verdict::Fail => {
                    let token = ReplayToken::new(case.seed(), size);
                    let mut report = self.failure(rose, token, start);
                    report.successes = successes;
                    report.discards = discards;
                    return report;
                }
            }
        }

        let mut report = Report::new(&self.name, Status::Passed, start.seed());
        report.successes = successes;
        report.discards = discards;
        report.labels = labels;
        if expect_failure {
            report.status = Status::Failed;
            report.reason = "passed but failure was expected".to_string();
        } else {
            report.reason = format!("OK, passed {} tests", successes);
        }
        debug!(label = %self.name, successes, discards, status = ?report.status, "run finished");
        report
    }

    fn evaluate(&self, property: &Property, case: RandomSource, size: usize) -> Rose {
        match catch_unwind(AssertUnwindSafe(|| property.run(case, size, &self.cancel))) {
            Ok(rose) => rose,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                Rose::leaf(TestResult::errored(
                    format!("Property panicked: \"{}\"", message),
                    message,
                ))
            }
        }
    }

    fn failure(&self, rose: Rose, token: ReplayToken, start: RandomSource) -> Report {
        debug!(
            label = %self.name,
            seed = ?token.seed,
            size = token.size,
            counterexample = ?rose.result.counterexamples,
            "found failing case, shrinking"
        );
        let search = self.shrink(rose);
        let result = search.result;

        let mut report = Report::new(&self.name, Status::Failed, start.seed());
        report.counterexample = result.counterexamples.clone();
        report.shrink_steps = search.steps;
        report.shrink_evaluations = search.evaluations;
        report.minimized = search.minimized;
        report.error = result.error.clone();
        report.labels = result.labels.clone();
        report.aborted = search.aborted;
        report.replay = Some(token);

        if result.expect_failure && !search.aborted {
            report.status = Status::Passed;
            report.failed_as_expected = true;
            report.reason = format!("Failed as expected: {}", result.reason);
        } else {
            report.reason = if search.aborted {
                format!("{} (cancelled while shrinking)", result.reason)
            } else {
                result.reason.clone()
            };
            result.notify_failure();
        }
        report
    }

    /// Greedy descent: adopt the first failing candidate, restart from its
    /// candidates, stop when none fails.
    fn shrink(&self, root: Rose) -> ShrinkSearch {
        let (mut best, mut candidates) = root.into_parts();
        let mut steps = 0;
        let mut evaluations = 0;

        loop {
            if self.cancel.is_cancelled() {
                debug!(label = %self.name, steps, evaluations, "cancelled while shrinking");
                return ShrinkSearch::interrupted(best, steps, evaluations, true);
            }
            let next = match catch_unwind(AssertUnwindSafe(|| candidates.next())) {
                Ok(next) => next,
                Err(payload) => {
                    warn!(
                        label = %self.name,
                        panic = %panic_message(payload.as_ref()),
                        "shrink candidate panicked outside the predicate, stopping search"
                    );
                    return ShrinkSearch::interrupted(best, steps, evaluations, false);
                }
            };
            let Some(candidate) = next else {
                return ShrinkSearch {
                    result: best,
                    steps,
                    evaluations,
                    minimized: true,
                    aborted: false,
                };
            };
            if evaluations >= self.config.max_shrinks {
                warn!(
                    label = %self.name,
                    max_shrinks = self.config.max_shrinks,
                    steps,
                    "shrink budget exhausted, counterexample may not be minimal"
                );
                return ShrinkSearch::interrupted(best, steps, evaluations, false);
            }
            evaluations += 1;

            let (result, children) = candidate.into_parts();
            if result.aborted {
                return ShrinkSearch::interrupted(best, steps, evaluations, true);
            }
            if result.is_failure() {
                steps += 1;
                trace!(step = steps, counterexample = ?result.counterexamples, "adopted smaller failing case");
                best = result;
                candidates = children;
            }
        }
    }

    fn cancelled(&self, start: RandomSource, successes: usize, discards: usize) -> Report {
        debug!(label = %self.name, successes, discards, "run cancelled");
        let mut report = Report::new(&self.name, Status::Failed, start.seed());
        report.successes = successes;
        report.discards = discards;
        report.aborted = true;
        report.minimized = false;
        report.reason = "Run was cancelled".to_string();
        report
    }
}

struct ShrinkSearch {
    result: TestResult,
    steps: usize,
    evaluations: usize,
    minimized: bool,
    aborted: bool,
}

impl ShrinkSearch {
    fn interrupted(result: TestResult, steps: usize, evaluations: usize, aborted: bool) -> Self {
        Self {
            result,
            steps,
            evaluations,
            minimized: false,
            aborted,
        }
    }
}

/// Size for the next case.
///
/// Sizes cycle through `0..max_size` in blocks of `max_size` passing cases;
/// when the final block is shorter it is stretched so it still reaches the
/// top. Every ten discards bump the size by one.
pub fn compute_size(config: &CheckerConfig, successes: usize, discards: usize) -> usize {
    let max_size = config.max_size.max(1);
    let max_success = config.max_successful_tests;
    let block_start = (successes / max_size) * max_size;

    let base = if block_start + max_size <= max_success
        || successes >= max_success
        || max_success % max_size == 0
    {
        successes % max_size
    } else {
        (successes % max_size) * max_size / (max_success % max_size)
    };
    (base + discards / 10).min(max_size)
}

/// Whether the discard ratio now ends the run.
///
/// Checked on every discard once `discard_warmup` cases were drawn.
pub fn gives_up(config: &CheckerConfig, successes: usize, discards: usize) -> bool {
    let drawn = successes + discards;
    drawn > 0
        && drawn >= config.discard_warmup
        && discards as f64 / drawn as f64 > config.max_discard_ratio
}

/// Check a property with the thread's default configuration
pub fn check<P: Testable>(property: P) -> Result<Report, CheckError> {
    Checker::new("property").check(property)
}

/// Check a property with a custom configuration
pub fn check_with_config<P: Testable>(
    property: P,
    config: CheckerConfig,
) -> Result<Report, CheckError> {
    Checker::new("property").with_config(config).check(property)
}
