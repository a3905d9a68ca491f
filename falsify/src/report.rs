//! Structured outcome of a checking run.

use std::collections::BTreeSet;

use crate::config::ReplayToken;

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Enough cases passed, or an expected failure was found
    Passed,
    /// A counterexample was found, failure was expected but never seen, or
    /// the run was cancelled
    Failed,
    /// Too many cases were discarded
    GaveUp,
}

/// Everything a caller needs to judge and reproduce a run
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Name given to the checker
    pub label: String,
    pub status: Status,
    /// Number of passing cases
    pub successes: usize,
    /// Number of discarded cases
    pub discards: usize,
    /// Rendered arguments of the minimized failure, outermost first
    pub counterexample: Vec<String>,
    /// Shrink candidates adopted on the way to the reported counterexample
    pub shrink_steps: usize,
    /// Shrink candidates evaluated in total
    pub shrink_evaluations: usize,
    /// False when the shrink budget or cancellation cut the search short
    pub minimized: bool,
    /// Error or panic text raised by the failing case
    pub error: Option<String>,
    /// Why the run ended the way it did
    pub reason: String,
    /// Labels collected from the final case
    pub labels: BTreeSet<String>,
    /// A failure was found and the property expected one
    pub failed_as_expected: bool,
    /// The run was cancelled
    pub aborted: bool,
    /// Coordinates of the first failing case, before shrinking
    pub replay: Option<ReplayToken>,
    /// Seed pair the run started from
    pub seed: (u64, u64),
}

impl Report {
    pub(crate) fn new(label: impl Into<String>, status: Status, seed: (u64, u64)) -> Self {
        Self {
            label: label.into(),
            status,
            successes: 0,
            discards: 0,
            counterexample: Vec::new(),
            shrink_steps: 0,
            shrink_evaluations: 0,
            minimized: true,
            error: None,
            reason: String::new(),
            labels: BTreeSet::new(),
            failed_as_expected: false,
            aborted: false,
            replay: None,
            seed,
        }
    }

    /// True when the run ended in [`Status::Passed`]
    pub fn is_success(&self) -> bool {
        self.status == Status::Passed
    }

    pub fn is_failure(&self) -> bool {
        self.status == Status::Failed
    }

    pub fn gave_up(&self) -> bool {
        self.status == Status::GaveUp
    }
}
