//! Error types for generator construction and checking runs.
//!
//! Failures of the property under test are not errors at this level; they
//! are ordinary results carried by [`crate::TestResult`] and
//! [`crate::Report`]. The types here cover misuse that prevents a run from
//! starting or finishing at all.

use std::any::Any;

use thiserror::Error;

use crate::config::ConfigError;

/// Misuse of a generator constructor, reported before any run starts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// `choose` was given a range with no values in it
    #[error("empty range: low {low} is greater than high {high}")]
    EmptyRange {
        /// Rendered lower bound
        low: String,
        /// Rendered upper bound
        high: String,
    },
    /// A choice combinator was given nothing to choose from
    #[error("cannot choose from an empty collection")]
    EmptyChoice,
    /// `frequency` was given weights that sum to zero
    #[error("frequency weights sum to zero")]
    ZeroWeights,
}

impl GenerationError {
    /// Create an empty-range error from the offending bounds
    pub fn empty_range(low: impl std::fmt::Debug, high: impl std::fmt::Debug) -> Self {
        Self::EmptyRange {
            low: format!("{:?}", low),
            high: format!("{:?}", high),
        }
    }
}

/// A checking run that could not produce a report
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    /// The checker was configured with invalid arguments
    #[error("invalid checker configuration: {0}")]
    Config(#[from] ConfigError),
    /// The thread driving an async check went away without a report
    #[error("driver worker lost: {reason}")]
    WorkerLost {
        /// What happened to the worker
        reason: String,
    },
}

impl CheckError {
    /// Create a worker-lost error
    pub fn worker_lost(reason: impl Into<String>) -> Self {
        Self::WorkerLost {
            reason: reason.into(),
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let error = GenerationError::empty_range(10, 1);
        assert_eq!(
            error.to_string(),
            "empty range: low 10 is greater than high 1"
        );
        assert_eq!(
            GenerationError::EmptyChoice.to_string(),
            "cannot choose from an empty collection"
        );
        assert_eq!(
            GenerationError::ZeroWeights.to_string(),
            "frequency weights sum to zero"
        );
    }

    #[test]
    fn test_check_error_from_config_error() {
        let error: CheckError = ConfigError::InvalidMaxSize(0).into();
        assert!(matches!(error, CheckError::Config(ConfigError::InvalidMaxSize(0))));
        assert!(error.to_string().contains("invalid checker configuration"));
    }

    #[test]
    fn test_worker_lost() {
        let error = CheckError::worker_lost("thread panicked");
        assert_eq!(error.to_string(), "driver worker lost: thread panicked");
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = std::panic::catch_unwind(|| panic!("value {}", 3)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "value 3");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(17u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
