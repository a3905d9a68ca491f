#![allow(clippy::too_many_arguments)]

//! # Falsify - Property-Based Testing for Rust
//!
//! Falsify samples inputs from composable generators, evaluates a predicate
//! on them, shrinks the first failure to a locally minimal counterexample,
//! and records the exact seed and size so the failure can be replayed.
//! Predicates may be synchronous or `async`; async predicates are driven to
//! completion through a bridge onto a tokio scheduler.
//!
//! ## Quick Start
//!
//! ```rust
//! use falsify::{Checker, CheckerConfig, Gen, Status, for_all_gen};
//!
//! let property = for_all_gen(Gen::choose(1i64, 100).unwrap(), |x| x <= 50);
//! let report = Checker::new("at most fifty")
//!     .with_config(CheckerConfig::default().with_replay((12345, 67890), 10))
//!     .check(property)
//!     .unwrap();
//!
//! assert_eq!(report.status, Status::Failed);
//! assert_eq!(report.counterexample, vec!["51"]);
//! ```
//!
//! ## Async predicates
//!
//! ```rust
//! use falsify::{Checker, for_all_async};
//!
//! let property = for_all_async(|x: u32| async move {
//!     tokio::task::yield_now().await;
//!     x.checked_mul(2).is_some()
//! });
//! assert!(Checker::new("doubling").check(property).unwrap().is_success());
//! ```

// Generated code from the derive macro refers to `falsify::...`.
extern crate self as falsify;

// Public modules
pub mod arbitrary;
pub mod bridge;
pub mod cancel;
pub mod config;
pub mod error;
pub mod execution;
pub mod for_all;
pub mod generator;
pub mod primitives;
pub mod property;
pub mod report;
pub mod rng;
pub mod shrink;

// Re-export the main public API
pub use arbitrary::{Arbitrary, Value};
pub use bridge::{Bridge, Outcome};
pub use cancel::CancelToken;
pub use config::{
    CheckerConfig, ConfigError, ConfigManager, GlobalConfig, ReplayToken, create_checker_config,
    get_global_config, set_global_config,
};
pub use error::{CheckError, GenerationError};
pub use execution::{Checker, check, check_with_config};
pub use for_all::*;
pub use generator::{Gen, GenComposer, TestCase, frequency, one_of, zip3, zip4};
pub use property::{Property, Rose, TestResult, Testable, Verdict, implies};
pub use report::{Report, Status};
pub use rng::RandomSource;
pub use shrink::Shrinker;

// Re-export derive macro from separate crate when derive feature is enabled
#[cfg(feature = "derive")]
pub use falsify_derive::Arbitrary;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CheckerConfig::default();
        assert_eq!(config.max_successful_tests, 100);
        assert_eq!(config.max_shrinks, 1000);
        assert!(config.replay.is_none());
    }

    #[test]
    fn test_public_api_integration() {
        let generator = Gen::constant(42).zip(Gen::choose(1, 10).unwrap());
        let (left, right) = generator.generate(RandomSource::new(1, 2), 10);
        assert_eq!(left, 42);
        assert!((1..=10).contains(&right));
    }

    #[test]
    fn test_public_check_api() {
        let report = Checker::new("commutative addition")
            .check(for_all2(|a: i32, b: i32| a.wrapping_add(b) == b.wrapping_add(a)))
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.successes, 100);
    }
}
