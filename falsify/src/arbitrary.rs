//! Type-driven generation contract.

use std::fmt::Debug;

use crate::generator::Gen;
use crate::shrink::Shrinker;

/// Bounds every quantified value must meet.
///
/// Values are cloned into each shrink candidate's evaluation, rendered with
/// `Debug` for counterexamples, and may cross into the async bridge.
pub trait Value: Clone + Debug + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Debug + Send + Sync + 'static {}

/// Types with a default generator and shrinking strategy.
///
/// This is what lets `for_all(|x: T| ...)` pick its inputs from the type
/// alone. `#[derive(Arbitrary)]` implements it for structs and enums.
pub trait Arbitrary: Value {
    /// Default generator for this type
    fn arbitrary() -> Gen<Self>;

    /// Simpler variants of `self`, simplest first. Never contains `self`.
    fn shrink(&self) -> Vec<Self> {
        Vec::new()
    }

    /// [`Arbitrary::shrink`] as a reusable [`Shrinker`]
    fn shrinker() -> Shrinker<Self> {
        Shrinker::new(Self::shrink)
    }
}
