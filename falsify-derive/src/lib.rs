//! Derive macros for the falsify property testing engine
//!
//! This crate provides `#[derive(Arbitrary)]`, which implements
//! `falsify::Arbitrary` for structs and enums from the instances of their
//! fields.

use proc_macro::TokenStream;

mod derive;

/// Derive macro for implementing `falsify::Arbitrary`
///
/// Every field is generated from its own `Arbitrary` instance unless an
/// attribute says otherwise, and shrinking replaces one field at a time with
/// each of that field's shrink candidates.
///
/// # Basic Usage
///
/// ```rust
/// use falsify::Arbitrary;
///
/// #[derive(Debug, Clone, Arbitrary)]
/// struct User {
///     id: u32,
///     name: String,
///     active: bool,
/// }
/// ```
///
/// # Customization
///
/// ```rust
/// use falsify::{Arbitrary, Gen};
///
/// #[derive(Debug, Clone, Arbitrary)]
/// struct Reading {
///     #[arbitrary(range = "-40..=85")]
///     celsius: i16,
///     #[arbitrary(with = "sensor_names")]
///     sensor: String,
/// }
///
/// fn sensor_names() -> Gen<String> {
///     Gen::from_elements(vec!["north".to_string(), "south".to_string()]).unwrap()
/// }
/// ```
///
/// # Supported Attributes
///
/// - `range = "lo..=hi"` or `range = "lo..hi"`: numeric fields are drawn
///   uniformly from the range and only shrink to candidates inside it; an
///   empty or reversed range of literals is a compile error
/// - `with = "path"`: a `fn() -> Gen<FieldType>` supplies the field; such
///   fields are never shrunk
///
/// # Enums
///
/// Variants are picked uniformly. Values shrink within their variant, and
/// towards the first unit variant when the enum has one.
///
/// ```rust
/// use falsify::Arbitrary;
///
/// #[derive(Debug, Clone, Arbitrary)]
/// enum Command {
///     Stop,
///     Move { dx: i32, dy: i32 },
///     Say(String),
/// }
/// ```
#[proc_macro_derive(Arbitrary, attributes(arbitrary))]
pub fn derive_arbitrary(input: TokenStream) -> TokenStream {
    derive::derive_arbitrary_impl(input)
}
