//! Shrinkers and the built-in shrinking strategies.
//!
//! A shrinker maps a value to a finite, ordered list of strictly simpler
//! candidates. The input itself is never among them; the shrink search in
//! [`crate::execution`] relies on that to make progress.

use std::fmt;
use std::sync::Arc;

type ShrinkFn<T> = dyn Fn(&T) -> Vec<T> + Send + Sync;

/// A reusable shrinking strategy for values of type `T`
pub struct Shrinker<T> {
    run: Arc<ShrinkFn<T>>,
}

impl<T> Clone for Shrinker<T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<T> fmt::Debug for Shrinker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shrinker<{}>", std::any::type_name::<T>())
    }
}

impl<T: 'static> Shrinker<T> {
    /// Create a shrinker from a candidate function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&T) -> Vec<T> + Send + Sync + 'static,
    {
        Self { run: Arc::new(f) }
    }

    /// A shrinker that never proposes anything
    pub fn none() -> Self {
        Self::new(|_| Vec::new())
    }

    /// Candidates for `value`, simplest first
    pub fn shrink(&self, value: &T) -> Vec<T> {
        (self.run)(value)
    }

    /// Keep only the candidates accepted by `predicate`
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::new(move |value| {
            let mut candidates = self.shrink(value);
            candidates.retain(|candidate| predicate(candidate));
            candidates
        })
    }
}

/// Built-in shrinking strategies used by the default `Arbitrary` instances
pub mod strategies {
    use num_traits::{Float, PrimInt, Signed, Unsigned};

    /// Signed integer shrinking towards zero.
    ///
    /// Proposes the positive mirror of a negative value, then zero, then
    /// `x - x/2, x - x/4, ..., x - 1`: every candidate is strictly closer to
    /// zero than `x`, and the last one is its immediate neighbour, so a
    /// greedy search always lands on a boundary.
    pub fn signed_int_shrink<T>(value: &T) -> Vec<T>
    where
        T: PrimInt + Signed,
    {
        let x = *value;
        let zero = T::zero();
        let mut candidates = Vec::new();
        if x == zero {
            return candidates;
        }

        // Compare magnitudes on the non-positive side, where MIN fits.
        let toward_zero = |v: T| if v > zero { zero - v } else { v };

        if x < zero
            && let Some(positive) = zero.checked_sub(&x)
        {
            candidates.push(positive);
        }
        candidates.push(zero);

        let two = T::one() + T::one();
        let mut step = x / two;
        while step != zero {
            let candidate = x - step;
            if toward_zero(candidate) > toward_zero(x) {
                candidates.push(candidate);
            }
            step = step / two;
        }
        candidates
    }

    /// Unsigned integer shrinking towards zero: `0, x - x/2, ..., x - 1`
    pub fn unsigned_int_shrink<T>(value: &T) -> Vec<T>
    where
        T: PrimInt + Unsigned,
    {
        let x = *value;
        let zero = T::zero();
        let mut candidates = Vec::new();
        if x == zero {
            return candidates;
        }
        candidates.push(zero);

        let two = T::one() + T::one();
        let mut step = x / two;
        while step != zero {
            candidates.push(x - step);
            step = step / two;
        }
        candidates
    }

    /// Float shrinking towards zero, whole numbers and halves
    pub fn float_shrink<T>(value: &T) -> Vec<T>
    where
        T: Float,
    {
        let x = *value;
        let zero = T::zero();
        let one = T::one();

        if x.is_nan() {
            return vec![zero];
        }
        if x == zero {
            return Vec::new();
        }

        let mut candidates = vec![zero];
        if x < zero {
            candidates.push(-x);
        }
        if x.abs() > one {
            candidates.push(one.copysign(x));
        }
        let truncated = x.trunc();
        if truncated != x && truncated != zero && !candidates.contains(&truncated) {
            candidates.push(truncated);
        }
        let half = x / (one + one);
        if half != x && half != zero && x.is_finite() {
            candidates.push(half);
        }
        if x.is_infinite() {
            candidates.push(T::max_value().copysign(x));
        }
        candidates
    }

    /// Boolean shrinking - only try false if true
    pub fn bool_shrink(value: &bool) -> Vec<bool> {
        if *value { vec![false] } else { Vec::new() }
    }

    /// Character shrinking towards simple characters with smaller code points
    pub fn char_shrink(c: &char) -> Vec<char> {
        let mut candidates = Vec::new();

        for simple in ['a', 'b', 'c', 'A', '0', ' '] {
            if simple < *c {
                candidates.push(simple);
            }
        }

        let code = *c as u32;
        for step in [code / 2, code / 4, code / 8] {
            if step > 0
                && let Some(shrunk) = char::from_u32(step)
                && !candidates.contains(&shrunk)
            {
                candidates.push(shrunk);
            }
        }
        candidates
    }

    /// Collection shrinking: drop chunks of halving length, then shrink
    /// single elements in place with `element`
    pub fn collection_shrink<T, F>(collection: &[T], element: F) -> Vec<Vec<T>>
    where
        T: Clone,
        F: Fn(&T) -> Vec<T>,
    {
        let len = collection.len();
        let mut candidates = Vec::new();

        let mut chunk = len;
        while chunk > 0 {
            let mut start = 0;
            while start + chunk <= len {
                let mut shrunk = Vec::with_capacity(len - chunk);
                shrunk.extend_from_slice(&collection[..start]);
                shrunk.extend_from_slice(&collection[start + chunk..]);
                candidates.push(shrunk);
                start += chunk;
            }
            chunk /= 2;
        }

        for (index, item) in collection.iter().enumerate() {
            for smaller in element(item) {
                let mut shrunk = collection.to_vec();
                shrunk[index] = smaller;
                candidates.push(shrunk);
            }
        }
        candidates
    }

    /// String shrinking through its characters
    pub fn string_shrink(s: &str) -> Vec<String> {
        let chars: Vec<char> = s.chars().collect();
        collection_shrink(&chars, char_shrink)
            .into_iter()
            .map(|shrunk| shrunk.into_iter().collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;

    #[test]
    fn test_shrinker_none_and_new() {
        assert!(Shrinker::<u8>::none().shrink(&9).is_empty());

        let halves = Shrinker::new(|x: &u32| if *x > 0 { vec![x / 2] } else { vec![] });
        assert_eq!(halves.shrink(&10), vec![5]);
        assert_eq!(halves.clone().shrink(&0), Vec::<u32>::new());
    }

    #[test]
    fn test_shrinker_filter() {
        let shrinker = Shrinker::new(unsigned_int_shrink::<u32>).filter(|x| *x >= 10);
        assert!(shrinker.shrink(&40).iter().all(|x| *x >= 10));
        assert!(!shrinker.shrink(&40).is_empty());
    }

    #[test]
    fn test_signed_int_shrink_candidates() {
        assert_eq!(signed_int_shrink(&0i32), Vec::<i32>::new());
        assert_eq!(signed_int_shrink(&1i32), vec![0]);
        assert_eq!(signed_int_shrink(&60i32), vec![0, 30, 45, 53, 57, 59]);
        assert_eq!(signed_int_shrink(&-8i32), vec![8, 0, -4, -6, -7]);
    }

    #[test]
    fn test_signed_int_shrink_extremes() {
        let candidates = signed_int_shrink(&i64::MIN);
        assert!(!candidates.contains(&i64::MIN));
        assert_eq!(candidates[0], 0);

        let candidates = signed_int_shrink(&i8::MAX);
        assert!(candidates.iter().all(|c| c.abs() < i8::MAX));
    }

    #[test]
    fn test_signed_int_shrink_mirrors_negatives_in_every_width() {
        assert_eq!(signed_int_shrink(&-3i8)[..2], [3, 0]);
        assert_eq!(signed_int_shrink(&-3i16)[..2], [3, 0]);
        assert_eq!(signed_int_shrink(&-3i128)[..2], [3, 0]);

        // MIN has no positive mirror, so the list starts at zero.
        let candidates = signed_int_shrink(&i8::MIN);
        assert_eq!(candidates[0], 0);
        assert!(candidates.iter().all(|c| *c <= 0));
        assert_eq!(candidates.last(), Some(&(i8::MIN + 1)));
    }

    #[test]
    fn test_unsigned_int_shrink_candidates() {
        assert_eq!(unsigned_int_shrink(&0u8), Vec::<u8>::new());
        assert_eq!(unsigned_int_shrink(&100u64), vec![0, 50, 75, 88, 94, 97, 99]);
        assert!(!unsigned_int_shrink(&u128::MAX).contains(&u128::MAX));
    }

    #[test]
    fn test_int_shrink_never_proposes_input() {
        for x in -300i64..=300 {
            assert!(!signed_int_shrink(&x).contains(&x), "self loop at {}", x);
        }
        for x in 0u16..=600 {
            assert!(!unsigned_int_shrink(&x).contains(&x), "self loop at {}", x);
        }
    }

    #[test]
    fn test_float_shrink() {
        assert!(float_shrink(&0.0f64).is_empty());
        assert_eq!(float_shrink(&f64::NAN), vec![0.0]);

        let candidates = float_shrink(&-12.5f64);
        assert_eq!(candidates[0], 0.0);
        assert!(candidates.contains(&12.5));
        assert!(candidates.contains(&-1.0));
        assert!(candidates.contains(&-12.0));
        assert!(candidates.contains(&-6.25));

        for value in [1.5f32, -0.75, 1e30, f32::INFINITY, f32::MIN_POSITIVE] {
            assert!(!float_shrink(&value).contains(&value));
        }
    }

    #[test]
    fn test_bool_shrink() {
        assert_eq!(bool_shrink(&true), vec![false]);
        assert!(bool_shrink(&false).is_empty());
    }

    #[test]
    fn test_char_shrink() {
        assert!(char_shrink(&' ').is_empty() || char_shrink(&' ').iter().all(|c| *c < ' '));
        let candidates = char_shrink(&'z');
        assert_eq!(candidates[0], 'a');
        assert!(candidates.iter().all(|c| *c < 'z'));
        assert!(!char_shrink(&'a').contains(&'a'));
    }

    #[test]
    fn test_collection_shrink() {
        let empty: Vec<u8> = Vec::new();
        assert!(collection_shrink(&empty, unsigned_int_shrink).is_empty());

        let candidates = collection_shrink(&[3u8, 1], unsigned_int_shrink);
        assert_eq!(candidates[0], Vec::<u8>::new());
        assert!(candidates.contains(&vec![1]));
        assert!(candidates.contains(&vec![3]));
        assert!(candidates.contains(&vec![0, 1]));
        assert!(candidates.contains(&vec![3, 0]));
        assert!(!candidates.contains(&vec![3, 1]));
    }

    #[test]
    fn test_string_shrink() {
        let candidates = string_shrink("ba");
        assert_eq!(candidates[0], "");
        assert!(candidates.contains(&"a".to_string()));
        assert!(candidates.contains(&"b".to_string()));
        assert!(candidates.contains(&"aa".to_string()));
        assert!(!candidates.contains(&"ba".to_string()));
        assert!(string_shrink("").is_empty());
    }
}
