//! Composable value generators.
//!
//! A [`Gen<T>`] is a pure function from a [`RandomSource`] and a size to a
//! value. Every combinator here splits the incoming source before handing
//! pieces to sub-generators, so no two generators ever draw from the same
//! state and the whole tree stays reproducible from a single seed.

use std::fmt;
use std::sync::Arc;

use rand::distributions::uniform::SampleUniform;

use crate::error::GenerationError;
use crate::rng::RandomSource;

/// Largest size used by [`Gen::sample`]
pub const DEFAULT_SAMPLE_SIZE: usize = 30;

/// Number of attempts [`Gen::such_that_optional`] makes before giving up
pub const MAX_FILTER_ATTEMPTS: usize = 100;

type GenFn<T> = dyn Fn(RandomSource, usize) -> T + Send + Sync;

/// A reusable recipe for producing values of type `T`
pub struct Gen<T> {
    run: Arc<GenFn<T>>,
}

impl<T> Clone for Gen<T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<T> fmt::Debug for Gen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen<{}>", std::any::type_name::<T>())
    }
}

/// A generated value together with the coordinates that reproduce it
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase<T> {
    /// The generated value
    pub value: T,
    /// Source the value was drawn from
    pub source: RandomSource,
    /// Size the value was drawn at
    pub size: usize,
}

impl<T: 'static> Gen<T> {
    /// Create a generator from a raw generation function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(RandomSource, usize) -> T + Send + Sync + 'static,
    {
        Self { run: Arc::new(f) }
    }

    /// Run the generator
    pub fn generate(&self, source: RandomSource, size: usize) -> T {
        (self.run)(source, size)
    }

    /// Run the generator and keep the coordinates of the result
    pub fn sample_case(&self, source: RandomSource, size: usize) -> TestCase<T> {
        TestCase {
            value: self.generate(source, size),
            source,
            size,
        }
    }

    /// Draw `count` values at growing sizes, each from its own split
    pub fn sample(&self, count: usize, source: RandomSource) -> Vec<T> {
        let mut values = Vec::with_capacity(count);
        let mut stream = source;
        for index in 0..count {
            let (now, next) = stream.split();
            stream = next;
            values.push(self.generate(now, (index * 2).min(DEFAULT_SAMPLE_SIZE)));
        }
        values
    }

    /// Build a generator from the current size
    pub fn sized<F>(f: F) -> Self
    where
        F: Fn(usize) -> Gen<T> + Send + Sync + 'static,
    {
        Gen::new(move |source, size| f(size).generate(source, size))
    }

    /// Run with a fixed size, ignoring the size the caller passes
    pub fn resize(self, size: usize) -> Self {
        Gen::new(move |source, _| self.generate(source, size))
    }

    /// Run with the caller's size transformed by `f`
    pub fn scale<F>(self, f: F) -> Self
    where
        F: Fn(usize) -> usize + Send + Sync + 'static,
    {
        Gen::new(move |source, size| self.generate(source, f(size)))
    }

    /// Transform every generated value
    pub fn map<U, F>(self, f: F) -> Gen<U>
    where
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Gen::new(move |source, size| f(self.generate(source, size)))
    }

    /// Choose the next generator from a generated value.
    ///
    /// The continuation's generator runs on the second half of a split.
    pub fn flat_map<U, F>(self, f: F) -> Gen<U>
    where
        U: 'static,
        F: Fn(T) -> Gen<U> + Send + Sync + 'static,
    {
        Gen::new(move |source, size| {
            let (first, rest) = source.split();
            f(self.generate(first, size)).generate(rest, size)
        })
    }

    /// Pair this generator with another
    pub fn zip<U: 'static>(self, other: Gen<U>) -> Gen<(T, U)> {
        Gen::new(move |source, size| {
            let (left, right) = source.split();
            (self.generate(left, size), other.generate(right, size))
        })
    }

    /// Retry until `predicate` holds, giving `None` after
    /// [`MAX_FILTER_ATTEMPTS`]. The size grows by one on every retry.
    pub fn such_that_optional<P>(self, predicate: P) -> Gen<Option<T>>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Gen::new(move |source, size| {
            let mut stream = source;
            for attempt in 0..MAX_FILTER_ATTEMPTS {
                let (now, next) = stream.split();
                stream = next;
                let candidate = self.generate(now, size + attempt);
                if predicate(&candidate) {
                    return Some(candidate);
                }
            }
            None
        })
    }

    /// Vectors whose length is drawn from `0..=size`
    pub fn vec_of(self) -> Gen<Vec<T>> {
        Gen::new(move |source, size| {
            let (len, rest) = source.bounded(0, size);
            fill(&self, len, rest, size)
        })
    }

    /// Vectors of exactly `len` elements
    pub fn vec_of_len(self, len: usize) -> Gen<Vec<T>> {
        Gen::new(move |source, size| fill(&self, len, source, size))
    }

    /// Vectors whose length is drawn from `1..=max(size, 1)`
    pub fn non_empty_vec_of(self) -> Gen<Vec<T>> {
        Gen::new(move |source, size| {
            let (len, rest) = source.bounded(1, size.max(1));
            fill(&self, len, rest, size)
        })
    }

    /// Build a record field by field.
    ///
    /// Each [`GenComposer::generate`] call inside `f` draws from a fresh
    /// split, so adding or reordering fields never perturbs the others'
    /// streams more than the split order implies.
    pub fn compose<F>(f: F) -> Self
    where
        F: Fn(&mut GenComposer) -> T + Send + Sync + 'static,
    {
        Gen::new(move |source, size| {
            let mut composer = GenComposer { source, size };
            f(&mut composer)
        })
    }
}

fn fill<T: 'static>(element: &Gen<T>, len: usize, source: RandomSource, size: usize) -> Vec<T> {
    let mut values = Vec::with_capacity(len);
    let mut stream = source;
    for _ in 0..len {
        let (now, next) = stream.split();
        stream = next;
        values.push(element.generate(now, size));
    }
    values
}

impl<T: Clone + Send + Sync + 'static> Gen<T> {
    /// Always produce `value`
    pub fn constant(value: T) -> Self {
        Gen::new(move |_, _| value.clone())
    }

    /// Pick uniformly among `values`
    pub fn from_elements(values: Vec<T>) -> Result<Self, GenerationError> {
        if values.is_empty() {
            return Err(GenerationError::EmptyChoice);
        }
        let last = values.len() - 1;
        Ok(Gen::new(move |source, _| {
            let (index, _) = source.bounded(0, last);
            values[index].clone()
        }))
    }
}

impl<T> Gen<T>
where
    T: SampleUniform + PartialOrd + Copy + fmt::Debug + Send + Sync + 'static,
{
    /// Uniform values in the inclusive range `[low, high]`
    pub fn choose(low: T, high: T) -> Result<Self, GenerationError> {
        if low > high {
            return Err(GenerationError::empty_range(low, high));
        }
        Ok(Gen::new(move |source, _| source.bounded(low, high).0))
    }
}

/// Pick one generator uniformly and run it
pub fn one_of<T: 'static>(generators: Vec<Gen<T>>) -> Result<Gen<T>, GenerationError> {
    if generators.is_empty() {
        return Err(GenerationError::EmptyChoice);
    }
    let last = generators.len() - 1;
    Ok(Gen::new(move |source, size| {
        let (pick, rest) = source.split();
        let (index, _) = pick.bounded(0, last);
        generators[index].generate(rest, size)
    }))
}

/// Pick a generator with probability proportional to its weight
pub fn frequency<T: 'static>(weighted: Vec<(u32, Gen<T>)>) -> Result<Gen<T>, GenerationError> {
    if weighted.is_empty() {
        return Err(GenerationError::EmptyChoice);
    }
    let total: u64 = weighted.iter().map(|(weight, _)| u64::from(*weight)).sum();
    if total == 0 {
        return Err(GenerationError::ZeroWeights);
    }
    Ok(Gen::new(move |source, size| {
        let (pick, rest) = source.split();
        let (mut target, _) = pick.bounded(1, total);
        for (weight, generator) in &weighted {
            let weight = u64::from(*weight);
            if target <= weight {
                return generator.generate(rest, size);
            }
            target -= weight;
        }
        // Unreachable while target <= total; fall back to the last non-zero arm.
        let fallback = weighted
            .iter()
            .rev()
            .find(|(weight, _)| *weight > 0)
            .map(|(_, generator)| generator)
            .unwrap_or(&weighted[0].1);
        fallback.generate(rest, size)
    }))
}

/// Three generators side by side
pub fn zip3<A, B, C>(a: Gen<A>, b: Gen<B>, c: Gen<C>) -> Gen<(A, B, C)>
where
    A: 'static,
    B: 'static,
    C: 'static,
{
    a.zip(b.zip(c)).map(|(a, (b, c))| (a, b, c))
}

/// Four generators side by side
pub fn zip4<A, B, C, D>(a: Gen<A>, b: Gen<B>, c: Gen<C>, d: Gen<D>) -> Gen<(A, B, C, D)>
where
    A: 'static,
    B: 'static,
    C: 'static,
    D: 'static,
{
    a.zip(b.zip(c.zip(d))).map(|(a, (b, (c, d)))| (a, b, c, d))
}

/// Field-by-field builder handed to [`Gen::compose`]
#[derive(Debug)]
pub struct GenComposer {
    source: RandomSource,
    size: usize,
}

impl GenComposer {
    /// Run `generator` on a fresh split of the composer's source
    pub fn generate<U: 'static>(&mut self, generator: &Gen<U>) -> U {
        let (now, rest) = self.source.split();
        self.source = rest;
        generator.generate(now, self.size)
    }

    /// The size the record is being built at
    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> RandomSource {
        RandomSource::new(12345, 67890)
    }

    #[test]
    fn test_generation_is_deterministic() {
        let generator = Gen::choose(0i64, 1_000_000).unwrap().vec_of();
        assert_eq!(
            generator.generate(source(), 20),
            generator.generate(source(), 20)
        );
    }

    #[test]
    fn test_constant() {
        let generator = Gen::constant("fixed");
        assert_eq!(generator.sample(5, source()), vec!["fixed"; 5]);
    }

    #[test]
    fn test_choose_bounds_and_errors() {
        let generator = Gen::choose(1u8, 6).unwrap();
        for value in generator.sample(200, source()) {
            assert!((1..=6).contains(&value));
        }

        assert!(Gen::choose(3, 3).is_ok());
        assert_eq!(
            Gen::choose(10, 1).unwrap_err(),
            GenerationError::empty_range(10, 1)
        );
    }

    #[test]
    fn test_from_elements() {
        let generator = Gen::from_elements(vec!['a', 'b', 'c']).unwrap();
        for value in generator.sample(100, source()) {
            assert!("abc".contains(value));
        }
        assert_eq!(
            Gen::<u8>::from_elements(vec![]).unwrap_err(),
            GenerationError::EmptyChoice
        );
    }

    #[test]
    fn test_one_of_and_frequency_errors() {
        assert_eq!(
            one_of::<u8>(vec![]).unwrap_err(),
            GenerationError::EmptyChoice
        );
        assert_eq!(
            frequency::<u8>(vec![]).unwrap_err(),
            GenerationError::EmptyChoice
        );
        assert_eq!(
            frequency(vec![(0, Gen::constant(1u8)), (0, Gen::constant(2u8))]).unwrap_err(),
            GenerationError::ZeroWeights
        );
    }

    #[test]
    fn test_frequency_skips_zero_weights() {
        let generator =
            frequency(vec![(0, Gen::constant(1u8)), (3, Gen::constant(2u8))]).unwrap();
        assert!(generator.sample(100, source()).iter().all(|v| *v == 2));
    }

    #[test]
    fn test_one_of_uses_every_arm() {
        let generator = one_of(vec![Gen::constant(0u8), Gen::constant(1u8)]).unwrap();
        let values = generator.sample(200, source());
        assert!(values.contains(&0));
        assert!(values.contains(&1));
    }

    #[test]
    fn test_sized_resize_and_scale() {
        let generator = Gen::sized(Gen::constant);
        assert_eq!(generator.generate(source(), 17), 17);
        assert_eq!(generator.clone().resize(3).generate(source(), 17), 3);
        assert_eq!(generator.scale(|size| size * 2).generate(source(), 5), 10);
    }

    #[test]
    fn test_map_and_flat_map() {
        let doubled = Gen::choose(0u32, 10).unwrap().map(|x| x * 2);
        for value in doubled.sample(50, source()) {
            assert_eq!(value % 2, 0);
        }

        let dependent = Gen::choose(1usize, 5)
            .unwrap()
            .flat_map(|len| Gen::constant(7u8).vec_of_len(len));
        for value in dependent.sample(50, source()) {
            assert!((1..=5).contains(&value.len()));
            assert!(value.iter().all(|x| *x == 7));
        }
    }

    #[test]
    fn test_zip_uses_independent_streams() {
        let pair = Gen::choose(0u64, u64::MAX)
            .unwrap()
            .zip(Gen::choose(0u64, u64::MAX).unwrap());
        let (left, right) = pair.generate(source(), 10);
        assert_ne!(left, right);

        let (a, b, c) = zip3(Gen::constant(1), Gen::constant('x'), Gen::constant(true))
            .generate(source(), 0);
        assert_eq!((a, b, c), (1, 'x', true));

        let quad = zip4(
            Gen::constant(1u8),
            Gen::constant(2u16),
            Gen::constant(3u32),
            Gen::constant(4u64),
        );
        assert_eq!(quad.generate(source(), 0), (1, 2, 3, 4));
    }

    #[test]
    fn test_vec_of_is_size_bounded() {
        let generator = Gen::constant(0u8).vec_of();
        for size in [0, 1, 5, 40] {
            assert!(generator.generate(source(), size).len() <= size);
        }
        assert!(Gen::constant(0u8).vec_of().generate(source(), 0).is_empty());

        let non_empty = Gen::constant(0u8).non_empty_vec_of();
        assert_eq!(non_empty.generate(source(), 0).len(), 1);
        for value in non_empty.sample(50, source()) {
            assert!(!value.is_empty());
        }
    }

    #[test]
    fn test_such_that_optional() {
        let even = Gen::choose(0u32, 100)
            .unwrap()
            .such_that_optional(|x| x % 2 == 0);
        for value in even.sample(50, source()).into_iter().flatten() {
            assert_eq!(value % 2, 0);
        }

        let impossible = Gen::choose(0u32, 100).unwrap().such_that_optional(|x| *x > 100);
        assert_eq!(impossible.generate(source(), 10), None);
    }

    #[test]
    fn test_compose_builds_records() {
        #[derive(Debug, Clone, PartialEq)]
        struct Point {
            x: i32,
            y: i32,
            label: Vec<u8>,
        }

        let coordinate = Gen::choose(-10, 10).unwrap();
        let label = Gen::constant(1u8).vec_of();
        let generator = Gen::compose(move |c| Point {
            x: c.generate(&coordinate),
            y: c.generate(&coordinate),
            label: c.generate(&label),
        });

        let point = generator.generate(source(), 4);
        assert!((-10..=10).contains(&point.x));
        assert!((-10..=10).contains(&point.y));
        assert!(point.label.len() <= 4);
        assert_eq!(point, generator.generate(source(), 4));
    }

    #[test]
    fn test_composer_exposes_size() {
        let generator = Gen::compose(|c| c.size());
        assert_eq!(generator.generate(source(), 9), 9);
    }

    #[test]
    fn test_sample_case_records_coordinates() {
        let case = Gen::choose(0u16, 500).unwrap().sample_case(source(), 12);
        assert_eq!(case.source, source());
        assert_eq!(case.size, 12);
        assert_eq!(
            case.value,
            Gen::choose(0u16, 500).unwrap().generate(source(), 12)
        );
    }

    #[test]
    fn test_different_sources_give_different_samples() {
        let generator = Gen::choose(0u64, u64::MAX).unwrap();
        assert_ne!(
            generator.sample(10, RandomSource::new(1, 2)),
            generator.sample(10, RandomSource::new(3, 4))
        );
    }
}
