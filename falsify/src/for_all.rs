//! Universal quantification: turning predicates over generated values into
//! properties.
//!
//! `for_all_shrink` is the primitive. It generates a value, evaluates the
//! body on it, and exposes every shrink candidate of the value as a child of
//! the result, ahead of whatever candidates the body's own property offers
//! for inner arguments. Multi-argument forms nest the single-argument one,
//! so the outermost argument owns the first shrink candidates and inner
//! arguments are re-generated from the same random source when an outer
//! argument shrinks.
//!
//! The `*_async` forms take bodies returning futures and run them through
//! the [`Bridge`]; only the innermost argument's evaluation suspends.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::arbitrary::{Arbitrary, Value};
use crate::bridge::{Bridge, Outcome};
use crate::cancel::CancelToken;
use crate::error::panic_message;
use crate::generator::Gen;
use crate::property::{Property, Rose, TestResult, Testable};
use crate::rng::RandomSource;
use crate::shrink::Shrinker;

type Body<T> = dyn Fn(T, &CancelToken) -> Property + Send + Sync;

fn quantify<T: Value>(generator: Gen<T>, shrinker: Shrinker<T>, body: Arc<Body<T>>) -> Property {
    Property::new(move |source, size, cancel| {
        let (value_source, body_source) = source.split();
        let value = generator.generate(value_source, size);
        let evaluator: Evaluator<T> = {
            let body = Arc::clone(&body);
            Arc::new(move |value: T, cancel: &CancelToken| {
                evaluate(body.as_ref(), value, body_source, size, cancel)
            })
        };
        shrinking(shrinker.clone(), value, evaluator, cancel.clone())
    })
}

type Evaluator<T> = Arc<dyn Fn(T, &CancelToken) -> Rose + Send + Sync>;

/// Evaluate the body on `value`, rendering it in front of the counterexamples
fn evaluate<T: Value>(
    body: &Body<T>,
    value: T,
    source: RandomSource,
    size: usize,
    cancel: &CancelToken,
) -> Rose {
    let rendered = format!("{:?}", value);
    let rose = match catch_unwind(AssertUnwindSafe(|| body(value, cancel).run(source, size, cancel))) {
        Ok(rose) => rose,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            Rose::leaf(TestResult::errored(
                format!("Test case panicked: \"{}\"", message),
                message,
            ))
        }
    };
    rose.map_results(Arc::new(move |result: TestResult| {
        result.with_counterexample(rendered.clone())
    }))
}

/// The rose for `value`: its own result, then its shrink candidates, then
/// the candidates of inner arguments.
fn shrinking<T: Value>(
    shrinker: Shrinker<T>,
    value: T,
    evaluate: Evaluator<T>,
    cancel: CancelToken,
) -> Rose {
    let (result, inner) = evaluate(value.clone(), &cancel).into_parts();
    let outer = std::iter::once(()).flat_map(move |_| {
        let shrinker = shrinker.clone();
        let evaluate = Arc::clone(&evaluate);
        let cancel = cancel.clone();
        shrinker
            .shrink(&value)
            .into_iter()
            .map(move |candidate| {
                shrinking(shrinker.clone(), candidate, Arc::clone(&evaluate), cancel.clone())
            })
    });
    Rose::new(result, outer.chain(inner))
}

fn bridged<P: Testable>(outcome: Outcome<P>) -> Property {
    match outcome {
        Outcome::Completed(testable) => testable.property(),
        Outcome::Panicked(message) => TestResult::errored(
            format!("Test case panicked: \"{}\"", message),
            message,
        )
        .property(),
        Outcome::Cancelled => TestResult::aborted("Test case was cancelled").property(),
        Outcome::Unavailable(reason) => TestResult::errored(
            format!("Async scheduler unavailable: \"{}\"", reason),
            reason,
        )
        .property(),
    }
}

/// Quantify over values from `generator`, shrinking with `shrinker`
pub fn for_all_shrink<T, P, F>(generator: Gen<T>, shrinker: Shrinker<T>, body: F) -> Property
where
    T: Value,
    P: Testable,
    F: Fn(T) -> P + Send + Sync + 'static,
{
    quantify(
        generator,
        shrinker,
        Arc::new(move |value: T, _: &CancelToken| body(value).property()),
    )
}

/// Quantify over values from `generator` without shrinking failures
pub fn for_all_no_shrink<T, P, F>(generator: Gen<T>, body: F) -> Property
where
    T: Value,
    P: Testable,
    F: Fn(T) -> P + Send + Sync + 'static,
{
    for_all_shrink(generator, Shrinker::none(), body)
}

/// Quantify over values from `generator`, shrinking with the type's
/// [`Arbitrary::shrink`]
pub fn for_all_gen<A, P, F>(generator: Gen<A>, body: F) -> Property
where
    A: Arbitrary,
    P: Testable,
    F: Fn(A) -> P + Send + Sync + 'static,
{
    for_all_shrink(generator, A::shrinker(), body)
}

/// Quantify over arbitrary values of the body's argument type
pub fn for_all<A, P, F>(body: F) -> Property
where
    A: Arbitrary,
    P: Testable,
    F: Fn(A) -> P + Send + Sync + 'static,
{
    for_all_gen(A::arbitrary(), body)
}

/// Async [`for_all_shrink`] running the body on an explicit bridge
pub fn for_all_shrink_async_on<T, P, Fut, F>(
    bridge: Bridge,
    generator: Gen<T>,
    shrinker: Shrinker<T>,
    body: F,
) -> Property
where
    T: Value,
    P: Testable + Send + 'static,
    Fut: Future<Output = P> + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
{
    quantify(
        generator,
        shrinker,
        Arc::new(move |value: T, cancel: &CancelToken| bridged(bridge.run(body(value), cancel))),
    )
}

/// Async [`for_all_shrink`] on the shared scheduler
pub fn for_all_shrink_async<T, P, Fut, F>(
    generator: Gen<T>,
    shrinker: Shrinker<T>,
    body: F,
) -> Property
where
    T: Value,
    P: Testable + Send + 'static,
    Fut: Future<Output = P> + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
{
    for_all_shrink_async_on(Bridge::shared(), generator, shrinker, body)
}

/// Async [`for_all_gen`]
pub fn for_all_gen_async<A, P, Fut, F>(generator: Gen<A>, body: F) -> Property
where
    A: Arbitrary,
    P: Testable + Send + 'static,
    Fut: Future<Output = P> + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
{
    for_all_shrink_async(generator, A::shrinker(), body)
}

/// Async [`for_all`]
pub fn for_all_async<A, P, Fut, F>(body: F) -> Property
where
    A: Arbitrary,
    P: Testable + Send + 'static,
    Fut: Future<Output = P> + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
{
    for_all_gen_async(A::arbitrary(), body)
}

// Arity n with explicit generators: quantify over the first argument and
// hand the rest to arity n - 1.
macro_rules! nested_for_all_gen {
    ($name:ident => $inner:ident; $A:ident $a:ident $ga:ident; $($B:ident $b:ident $gb:ident),+) => {
        #[doc = concat!("[`for_all_gen`] over ", stringify!($A), $(", ", stringify!($B),)+ " with one generator per argument")]
        #[allow(clippy::too_many_arguments)]
        pub fn $name<$A, $($B,)+ P, F>($ga: Gen<$A>, $($gb: Gen<$B>,)+ body: F) -> Property
        where
            $A: Arbitrary,
            $($B: Arbitrary,)+
            P: Testable,
            F: Fn($A, $($B),+) -> P + Send + Sync + 'static,
        {
            let body = Arc::new(body);
            for_all_gen($ga, move |$a: $A| {
                let body = Arc::clone(&body);
                $inner($($gb.clone(),)+ move |$($b: $B),+| body($a.clone(), $($b),+))
            })
        }
    };
}

macro_rules! nested_for_all_gen_async {
    ($name:ident => $inner:ident; $A:ident $a:ident $ga:ident; $($B:ident $b:ident $gb:ident),+) => {
        #[doc = concat!("[`for_all_gen_async`] over ", stringify!($A), $(", ", stringify!($B),)+ "; only the innermost evaluation suspends")]
        #[allow(clippy::too_many_arguments)]
        pub fn $name<$A, $($B,)+ P, Fut, F>($ga: Gen<$A>, $($gb: Gen<$B>,)+ body: F) -> Property
        where
            $A: Arbitrary,
            $($B: Arbitrary,)+
            P: Testable + Send + 'static,
            Fut: Future<Output = P> + Send + 'static,
            F: Fn($A, $($B),+) -> Fut + Send + Sync + 'static,
        {
            let body = Arc::new(body);
            for_all_gen($ga, move |$a: $A| {
                let body = Arc::clone(&body);
                $inner($($gb.clone(),)+ move |$($b: $B),+| body($a.clone(), $($b),+))
            })
        }
    };
}

// Arity n over `Arbitrary` types: the explicit form with default generators.
macro_rules! implicit_for_all {
    ($name:ident => $explicit:ident; $($T:ident),+) => {
        #[doc = concat!("[`", stringify!($explicit), "`] with every generator taken from `Arbitrary`")]
        pub fn $name<$($T,)+ P, F>(body: F) -> Property
        where
            $($T: Arbitrary,)+
            P: Testable,
            F: Fn($($T),+) -> P + Send + Sync + 'static,
        {
            $explicit($($T::arbitrary(),)+ body)
        }
    };
}

macro_rules! implicit_for_all_async {
    ($name:ident => $explicit:ident; $($T:ident),+) => {
        #[doc = concat!("[`", stringify!($explicit), "`] with every generator taken from `Arbitrary`")]
        pub fn $name<$($T,)+ P, Fut, F>(body: F) -> Property
        where
            $($T: Arbitrary,)+
            P: Testable + Send + 'static,
            Fut: Future<Output = P> + Send + 'static,
            F: Fn($($T),+) -> Fut + Send + Sync + 'static,
        {
            $explicit($($T::arbitrary(),)+ body)
        }
    };
}

nested_for_all_gen!(for_all_gen2 => for_all_gen; A a ga; B b gb);
nested_for_all_gen!(for_all_gen3 => for_all_gen2; A a ga; B b gb, C c gc);
nested_for_all_gen!(for_all_gen4 => for_all_gen3; A a ga; B b gb, C c gc, D d gd);
nested_for_all_gen!(for_all_gen5 => for_all_gen4; A a ga; B b gb, C c gc, D d gd, E e ge);
nested_for_all_gen!(for_all_gen6 => for_all_gen5; A a ga; B b gb, C c gc, D d gd, E e ge, G g gg);
nested_for_all_gen!(for_all_gen7 => for_all_gen6; A a ga; B b gb, C c gc, D d gd, E e ge, G g gg, H h gh);
nested_for_all_gen!(for_all_gen8 => for_all_gen7; A a ga; B b gb, C c gc, D d gd, E e ge, G g gg, H h gh, I i gi);

nested_for_all_gen_async!(for_all_gen_async2 => for_all_gen_async; A a ga; B b gb);
nested_for_all_gen_async!(for_all_gen_async3 => for_all_gen_async2; A a ga; B b gb, C c gc);
nested_for_all_gen_async!(for_all_gen_async4 => for_all_gen_async3; A a ga; B b gb, C c gc, D d gd);
nested_for_all_gen_async!(for_all_gen_async5 => for_all_gen_async4; A a ga; B b gb, C c gc, D d gd, E e ge);
nested_for_all_gen_async!(for_all_gen_async6 => for_all_gen_async5; A a ga; B b gb, C c gc, D d gd, E e ge, G g gg);
nested_for_all_gen_async!(for_all_gen_async7 => for_all_gen_async6; A a ga; B b gb, C c gc, D d gd, E e ge, G g gg, H h gh);
nested_for_all_gen_async!(for_all_gen_async8 => for_all_gen_async7; A a ga; B b gb, C c gc, D d gd, E e ge, G g gg, H h gh, I i gi);

implicit_for_all!(for_all2 => for_all_gen2; A, B);
implicit_for_all!(for_all3 => for_all_gen3; A, B, C);
implicit_for_all!(for_all4 => for_all_gen4; A, B, C, D);
implicit_for_all!(for_all5 => for_all_gen5; A, B, C, D, E);
implicit_for_all!(for_all6 => for_all_gen6; A, B, C, D, E, G);
implicit_for_all!(for_all7 => for_all_gen7; A, B, C, D, E, G, H);
implicit_for_all!(for_all8 => for_all_gen8; A, B, C, D, E, G, H, I);

implicit_for_all_async!(for_all_async2 => for_all_gen_async2; A, B);
implicit_for_all_async!(for_all_async3 => for_all_gen_async3; A, B, C);
implicit_for_all_async!(for_all_async4 => for_all_gen_async4; A, B, C, D);
implicit_for_all_async!(for_all_async5 => for_all_gen_async5; A, B, C, D, E);
implicit_for_all_async!(for_all_async6 => for_all_gen_async6; A, B, C, D, E, G);
implicit_for_all_async!(for_all_async7 => for_all_gen_async7; A, B, C, D, E, G, H);
implicit_for_all_async!(for_all_async8 => for_all_gen_async8; A, B, C, D, E, G, H, I);
