//! End-to-end tests for the synchronous driver

use falsify::{
    Checker, CheckerConfig, Gen, Property, RandomSource, ReplayToken, Status, TestResult,
    check_with_config, for_all, for_all2, for_all_gen, for_all_gen2, implies,
};
use std::sync::{Arc, Mutex};

fn pinned(seed: (u64, u64), size: usize) -> CheckerConfig {
    CheckerConfig::default().with_replay(seed, size)
}

fn at_most_fifty() -> Property {
    for_all_gen(Gen::choose(1i64, 100).unwrap(), |x| x <= 50)
}

#[test]
fn test_scenario_converges_to_local_minimum() {
    let report = Checker::new("at most fifty")
        .with_config(pinned((12345, 67890), 10).with_successful_tests(100))
        .check(at_most_fifty())
        .unwrap();

    assert_eq!(report.status, Status::Failed);
    assert_eq!(report.counterexample.len(), 1);
    let minimal: i64 = report.counterexample[0].parse().unwrap();
    assert!(minimal > 50);
    // Every candidate of the minimum passes; x - 1 is always a candidate.
    assert_eq!(minimal, 51);
    assert!(report.minimized);
    assert!(report.replay.is_some());
    assert_eq!(report.reason, "Falsifiable");
}

#[test]
fn test_same_seed_same_report() {
    let first = check_with_config(at_most_fifty(), pinned((98765, 43210), 10)).unwrap();
    let second = check_with_config(at_most_fifty(), pinned((98765, 43210), 10)).unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.successes, second.successes);
    assert_eq!(first.counterexample, second.counterexample);
    assert_eq!(first.shrink_steps, second.shrink_steps);
    assert_eq!(first.replay, second.replay);
}

#[test]
fn test_recorded_token_fails_on_first_case() {
    let original = Checker::new("unpinned").check(at_most_fifty()).unwrap();
    assert!(original.is_failure());
    let token = original.replay.unwrap();

    let replayed = Checker::new("replayed")
        .with_config(CheckerConfig::default().with_replay_token(token))
        .check(at_most_fifty())
        .unwrap();
    assert!(replayed.is_failure());
    assert_eq!(replayed.successes, 0);
    assert_eq!(replayed.counterexample, original.counterexample);
    assert_eq!(replayed.replay, Some(token));
}

#[test]
fn test_draw_sequence_is_reproducible() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = |seen: Arc<Mutex<Vec<u32>>>| {
        for_all(move |x: u32| {
            seen.lock().unwrap().push(x);
            true
        })
    };

    let config = pinned((11111, 22222), 20).with_successful_tests(50);
    let first = Arc::new(Mutex::new(Vec::new()));
    check_with_config(record(Arc::clone(&first)), config.clone()).unwrap();
    check_with_config(record(Arc::clone(&seen)), config).unwrap();

    assert_eq!(first.lock().unwrap().len(), 50);
    assert_eq!(*first.lock().unwrap(), *seen.lock().unwrap());
}

#[test]
fn test_split_streams_are_independent() {
    let generator = Gen::choose(0u64, u64::MAX).unwrap();
    let (left, right) = RandomSource::new(7, 9).split();

    let from_left = generator.sample(20, left);
    let from_right = generator.sample(20, right);
    assert_ne!(from_left, from_right);
    assert_eq!(from_left, generator.sample(20, left));
}

#[test]
fn test_gives_up_when_everything_is_discarded() {
    let property = for_all(|x: u32| implies(x > u32::MAX - 1, true));
    let report = check_with_config(property, CheckerConfig::default()).unwrap();

    assert_eq!(report.status, Status::GaveUp);
    assert_eq!(report.successes, 0);
    assert_eq!(report.discards, 1);
    assert_eq!(report.reason, "Gave up after 0 tests and 1 discards");
}

#[test]
fn test_discard_warmup_delays_giving_up() {
    let property = for_all(|x: u32| implies(x > u32::MAX - 1, true));
    let report =
        check_with_config(property, CheckerConfig::default().with_discard_warmup(20)).unwrap();

    assert_eq!(report.status, Status::GaveUp);
    assert_eq!(report.discards, 20);
}

#[test]
fn test_ratio_is_enforced_before_enough_tests_pass() {
    let calls = Arc::new(Mutex::new(0usize));
    let property = {
        let calls = Arc::clone(&calls);
        for_all(move |_: u8| {
            let mut calls = calls.lock().unwrap();
            *calls += 1;
            implies(*calls > 6, true)
        })
    };
    let config = pinned((3, 4), 10)
        .with_successful_tests(5)
        .with_discard_ratio(0.5)
        .with_discard_warmup(6);
    let report = check_with_config(property, config).unwrap();

    assert_eq!(report.status, Status::GaveUp);
    assert_eq!(report.successes, 0);
    assert_eq!(report.discards, 6);
}

#[test]
fn test_discards_below_ratio_still_pass() {
    let property = for_all(|x: u32| implies(x % 2 == 0, x % 2 == 0));
    let report =
        check_with_config(property, pinned((1, 1), 10).with_discard_warmup(20)).unwrap();

    assert_eq!(report.status, Status::Passed);
    assert_eq!(report.successes, 100);
    assert!(report.discards > 0);
}

#[test]
fn test_two_argument_failure_is_locally_minimal() {
    let property = for_all2(|a: u32, b: u32| a + b < 20);
    let report = check_with_config(property, pinned((12345, 67890), 10)).unwrap();

    assert!(report.is_failure());
    assert_eq!(report.counterexample.len(), 2);
    let sum: u32 = report
        .counterexample
        .iter()
        .map(|text| text.parse::<u32>().unwrap())
        .sum();
    assert_eq!(sum, 20);
}

#[test]
fn test_counterexample_keeps_argument_order() {
    let generator = Gen::choose(10u8, 20).unwrap();
    let property = for_all_gen2(generator, Gen::constant(true), |x: u8, flag: bool| {
        !(flag && x >= 10)
    });
    let report = check_with_config(property, pinned((5, 6), 3)).unwrap();

    assert!(report.is_failure());
    assert_eq!(report.counterexample, vec!["10", "true"]);
}

#[test]
fn test_labels_and_annotations_reach_the_report() {
    let property = for_all(|x: u8| {
        TestResult::failed("too large").with_label(if x % 2 == 0 { "even" } else { "odd" })
    })
    .counterexample("note: always fails");
    let report = check_with_config(property, pinned((3, 4), 5)).unwrap();

    assert!(report.is_failure());
    assert_eq!(report.reason, "too large");
    assert_eq!(report.counterexample.first().map(String::as_str), Some("note: always fails"));
    assert_eq!(report.counterexample.last().map(String::as_str), Some("0"));
    assert!(report.labels.contains("even"));
}

#[test]
fn test_errors_are_reported_with_text() {
    let property = for_all(|x: u16| {
        if x > 3 {
            Err(format!("{} is out of range", x))
        } else {
            Ok(true)
        }
    });
    let report = check_with_config(property, pinned((12, 34), 50)).unwrap();

    assert!(report.is_failure());
    assert_eq!(report.counterexample, vec!["4"]);
    assert_eq!(report.error.as_deref(), Some("4 is out of range"));
    assert_eq!(
        report.reason,
        "Test case returned an error: \"4 is out of range\""
    );
}

#[test]
fn test_unminimized_when_budget_runs_out() {
    let report = check_with_config(
        at_most_fifty(),
        pinned((12345, 67890), 10).with_max_shrinks(1),
    )
    .unwrap();

    assert!(report.is_failure());
    assert!(!report.minimized);
    assert_eq!(report.shrink_evaluations, 1);
}

#[test]
fn test_replay_token_round_trips_through_config() {
    let token = ReplayToken::new((42, 24), 7);
    let config = CheckerConfig::default().with_replay_token(token);
    assert_eq!(config.replay, Some(token));
    assert_eq!(token.source(), RandomSource::new(42, 24));
}
