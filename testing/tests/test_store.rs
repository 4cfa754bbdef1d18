//! Integration tests for the test store
//!
//! Drives a small timer/loading feature through `TestStore` with a virtual
//! clock, and checks that each kind of unexpected behavior fails the test.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use composable_core::dependencies::{ClockKey, Dependencies};
use composable_core::{Effect, Reduce, Reducer, SmallVec, smallvec};
use composable_testing::{Exhaustivity, TestStore, TestStoreConfig, test_dependencies};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
struct Feature {
    count: u32,
    is_timer_running: bool,
    is_loading: bool,
    summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum FeatureAction {
    Increment,
    ToggleTimer,
    Tick,
    Load,
    Loaded(String),
}

fn feature() -> impl Reducer<State = Feature, Action = FeatureAction, Environment = Dependencies> {
    Reduce::new(
        |state: &mut Feature, action: FeatureAction, deps: &Dependencies| -> SmallVec<[Effect<FeatureAction>; 4]> {
            match action {
                FeatureAction::Increment | FeatureAction::Tick => {
                    state.count += 1;
                    smallvec![]
                },
                FeatureAction::ToggleTimer => {
                    state.is_timer_running = !state.is_timer_running;
                    if state.is_timer_running {
                        let clock = deps.get::<ClockKey>();
                        smallvec![
                            Effect::run(move |send| async move {
                                loop {
                                    clock.sleep(Duration::from_secs(1)).await;
                                    send.send(FeatureAction::Tick).await;
                                }
                            })
                            .cancellable("timer")
                        ]
                    } else {
                        smallvec![Effect::cancel("timer")]
                    }
                },
                FeatureAction::Load => {
                    state.is_loading = true;
                    smallvec![Effect::send(FeatureAction::Loaded(format!("{} loaded", state.count)))]
                },
                FeatureAction::Loaded(summary) => {
                    state.is_loading = false;
                    state.summary = Some(summary);
                    smallvec![]
                },
            }
        },
    )
}

fn quick_config() -> TestStoreConfig {
    TestStoreConfig::default().with_timeout(Duration::from_millis(50))
}

// ============================================================================
// Exhaustive
// ============================================================================

#[tokio::test]
async fn timer_ticks_once_per_virtual_second() {
    let (deps, clock) = test_dependencies();
    let mut store = TestStore::new(Feature::default(), feature(), deps);

    store
        .send(FeatureAction::ToggleTimer, |s| s.is_timer_running = true)
        .await;

    clock.advance(Duration::from_secs(1)).await;
    store.receive_action(FeatureAction::Tick, |s| s.count = 1).await;

    clock.advance(Duration::from_secs(2)).await;
    store.receive_action(FeatureAction::Tick, |s| s.count = 2).await;
    store.receive_action(FeatureAction::Tick, |s| s.count = 3).await;

    store
        .send(FeatureAction::ToggleTimer, |s| s.is_timer_running = false)
        .await;

    // No more ticks once the timer is off.
    clock.advance(Duration::from_secs(10)).await;
    store.finish().await;
}

#[tokio::test]
async fn effect_response_is_received_and_asserted() {
    let mut store = TestStore::new(Feature::default(), feature(), Dependencies::test());

    store.send(FeatureAction::Increment, |s| s.count = 1).await;
    store.send(FeatureAction::Load, |s| s.is_loading = true).await;
    store
        .receive_action(FeatureAction::Loaded("1 loaded".into()), |s| {
            s.is_loading = false;
            s.summary = Some("1 loaded".into());
        })
        .await;

    store.finish().await;
}

#[tokio::test]
async fn receive_matches_by_predicate() {
    let mut store = TestStore::new(Feature::default(), feature(), Dependencies::test());

    store.send(FeatureAction::Load, |s| s.is_loading = true).await;
    store
        .receive(
            |action| matches!(action, FeatureAction::Loaded(_)),
            |s| {
                s.is_loading = false;
                s.summary = Some("0 loaded".into());
            },
        )
        .await;

    store.finish().await;
}

#[tokio::test]
async fn skipping_leaves_a_clean_store() {
    let (deps, clock) = test_dependencies();
    let mut store = TestStore::new(Feature::default(), feature(), deps);

    store
        .send(FeatureAction::ToggleTimer, |s| s.is_timer_running = true)
        .await;
    clock.advance(Duration::from_secs(2)).await;

    store.skip_received_actions().await;
    store.assert(|s| s.count = 2).await;
    store.skip_in_flight_effects();

    store.finish().await;
}

// ============================================================================
// Non-exhaustive
// ============================================================================

#[tokio::test]
async fn non_exhaustive_checks_only_asserted_fields() {
    let mut store = TestStore::with_config(
        Feature::default(),
        feature(),
        Dependencies::test(),
        TestStoreConfig::default().with_exhaustivity(Exhaustivity::NonExhaustive),
    );

    // `is_loading` changes but is never asserted.
    store.send(FeatureAction::Load, |_| {}).await;
    // The pending `Loaded` is reduced before this send.
    store.send(FeatureAction::Increment, |s| s.count = 1).await;
    store
        .assert(|s| {
            s.summary = Some("0 loaded".into());
            s.is_loading = false;
        })
        .await;

    store.finish().await;
}

#[tokio::test]
async fn non_exhaustive_receive_skips_unmatched_actions() {
    let (deps, clock) = test_dependencies();
    let mut store = TestStore::new(Feature::default(), feature(), deps);
    store.set_exhaustivity(Exhaustivity::NonExhaustive);
    assert_eq!(store.exhaustivity(), Exhaustivity::NonExhaustive);

    store.send(FeatureAction::ToggleTimer, |_| {}).await;
    store.send(FeatureAction::Load, |_| {}).await;
    clock.advance(Duration::from_secs(2)).await;

    // `Loaded` arrives first and is reduced without being asserted.
    store.receive_action(FeatureAction::Tick, |s| s.count = 1).await;
    store.assert(|s| s.summary = Some("0 loaded".into())).await;

    // The second tick and the timer itself are skipped by finish.
    store.finish().await;
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
#[should_panic(expected = "does not match expectation")]
async fn wrong_state_change_fails() {
    let mut store = TestStore::new(Feature::default(), feature(), Dependencies::test());
    store.send(FeatureAction::Increment, |s| s.count = 2).await;
}

#[tokio::test]
#[should_panic(expected = "does not match expectation")]
async fn unasserted_change_fails_when_exhaustive() {
    let mut store = TestStore::new(Feature::default(), feature(), Dependencies::test());
    store.send(FeatureAction::Load, |_| {}).await;
}

#[tokio::test]
#[should_panic(expected = "Received unexpected action")]
async fn unexpected_received_action_fails() {
    let mut store = TestStore::new(Feature::default(), feature(), Dependencies::test());
    store.send(FeatureAction::Load, |s| s.is_loading = true).await;
    store.receive_action(FeatureAction::Tick, |s| s.count = 1).await;
}

#[tokio::test]
#[should_panic(expected = "Must handle 1 received action(s)")]
async fn sending_with_unhandled_actions_fails() {
    let mut store = TestStore::new(Feature::default(), feature(), Dependencies::test());
    store.send(FeatureAction::Load, |s| s.is_loading = true).await;
    store.send(FeatureAction::Increment, |s| s.count = 1).await;
}

#[tokio::test]
#[should_panic(expected = "none arrived within")]
async fn receive_times_out_without_clock_advance() {
    let (deps, _clock) = test_dependencies();
    let mut store = TestStore::with_config(Feature::default(), feature(), deps, quick_config());

    store
        .send(FeatureAction::ToggleTimer, |s| s.is_timer_running = true)
        .await;
    store.receive_action(FeatureAction::Tick, |s| s.count = 1).await;
}

#[tokio::test]
#[should_panic(expected = "effect(s) still running")]
async fn finishing_with_running_effects_fails() {
    let (deps, _clock) = test_dependencies();
    let mut store = TestStore::with_config(Feature::default(), feature(), deps, quick_config());

    store
        .send(FeatureAction::ToggleTimer, |s| s.is_timer_running = true)
        .await;
    store.finish().await;
}

#[tokio::test]
#[should_panic(expected = "TestStore dropped with")]
async fn dropping_with_unreceived_actions_fails() {
    let mut store = TestStore::new(Feature::default(), feature(), Dependencies::test());
    store.send(FeatureAction::Load, |s| s.is_loading = true).await;
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
    drop(store);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[should_panic(expected = "requires a current_thread runtime")]
async fn multi_threaded_runtime_is_rejected() {
    let _store = TestStore::new(Feature::default(), feature(), Dependencies::test());
}
