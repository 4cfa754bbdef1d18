//! Integration tests for effect lifetimes of embedded child features
//!
//! Runs composed reducers in a real store and checks that effects of a
//! child feature stop when the child goes away, and only then.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use composable_core::{
    Effect, PresentationAction, Reduce, ReducerExt, Scope, SmallVec, case_path, combine_reducers,
    reducer::Reducer, smallvec,
};
use composable_runtime::Store;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
struct TimerState {
    ticks: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum TimerAction {
    Start,
    Stop,
    Tick,
    Close,
}

fn timer() -> impl Reducer<State = TimerState, Action = TimerAction, Environment = ()> {
    Reduce::new(|state: &mut TimerState, action: TimerAction, _env: &()| match action {
        TimerAction::Start => smallvec![
            Effect::run(|send| async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    send.send(TimerAction::Tick).await;
                }
            })
            .cancellable("tick")
        ],
        TimerAction::Stop => smallvec![Effect::cancel("tick")],
        TimerAction::Tick => {
            state.ticks += 1;
            smallvec![]
        },
        TimerAction::Close => smallvec![Effect::run(|send| async move { send.dismiss().await })],
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
struct SheetHost {
    sheet: Option<TimerState>,
    dismissals: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum SheetHostAction {
    Open,
    Sheet(PresentationAction<TimerAction>),
}

fn sheet_host() -> impl Reducer<State = SheetHost, Action = SheetHostAction, Environment = ()> {
    Reduce::new(|state: &mut SheetHost, action: SheetHostAction, _env: &()| {
        match action {
            SheetHostAction::Open => state.sheet = Some(TimerState::default()),
            SheetHostAction::Sheet(PresentationAction::Dismiss) => state.dismissals += 1,
            SheetHostAction::Sheet(PresentationAction::Presented(_)) => {},
        }
        SmallVec::<[Effect<SheetHostAction>; 4]>::new()
    })
    .if_let(|s: &mut SheetHost| &mut s.sheet, case_path!(SheetHostAction::Sheet), timer())
}

fn presented(action: TimerAction) -> SheetHostAction {
    SheetHostAction::Sheet(PresentationAction::Presented(action))
}

async fn sheet_ticks<R>(store: &Store<SheetHost, SheetHostAction, (), R>) -> Option<u32>
where
    R: Reducer<State = SheetHost, Action = SheetHostAction, Environment = ()> + Send + Sync + 'static,
{
    store.state(|s| s.sheet.as_ref().map(|sheet| sheet.ticks)).await
}

// ============================================================================
// Presentation
// ============================================================================

#[tokio::test]
async fn dismissing_from_the_parent_cancels_child_effects() {
    let store = Store::new(SheetHost::default(), sheet_host(), ());

    store.send(SheetHostAction::Open).await.unwrap();
    store.send(presented(TimerAction::Start)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(45)).await;
    assert!(sheet_ticks(&store).await.unwrap() >= 1);

    store
        .send(SheetHostAction::Sheet(PresentationAction::Dismiss))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let state = store.snapshot().await;
    assert_eq!(state.sheet, None);
    assert_eq!(state.dismissals, 1);
    assert_eq!(store.in_flight_effects(), 0);
}

#[tokio::test]
async fn child_can_dismiss_itself() {
    let store = Store::new(SheetHost::default(), sheet_host(), ());

    store.send(SheetHostAction::Open).await.unwrap();
    store.send(presented(TimerAction::Start)).await.unwrap();
    let mut handle = store.send(presented(TimerAction::Close)).await.unwrap();
    handle
        .wait_with_timeout(Duration::from_secs(1))
        .await
        .expect("dismiss effect completes");

    tokio::time::sleep(Duration::from_millis(30)).await;
    let state = store.snapshot().await;
    assert_eq!(state.sheet, None);
    assert_eq!(state.dismissals, 1);
    assert_eq!(store.in_flight_effects(), 0);
}

#[tokio::test]
async fn reopening_starts_from_fresh_state() {
    let store = Store::new(SheetHost::default(), sheet_host(), ());

    store.send(SheetHostAction::Open).await.unwrap();
    store.send(presented(TimerAction::Start)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(25)).await;
    store
        .send(SheetHostAction::Sheet(PresentationAction::Dismiss))
        .await
        .unwrap();

    store.send(SheetHostAction::Open).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    // The old timer was cancelled, so the new sheet sees no ticks.
    assert_eq!(sheet_ticks(&store).await, Some(0));
}

// ============================================================================
// Scoped siblings
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Tabs {
    first: TimerState,
    second: TimerState,
}

#[derive(Debug, Clone, PartialEq)]
enum TabsAction {
    First(TimerAction),
    Second(TimerAction),
}

#[tokio::test]
async fn sibling_tabs_with_the_same_cancel_id_are_independent() {
    let reducer = combine_reducers(vec![
        Box::new(Scope::new(|s: &mut Tabs| &mut s.first, case_path!(TabsAction::First), timer())),
        Box::new(Scope::new(|s: &mut Tabs| &mut s.second, case_path!(TabsAction::Second), timer())),
    ]);
    let store = Store::new(Tabs::default(), reducer, ());

    store.send(TabsAction::First(TimerAction::Start)).await.unwrap();
    store.send(TabsAction::Second(TimerAction::Start)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(25)).await;

    store.send(TabsAction::First(TimerAction::Stop)).await.unwrap();
    let first_after_stop = store.state(|s| s.first.ticks).await;
    let second_after_stop = store.state(|s| s.second.ticks).await;
    tokio::time::sleep(Duration::from_millis(45)).await;

    assert_eq!(store.state(|s| s.first.ticks).await, first_after_stop);
    assert!(store.state(|s| s.second.ticks).await > second_after_stop);
    assert_eq!(store.in_flight_effects(), 1);

    store.cancel_all_effects();
}

#[tokio::test]
async fn scoped_store_reads_and_sends_child_actions() {
    let reducer = combine_reducers(vec![
        Box::new(Scope::new(|s: &mut Tabs| &mut s.first, case_path!(TabsAction::First), timer())),
        Box::new(Scope::new(|s: &mut Tabs| &mut s.second, case_path!(TabsAction::Second), timer())),
    ]);
    let store = Store::new(Tabs::default(), reducer, ());
    let second = store.scope(|s: &Tabs| &s.second, TabsAction::Second);

    second.send(TimerAction::Tick).await.unwrap();
    second.send(TimerAction::Tick).await.unwrap();

    assert_eq!(second.snapshot().await, TimerState { ticks: 2 });
    assert_eq!(store.state(|s| s.first.ticks).await, 0);
}
