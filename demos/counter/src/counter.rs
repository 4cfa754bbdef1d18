//! The counter feature
//!
//! Increments and decrements a count, fetches a fact about the current
//! value, and runs a once-per-second timer that keeps incrementing until it
//! is toggled off.

use crate::number_fact::{NetworkError, NumberFactKey};
use composable_core::dependencies::ClockKey;
use composable_core::{Dependencies, Effect, Reducer, SmallVec, smallvec};
use std::time::Duration;

/// Cancellation id of the running timer
pub const TIMER_ID: &str = "timer";

/// Time between two timer ticks
pub const TIMER_INTERVAL: Duration = Duration::from_secs(1);

/// Counter state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    /// Current count
    pub count: i64,
    /// Fact about `count`, cleared whenever the count changes
    pub fact: Option<String>,
    /// A fact request is in flight
    pub is_loading: bool,
    /// The timer is ticking
    pub is_timer_running: bool,
}

/// Counter actions
///
/// Named after what happened in the UI rather than what the reducer does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAction {
    /// "+" tapped
    IncrementButtonTapped,
    /// "-" tapped
    DecrementButtonTapped,
    /// "Fact" tapped
    FactButtonTapped,
    /// A fact arrived
    FactResponse(String),
    /// The fact request failed
    FactResponseFailed(NetworkError),
    /// "Start timer" / "Stop timer" tapped
    ToggleTimerButtonTapped,
    /// The timer fired
    TimerTick,
}

/// Counter reducer
///
/// Its environment is the dependency registry: the clock drives the timer
/// and [`NumberFactKey`] provides the fact client.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterReducer;

impl CounterReducer {
    /// Create a counter reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;
    type Environment = Dependencies;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        deps: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CounterAction::IncrementButtonTapped | CounterAction::TimerTick => {
                state.count = state.count.saturating_add(1);
                state.fact = None;
                smallvec![]
            },
            CounterAction::DecrementButtonTapped => {
                state.count = state.count.saturating_sub(1);
                state.fact = None;
                smallvec![]
            },
            CounterAction::FactButtonTapped => {
                state.fact = None;
                state.is_loading = true;

                let number = state.count;
                let client = deps.get::<NumberFactKey>();
                smallvec![Effect::run_catching(
                    move |send| async move {
                        let fact = client.fetch(number).await?;
                        send.send(CounterAction::FactResponse(fact)).await;
                        Ok::<(), NetworkError>(())
                    },
                    |error, send| async move {
                        send.send(CounterAction::FactResponseFailed(error)).await;
                    },
                )]
            },
            CounterAction::FactResponse(fact) => {
                state.fact = Some(fact);
                state.is_loading = false;
                smallvec![]
            },
            CounterAction::FactResponseFailed(error) => {
                tracing::warn!(%error, "Number fact request failed");
                state.is_loading = false;
                smallvec![]
            },
            CounterAction::ToggleTimerButtonTapped => {
                state.is_timer_running = !state.is_timer_running;
                if !state.is_timer_running {
                    return smallvec![Effect::cancel(TIMER_ID)];
                }

                let clock = deps.get::<ClockKey>();
                smallvec![
                    Effect::run(move |send| async move {
                        while !send.is_cancelled() {
                            clock.sleep(TIMER_INTERVAL).await;
                            send.send(CounterAction::TimerTick).await;
                        }
                    })
                    .cancellable(TIMER_ID)
                ]
            },
        }
    }
}
