//! # Composable Testing
//!
//! Testing utilities for composable features.
//!
//! This crate provides:
//! - [`TestStore`]: asserts every state change and every effect-produced action
//! - [`ReducerTest`]: Given-When-Then checks of a single reducer call
//! - [`assertions`]: checks over returned effect descriptions
//! - [`test_dependencies`]: test dependencies sharing a controllable clock
//!
//! ## Example
//!
//! ```ignore
//! use composable_testing::{TestStore, test_dependencies};
//!
//! #[tokio::test]
//! async fn timer_ticks_once_per_second() {
//!     let (deps, clock) = test_dependencies();
//!     let mut store = TestStore::new(CounterState::default(), counter(), deps);
//!
//!     store.send(CounterAction::ToggleTimerButtonTapped, |s| s.is_timer_running = true).await;
//!     clock.advance(Duration::from_secs(1)).await;
//!     store.receive_action(CounterAction::TimerTick, |s| s.count = 1).await;
//!     store.send(CounterAction::ToggleTimerButtonTapped, |s| s.is_timer_running = false).await;
//!     store.finish().await;
//! }
//! ```

use composable_core::dependencies::{ClockKey, Dependencies};
use std::sync::Arc;

/// State diffs for failure messages
pub mod diff;


/// The test store
pub mod test_store;

pub use composable_core::environment::TestClock;
pub use diff::diff_debug;
pub use reducer_test::{ReducerTest, assertions};
pub use test_store::{Exhaustivity, TestStore, TestStoreConfig};

/// Test dependencies whose clock is a [`TestClock`] owned by the caller
///
/// Advance the returned clock to drive every timer started by effects of a
/// store built with these dependencies.
#[must_use]
pub fn test_dependencies() -> (Dependencies, Arc<TestClock>) {
    let clock = Arc::new(TestClock::default());
    let dependencies = Dependencies::test().with::<ClockKey>(clock.clone());
    (dependencies, clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_core::environment::Clock;
    use std::time::Duration;

    #[tokio::test]
    async fn test_dependencies_share_the_returned_clock() {
        let (deps, clock) = test_dependencies();
        let resolved = deps.get::<ClockKey>();

        clock.advance(Duration::from_secs(3)).await;

        assert_eq!(resolved.now(), clock.now());
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }
}
