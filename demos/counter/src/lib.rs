//! # Counter Example
//!
//! A counter with side effects, composed into a two-tab app.
//!
//! This example showcases:
//! - A reducer whose environment is the dependency registry
//! - A network effect whose failure is modeled as an action
//! - A long-running timer effect cancelled by id
//! - Composing two copies of one feature with `Scope`
//!
//! ## Example
//!
//! ```no_run
//! use composable_core::Dependencies;
//! use composable_runtime::Store;
//! use counter::{CounterAction, CounterReducer, CounterState};
//!
//! # async fn example() -> Result<(), composable_runtime::StoreError> {
//! let store = Store::new(CounterState::default(), CounterReducer::new(), Dependencies::live());
//!
//! store.send(CounterAction::IncrementButtonTapped).await?;
//! let count = store.state(|s| s.count).await;
//! assert_eq!(count, 1);
//! # Ok(())
//! # }
//! ```

/// Two-tab app feature
pub mod app;

/// The counter feature
pub mod counter;

/// Number-fact client and its dependency key
pub mod number_fact;

pub use app::{AppAction, AppReducer, AppState, app_reducer};
pub use counter::{CounterAction, CounterReducer, CounterState, TIMER_ID, TIMER_INTERVAL};
pub use number_fact::{
    LiveNumberFactClient, NetworkError, NumberFactClient, NumberFactConfig, NumberFactKey,
    TestNumberFactClient,
};
