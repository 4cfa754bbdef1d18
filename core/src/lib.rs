//! # Composable Core
//!
//! Core traits and types for building interactive features out of small,
//! composable units.
//!
//! ## Core Concepts
//!
//! - **State**: Owned, mutable value tree for a feature
//! - **Action**: All events a feature reacts to (user input, effect responses, delegates)
//! - **Reducer**: `(State, Action, Environment) → Effects`, mutating state in place
//! - **Effect**: Description of asynchronous work that feeds actions back
//! - **Environment**: Injected dependencies ([`dependencies::Dependencies`])
//!
//! ## Composition
//!
//! - [`composition::Scope`]: embed a child reducer on a field (or enum case) of parent state
//! - [`presentation::IfLet`]: embed a child on an optional, presented slice of state
//! - [`identified::ForEach`]: run a child for one element of an identified collection
//! - [`stack::ForEachStack`]: run a child for one element of a navigation stack
//!
//! ## Example
//!
//! ```
//! use composable_core::{Effect, Reducer, SmallVec, smallvec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct CounterState {
//!     count: i64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     IncrementButtonTapped,
//!     DecrementButtonTapped,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         match action {
//!             CounterAction::IncrementButtonTapped => state.count += 1,
//!             CounterAction::DecrementButtonTapped => state.count -= 1,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = CounterState::default();
//! CounterReducer.reduce(&mut state, CounterAction::IncrementButtonTapped, &());
//! assert_eq!(state.count, 1);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Explicit accessors for enum cases
pub mod case_path;

/// Reducer composition utilities
pub mod composition;

/// Dependency registry with live and test implementations
pub mod dependencies;

/// Side effect descriptions and cancellation identifiers
pub mod effect;

/// Declarative macros for case paths and effects
pub mod effect_macros;

/// Clock and identifier-generator dependencies
pub mod environment;

/// Ordered, identity-keyed collections
pub mod identified;

/// Optional child features (sheets, alerts, destinations)
pub mod presentation;

/// Navigation stacks of child features
pub mod stack;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → Effects`
///
/// They contain all feature logic and are deterministic and testable.
/// State is mutated in place; any work that must happen later (timers,
/// network requests) is described by the returned effects.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for feature logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The feature state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for CounterReducer {
    ///     type State = CounterState;
    ///     type Action = CounterAction;
    ///     type Environment = Dependencies;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut CounterState,
    ///         action: CounterAction,
    ///         env: &Dependencies,
    ///     ) -> SmallVec<[Effect<CounterAction>; 4]> {
    ///         match action {
    ///             CounterAction::IncrementButtonTapped => {
    ///                 state.count += 1;
    ///                 smallvec![Effect::None]
    ///             }
    ///             _ => smallvec![Effect::None],
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed by the runtime
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }

    impl<R> Reducer for Box<R>
    where
        R: Reducer + ?Sized,
    {
        type State = R::State;
        type Action = R::Action;
        type Environment = R::Environment;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            (**self).reduce(state, action, env)
        }
    }
}

pub use case_path::CasePath;
pub use composition::{EmptyReducer, Reduce, ReducerExt, Scope, combine_reducers};
pub use dependencies::{DependencyContext, DependencyKey, Dependencies};
pub use effect::{ActionSender, BoxFuture, CancelId, Effect};
pub use environment::{Clock, UuidGenerator};
pub use identified::{ElementAction, Identifiable, IdentifiedVec};
pub use presentation::{AlertButton, AlertState, ButtonRole, PresentationAction};
pub use reducer::Reducer;
pub use stack::{StackAction, StackElementId, StackState};
