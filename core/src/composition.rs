//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action, top to bottom
//! - **`Scope`**: Focus a child reducer on a field (or enum case) of parent state
//! - **`ReducerExt`**: Attach optional, collection and stack children to a parent
//! - **`Reduce`** / **`EmptyReducer`**: Closure-backed and no-op reducers
//!
//! # Examples
//!
//! ## Combining Reducers
//!
//! ```
//! use composable_core::{Effect, Reducer, SmallVec, smallvec};
//! use composable_core::composition::{Reduce, combine_reducers};
//!
//! #[derive(Clone, Default)]
//! struct MyState {
//!     count: i32,
//!     name: String,
//! }
//!
//! #[derive(Clone)]
//! enum MyAction {
//!     Increment,
//!     SetName(String),
//! }
//!
//! let counter = Reduce::new(|state: &mut MyState, action: MyAction, _env: &()| {
//!     if matches!(action, MyAction::Increment) {
//!         state.count += 1;
//!     }
//!     SmallVec::<[Effect<MyAction>; 4]>::new()
//! });
//! let names = Reduce::new(|state: &mut MyState, action: MyAction, _env: &()| {
//!     if let MyAction::SetName(name) = action {
//!         state.name = name;
//!     }
//!     smallvec![Effect::None]
//! });
//!
//! let combined = combine_reducers(vec![Box::new(counter), Box::new(names)]);
//! let mut state = MyState::default();
//! combined.reduce(&mut state, MyAction::Increment, &());
//! assert_eq!(state.count, 1);
//! ```

use std::marker::PhantomData;

use crate::case_path::CasePath;
use crate::effect::{CancelId, Effect};
use crate::identified::{ElementAction, ForEach, Identifiable, IdentifiedVec};
use crate::presentation::{IfLet, PresentationAction};
use crate::reducer::Reducer;
use crate::stack::{ForEachStack, StackAction, StackState};
use smallvec::SmallVec;

/// A reducer behind a box, as accepted by [`combine_reducers`]
pub type BoxedReducer<S, A, E> =
    Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in declared order against the same state, and all
/// effects are collected and concatenated in that order.
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<BoxedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    A: Clone,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E> {
    reducers: Vec<BoxedReducer<S, A, E>>,
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    A: Clone,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects);
        }

        all_effects
    }
}

/// A reducer backed by a closure
///
/// Used for a feature's own trailing logic when composing it with children.
pub struct Reduce<F, S, A, E> {
    body: F,
    _phantom: PhantomData<fn(&mut S, A, &E)>,
}

impl<F, S, A, E> Reduce<F, S, A, E>
where
    F: Fn(&mut S, A, &E) -> SmallVec<[Effect<A>; 4]>,
{
    /// Wrap `body` as a reducer
    #[must_use]
    pub const fn new(body: F) -> Self {
        Self {
            body,
            _phantom: PhantomData,
        }
    }
}

impl<F, S, A, E> Reducer for Reduce<F, S, A, E>
where
    F: Fn(&mut S, A, &E) -> SmallVec<[Effect<A>; 4]>,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        (self.body)(state, action, env)
    }
}

/// A reducer that ignores every action
pub struct EmptyReducer<S, A, E> {
    _phantom: PhantomData<fn(&mut S, A, &E)>,
}

impl<S, A, E> EmptyReducer<S, A, E> {
    /// Create the no-op reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<S, A, E> Default for EmptyReducer<S, A, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A, E> Reducer for EmptyReducer<S, A, E> {
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        _state: &mut Self::State,
        _action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        SmallVec::new()
    }
}

/// How a [`Scope`] reaches the child state inside the parent state
pub enum StateAccess<Parent, Child> {
    /// The child always exists as a field of the parent
    Field(fn(&mut Parent) -> &mut Child),
    /// The child exists only while the parent is in one enum case
    Case(fn(&mut Parent) -> Option<&mut Child>),
}

impl<Parent, Child> Clone for StateAccess<Parent, Child> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Parent, Child> Copy for StateAccess<Parent, Child> {}

/// Scopes a child reducer to a slice of parent state and one case of parent action.
///
/// Parent actions that are not the child's case are ignored. Child effects
/// are lifted into the parent action type and their cancellation ids are
/// namespaced by the case name, so sibling tabs running the same feature
/// cancel independently.
///
/// # Examples
///
/// ```
/// use composable_core::{Effect, Reducer, SmallVec, case_path};
/// use composable_core::composition::{Reduce, Scope};
///
/// #[derive(Clone, Default)]
/// struct CounterState {
///     count: i32,
/// }
///
/// #[derive(Clone, Debug)]
/// enum CounterAction {
///     Increment,
/// }
///
/// #[derive(Clone, Default)]
/// struct AppState {
///     tab1: CounterState,
/// }
///
/// #[derive(Clone, Debug)]
/// enum AppAction {
///     Tab1(CounterAction),
/// }
///
/// let counter = Reduce::new(|state: &mut CounterState, _action: CounterAction, _env: &()| {
///     state.count += 1;
///     SmallVec::<[Effect<CounterAction>; 4]>::new()
/// });
/// let scoped = Scope::new(|app: &mut AppState| &mut app.tab1, case_path!(AppAction::Tab1), counter);
///
/// let mut state = AppState::default();
/// scoped.reduce(&mut state, AppAction::Tab1(CounterAction::Increment), &());
/// assert_eq!(state.tab1.count, 1);
/// ```
pub struct Scope<ParentState, ParentAction, Child>
where
    Child: Reducer,
{
    state: StateAccess<ParentState, Child::State>,
    action: CasePath<ParentAction, Child::Action>,
    child: Child,
    scope: CancelId,
}

impl<ParentState, ParentAction, Child> Scope<ParentState, ParentAction, Child>
where
    Child: Reducer,
{
    /// Embed `child` on a field of the parent state
    #[must_use]
    pub fn new(
        state: fn(&mut ParentState) -> &mut Child::State,
        action: CasePath<ParentAction, Child::Action>,
        child: Child,
    ) -> Self {
        Self::with_access(StateAccess::Field(state), action, child)
    }

    /// Embed `child` on one case of an enum parent state
    ///
    /// Receiving the child's action while the parent is in another case is a
    /// programming error: it is logged, asserted in debug builds and ignored.
    #[must_use]
    pub fn case(
        state: fn(&mut ParentState) -> Option<&mut Child::State>,
        action: CasePath<ParentAction, Child::Action>,
        child: Child,
    ) -> Self {
        Self::with_access(StateAccess::Case(state), action, child)
    }

    fn with_access(
        state: StateAccess<ParentState, Child::State>,
        action: CasePath<ParentAction, Child::Action>,
        child: Child,
    ) -> Self {
        Self {
            state,
            action,
            child,
            scope: CancelId::new(action.name()),
        }
    }
}

impl<ParentState, ParentAction, Child> Reducer for Scope<ParentState, ParentAction, Child>
where
    Child: Reducer,
    Child::Action: Send + 'static,
    ParentAction: Send + 'static,
{
    type State = ParentState;
    type Action = ParentAction;
    type Environment = Child::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some(child_action) = self.action.extract(action) else {
            return SmallVec::new();
        };

        let child_state = match self.state {
            StateAccess::Field(get) => get(state),
            StateAccess::Case(get) => {
                let Some(child_state) = get(state) else {
                    tracing::error!(
                        case = self.action.name(),
                        "Scoped action received while parent state is in a different case"
                    );
                    debug_assert!(
                        false,
                        "Scoped action for case `{}` received while its state is absent",
                        self.action.name()
                    );
                    return SmallVec::new();
                };
                child_state
            },
        };

        let embed = self.action.embedder();
        self.child
            .reduce(child_state, child_action, env)
            .into_iter()
            .map(|effect| effect.map(embed).scoped(&self.scope))
            .collect()
    }
}

/// Extension methods attaching child features to a parent reducer
///
/// The parent is the receiver; the child runs before the parent for actions
/// addressed to it, and the combinator manages the child's lifetime
/// (cancelling its effects when its state goes away).
pub trait ReducerExt: Reducer + Sized {
    /// Embed a child on an optional (presented) slice of state
    fn if_let<Child>(
        self,
        state: fn(&mut Self::State) -> &mut Option<Child::State>,
        action: CasePath<Self::Action, PresentationAction<Child::Action>>,
        child: Child,
    ) -> IfLet<Self, Child>
    where
        Child: Reducer<Environment = Self::Environment>,
    {
        IfLet::new(self, state, action, child)
    }

    /// Embed a child on every element of an identified collection
    fn for_each<Element>(
        self,
        state: fn(&mut Self::State) -> &mut IdentifiedVec<Element::State>,
        action: CasePath<
            Self::Action,
            ElementAction<<Element::State as Identifiable>::Id, Element::Action>,
        >,
        element: Element,
    ) -> ForEach<Self, Element>
    where
        Element: Reducer<Environment = Self::Environment>,
        Element::State: Identifiable,
    {
        ForEach::new(self, state, action, element)
    }

    /// Embed a child on every element of a navigation stack
    fn for_each_stack<Element>(
        self,
        state: fn(&mut Self::State) -> &mut StackState<Element::State>,
        action: CasePath<Self::Action, StackAction<Element::State, Element::Action>>,
        element: Element,
    ) -> ForEachStack<Self, Element>
    where
        Element: Reducer<Environment = Self::Environment>,
    {
        ForEachStack::new(self, state, action, element)
    }
}

impl<R: Reducer> ReducerExt for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{case_path, smallvec};

    #[derive(Clone, Debug, Default, PartialEq)]
    struct CounterState {
        count: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum CounterAction {
        Increment,
        StartTimer,
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = CounterState;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.count += 1;
                    smallvec![Effect::None]
                },
                CounterAction::StartTimer => {
                    smallvec![Effect::send(CounterAction::Increment).cancellable("timer")]
                },
            }
        }
    }

    #[derive(Clone, Debug, Default)]
    struct AppState {
        tab1: CounterState,
        tab2: CounterState,
        log: Vec<&'static str>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum AppAction {
        Tab1(CounterAction),
        Tab2(CounterAction),
    }

    fn app_reducer() -> CombinedReducer<AppState, AppAction, ()> {
        combine_reducers(vec![
            Box::new(Scope::new(
                |s: &mut AppState| &mut s.tab1,
                case_path!(AppAction::Tab1),
                CounterReducer,
            )),
            Box::new(Scope::new(
                |s: &mut AppState| &mut s.tab2,
                case_path!(AppAction::Tab2),
                CounterReducer,
            )),
            Box::new(Reduce::new(|state: &mut AppState, action: AppAction, _env: &()| {
                // Children already ran; the parent observes their result.
                if let AppAction::Tab1(_) = action {
                    state.log.push(if state.tab1.count > 0 { "after-child" } else { "before-child" });
                }
                SmallVec::new()
            })),
        ])
    }

    #[test]
    fn test_scope_routes_to_the_addressed_tab_only() {
        let reducer = app_reducer();
        let mut state = AppState::default();

        let _ = reducer.reduce(&mut state, AppAction::Tab1(CounterAction::Increment), &());
        assert_eq!(state.tab1.count, 1);
        assert_eq!(state.tab2.count, 0);

        let _ = reducer.reduce(&mut state, AppAction::Tab2(CounterAction::Increment), &());
        let _ = reducer.reduce(&mut state, AppAction::Tab2(CounterAction::Increment), &());
        assert_eq!(state.tab1.count, 1);
        assert_eq!(state.tab2.count, 2);
    }

    #[test]
    fn test_children_run_before_trailing_parent_logic() {
        let reducer = app_reducer();
        let mut state = AppState::default();

        let _ = reducer.reduce(&mut state, AppAction::Tab1(CounterAction::Increment), &());
        assert_eq!(state.log, vec!["after-child"]);
    }

    #[test]
    fn test_scope_namespaces_child_cancellation_ids() {
        let reducer = app_reducer();
        let mut state = AppState::default();

        let effects = reducer.reduce(&mut state, AppAction::Tab2(CounterAction::StartTimer), &());
        let ids: Vec<String> = effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Cancellable { id, .. } => Some(id.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["Tab2/timer".to_string()]);
    }

    #[derive(Clone, Debug)]
    enum Mode {
        Counting(CounterState),
        Idle,
    }

    #[derive(Clone, Debug)]
    enum ModeAction {
        Counting(CounterAction),
    }

    #[test]
    fn test_case_scope_reaches_enum_state() {
        let scoped = Scope::case(
            |mode: &mut Mode| match mode {
                Mode::Counting(state) => Some(state),
                Mode::Idle => None,
            },
            case_path!(ModeAction::Counting),
            CounterReducer,
        );
        let mut mode = Mode::Counting(CounterState::default());

        let _ = scoped.reduce(&mut mode, ModeAction::Counting(CounterAction::Increment), &());
        assert!(matches!(mode, Mode::Counting(CounterState { count: 1 })));
    }

    #[test]
    fn test_empty_reducer_does_nothing() {
        let reducer = EmptyReducer::<CounterState, CounterAction, ()>::new();
        let mut state = CounterState { count: 3 };
        let effects = reducer.reduce(&mut state, CounterAction::Increment, &());
        assert!(effects.is_empty());
        assert_eq!(state.count, 3);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "received while its state is absent")]
    fn test_case_scope_rejects_action_for_absent_case() {
        let scoped = Scope::case(
            |mode: &mut Mode| match mode {
                Mode::Counting(state) => Some(state),
                Mode::Idle => None,
            },
            case_path!(ModeAction::Counting),
            CounterReducer,
        );
        let mut mode = Mode::Idle;

        let _ = scoped.reduce(&mut mode, ModeAction::Counting(CounterAction::Increment), &());
    }
}
