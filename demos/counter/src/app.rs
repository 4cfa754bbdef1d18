//! Two counter tabs driven by one store
//!
//! Each tab runs its own copy of the counter feature. Because their effects
//! are scoped by tab, stopping the timer in one tab never stops the other.

use crate::counter::{CounterAction, CounterReducer, CounterState};
use composable_core::composition::{CombinedReducer, Reduce, Scope, combine_reducers};
use composable_core::{Dependencies, Effect, SmallVec, case_path};

/// App state: one counter per tab
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// First tab
    pub tab1: CounterState,
    /// Second tab
    pub tab2: CounterState,
}

/// App actions: counter actions tagged with their tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// An action of the first tab
    Tab1(CounterAction),
    /// An action of the second tab
    Tab2(CounterAction),
}

/// The app reducer type
pub type AppReducer = CombinedReducer<AppState, AppAction, Dependencies>;

/// Build the app reducer
///
/// Reducers run top to bottom: first tab, second tab, then the app's own
/// logic, which sees the state after the tabs ran.
#[must_use]
pub fn app_reducer() -> AppReducer {
    combine_reducers(vec![
        Box::new(Scope::new(
            |app: &mut AppState| &mut app.tab1,
            case_path!(AppAction::Tab1),
            CounterReducer::new(),
        )),
        Box::new(Scope::new(
            |app: &mut AppState| &mut app.tab2,
            case_path!(AppAction::Tab2),
            CounterReducer::new(),
        )),
        Box::new(Reduce::new(
            |_state: &mut AppState, _action: AppAction, _deps: &Dependencies| -> SmallVec<[Effect<AppAction>; 4]> {
                SmallVec::new()
            },
        )),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_core::Reducer;

    #[test]
    fn actions_reach_only_their_tab() {
        let reducer = app_reducer();
        let deps = Dependencies::test();
        let mut state = AppState::default();

        reducer.reduce(&mut state, AppAction::Tab1(CounterAction::IncrementButtonTapped), &deps);
        reducer.reduce(&mut state, AppAction::Tab2(CounterAction::DecrementButtonTapped), &deps);
        reducer.reduce(&mut state, AppAction::Tab2(CounterAction::DecrementButtonTapped), &deps);

        assert_eq!(state.tab1.count, 1);
        assert_eq!(state.tab2.count, -2);
    }
}
