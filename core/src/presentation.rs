//! Optional child features: sheets, alerts and destinations.
//!
//! Presentation is modeled purely as state: a child feature is "presented"
//! while its `Option` state is `Some`. [`IfLet`] runs the child only while it
//! is presented and cancels every effect the child started once the state
//! becomes `None`, whether the parent cleared it or the child asked to be
//! dismissed.

use crate::case_path::CasePath;
use crate::effect::{CancelId, Effect};
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Action wrapper for a presented child
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresentationAction<Action> {
    /// An action of the presented child
    Presented(Action),
    /// The child is being dismissed; its state is cleared after the parent reacts
    Dismiss,
}

/// Semantic role of an alert button
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ButtonRole {
    /// Regular button
    #[default]
    Default,
    /// Button that dismisses without doing anything
    Cancel,
    /// Button that destroys data
    Destructive,
}

/// A button of an [`AlertState`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertButton<Action> {
    /// Button label
    pub label: String,
    /// Semantic role, used by the rendering layer for styling
    pub role: ButtonRole,
    /// Action sent when tapped; `None` only dismisses
    pub action: Option<Action>,
}

impl<Action> AlertButton<Action> {
    /// A regular button sending `action`
    #[must_use]
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            role: ButtonRole::Default,
            action: Some(action),
        }
    }

    /// A destructive button sending `action`
    #[must_use]
    pub fn destructive(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            role: ButtonRole::Destructive,
            action: Some(action),
        }
    }

    /// A cancel button that only dismisses
    #[must_use]
    pub fn cancel(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            role: ButtonRole::Cancel,
            action: None,
        }
    }
}

/// Plain data describing an alert; rendering is up to the view layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertState<Action> {
    /// Alert title
    pub title: String,
    /// Optional body text
    pub message: Option<String>,
    /// Buttons in display order
    pub buttons: Vec<AlertButton<Action>>,
}

impl<Action> AlertState<Action> {
    /// An alert with a title and no buttons yet
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: None,
            buttons: Vec::new(),
        }
    }

    /// Set the body text
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Append a button
    #[must_use]
    pub fn with_button(mut self, button: AlertButton<Action>) -> Self {
        self.buttons.push(button);
        self
    }
}

/// A parent reducer with a child embedded on an optional slice of its state
///
/// Created by [`ReducerExt::if_let`](crate::composition::ReducerExt::if_let).
///
/// Order of operations for one action:
/// 1. `Presented(child_action)` runs the child against the presented state
/// 2. the parent runs
/// 3. `Dismiss` clears the child state
/// 4. if the state went from `Some` to `None`, every effect tagged with the
///    child's scope is cancelled
pub struct IfLet<Parent, Child>
where
    Parent: Reducer,
    Child: Reducer,
{
    parent: Parent,
    child: Child,
    state: fn(&mut Parent::State) -> &mut Option<Child::State>,
    action: CasePath<Parent::Action, PresentationAction<Child::Action>>,
    scope: CancelId,
}

impl<Parent, Child> IfLet<Parent, Child>
where
    Parent: Reducer,
    Child: Reducer<Environment = Parent::Environment>,
{
    pub(crate) fn new(
        parent: Parent,
        state: fn(&mut Parent::State) -> &mut Option<Child::State>,
        action: CasePath<Parent::Action, PresentationAction<Child::Action>>,
        child: Child,
    ) -> Self {
        Self {
            parent,
            child,
            state,
            action,
            scope: CancelId::new(action.name()),
        }
    }

    /// Cancellation scope shared by every effect of the presented child
    #[must_use]
    pub const fn scope(&self) -> &CancelId {
        &self.scope
    }
}

impl<Parent, Child> Reducer for IfLet<Parent, Child>
where
    Parent: Reducer,
    Parent::Action: Clone + Send + Sync + 'static,
    Child: Reducer<Environment = Parent::Environment>,
    Child::Action: Send + 'static,
{
    type State = Parent::State;
    type Action = Parent::Action;
    type Environment = Parent::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let was_presented = (self.state)(state).is_some();
        let mut effects = SmallVec::new();
        let mut dismissing = false;

        match self.action.extract(action.clone()) {
            Some(PresentationAction::Presented(child_action)) => {
                if let Some(child_state) = (self.state)(state).as_mut() {
                    let embed = self.action.embedder();
                    let dismiss = embed(PresentationAction::Dismiss);
                    effects.extend(
                        self.child
                            .reduce(child_state, child_action, env)
                            .into_iter()
                            .map(|effect| {
                                effect
                                    .map(move |a| embed(PresentationAction::Presented(a)))
                                    .with_dismiss(dismiss.clone())
                                    .scoped(&self.scope)
                                    .tagged(self.scope.clone())
                            }),
                    );
                } else {
                    tracing::error!(
                        case = self.action.name(),
                        "Presented action received while nothing is presented"
                    );
                    debug_assert!(
                        false,
                        "Presented action for `{}` received while its state is absent",
                        self.action.name()
                    );
                }
            },
            Some(PresentationAction::Dismiss) => dismissing = true,
            None => {},
        }

        effects.extend(self.parent.reduce(state, action, env));

        let presented = (self.state)(state);
        if dismissing {
            *presented = None;
        }
        if was_presented && presented.is_none() {
            tracing::trace!(scope = %self.scope, "Presented child dismissed, cancelling its effects");
            effects.push(Effect::cancel(self.scope.clone()));
        }

        effects
    }
}
