//! Detail screen for one contact, pushed on the contacts navigation stack.
//!
//! Deleting asks for confirmation with an alert. Once confirmed the detail
//! tells its parent to delete the contact and pops itself.

use crate::Contact;
use composable_core::composition::{EmptyReducer, ReducerExt};
use composable_core::presentation::IfLet;
use composable_core::{
    AlertButton, AlertState, Dependencies, Effect, PresentationAction, Reducer, SmallVec, case_path, smallvec,
};

/// Contact detail state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDetailState {
    /// The contact shown
    pub contact: Contact,
    /// Delete confirmation, while shown
    pub alert: Option<AlertState<ContactDetailAlert>>,
}

impl ContactDetailState {
    /// Detail for `contact` with nothing presented
    #[must_use]
    pub const fn new(contact: Contact) -> Self {
        Self { contact, alert: None }
    }
}

/// Actions of the delete confirmation alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactDetailAlert {
    /// "Delete" confirmed
    ConfirmDeletion,
}

/// Contact detail actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactDetailAction {
    /// "Delete" tapped
    DeleteButtonTapped,
    /// The alert
    Alert(PresentationAction<ContactDetailAlert>),
    /// Messages for the presenting feature
    Delegate(ContactDetailDelegate),
}

/// What the detail tells its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactDetailDelegate {
    /// Delete the contact shown
    ConfirmDeletion,
}

/// The alert shown before deleting
#[must_use]
pub fn delete_confirmation() -> AlertState<ContactDetailAlert> {
    AlertState::new("Are you sure?")
        .with_button(AlertButton::destructive("Delete", ContactDetailAlert::ConfirmDeletion))
        .with_button(AlertButton::cancel("Cancel"))
}

/// The detail's own logic, before the alert is attached
#[derive(Debug, Clone, Copy, Default)]
struct DetailCore;

/// Contact detail reducer
pub struct ContactDetailReducer {
    inner: IfLet<DetailCore, EmptyReducer<AlertState<ContactDetailAlert>, ContactDetailAlert, Dependencies>>,
}

impl ContactDetailReducer {
    /// Create the reducer
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DetailCore.if_let(
                |state: &mut ContactDetailState| &mut state.alert,
                case_path!(ContactDetailAction::Alert),
                EmptyReducer::new(),
            ),
        }
    }
}

impl Default for ContactDetailReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for ContactDetailReducer {
    type State = ContactDetailState;
    type Action = ContactDetailAction;
    type Environment = Dependencies;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        deps: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        self.inner.reduce(state, action, deps)
    }
}

impl Reducer for DetailCore {
    type State = ContactDetailState;
    type Action = ContactDetailAction;
    type Environment = Dependencies;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _deps: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ContactDetailAction::DeleteButtonTapped => {
                state.alert = Some(delete_confirmation());
                smallvec![]
            },
            ContactDetailAction::Alert(PresentationAction::Presented(ContactDetailAlert::ConfirmDeletion)) => {
                // Any button closes the alert.
                state.alert = None;
                smallvec![Effect::run(|send| async move {
                    send.send(ContactDetailAction::Delegate(ContactDetailDelegate::ConfirmDeletion))
                        .await;
                    send.dismiss().await;
                })]
            },
            ContactDetailAction::Alert(PresentationAction::Dismiss) | ContactDetailAction::Delegate(_) => {
                smallvec![]
            },
        }
    }
}
