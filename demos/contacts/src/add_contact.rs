//! Sheet for entering a new contact.
//!
//! The sheet never touches the contact list itself: saving tells the parent
//! through a delegate action, then asks to be dismissed.

use crate::Contact;
use composable_core::{Dependencies, Effect, Reducer, SmallVec, smallvec};

/// Add-contact state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddContactState {
    /// The contact being edited
    pub contact: Contact,
}

/// Add-contact actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddContactAction {
    /// The name field changed
    SetName(String),
    /// "Save" tapped
    SaveButtonTapped,
    /// "Cancel" tapped
    CancelButtonTapped,
    /// Messages for the presenting feature
    Delegate(AddContactDelegate),
}

/// What the sheet tells its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddContactDelegate {
    /// Add this contact
    SaveContact(Contact),
}

/// Add-contact reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct AddContactReducer;

impl Reducer for AddContactReducer {
    type State = AddContactState;
    type Action = AddContactAction;
    type Environment = Dependencies;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _deps: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AddContactAction::SetName(name) => {
                state.contact.name = name;
                smallvec![]
            },
            AddContactAction::SaveButtonTapped => {
                let contact = state.contact.clone();
                smallvec![Effect::run(move |send| async move {
                    send.send(AddContactAction::Delegate(AddContactDelegate::SaveContact(contact)))
                        .await;
                    send.dismiss().await;
                })]
            },
            AddContactAction::CancelButtonTapped => {
                smallvec![Effect::run(|send| async move { send.dismiss().await })]
            },
            // Handled by the parent.
            AddContactAction::Delegate(_) => smallvec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn state() -> AddContactState {
        AddContactState {
            contact: Contact::new(Uuid::nil(), ""),
        }
    }

    #[test]
    fn set_name_edits_the_contact() {
        let mut state = state();
        let effects = AddContactReducer.reduce(&mut state, AddContactAction::SetName("Blob".into()), &Dependencies::test());

        assert_eq!(state.contact.name, "Blob");
        assert!(effects.is_empty());
    }

    #[test]
    fn save_and_cancel_only_describe_work() {
        let deps = Dependencies::test();
        let mut state = state();

        for action in [AddContactAction::SaveButtonTapped, AddContactAction::CancelButtonTapped] {
            let effects = AddContactReducer.reduce(&mut state, action, &deps);
            assert!(matches!(effects.as_slice(), [Effect::Run(_)]));
        }
        assert_eq!(state, self::state());
    }
}
