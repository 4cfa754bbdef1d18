//! The contact list.
//!
//! Presents at most one destination at a time (the add-contact sheet or the
//! delete confirmation) and keeps a navigation stack of contact details.

use crate::Contact;
use crate::add_contact::{AddContactAction, AddContactDelegate, AddContactReducer, AddContactState};
use crate::contact_detail::{ContactDetailAction, ContactDetailDelegate, ContactDetailReducer, ContactDetailState};
use composable_core::composition::{Reduce, ReducerExt, Scope};
use composable_core::dependencies::UuidKey;
use composable_core::{
    AlertButton, AlertState, Dependencies, Effect, IdentifiedVec, PresentationAction, Reducer, SmallVec,
    StackAction, StackState, case_path, smallvec,
};
use uuid::Uuid;

/// Contacts state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactsState {
    /// All contacts, in insertion order
    pub contacts: IdentifiedVec<Contact>,
    /// What is presented over the list, if anything
    pub destination: Option<Destination>,
    /// Pushed contact details
    pub path: StackState<ContactDetailState>,
}

/// Everything the list can present
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The add-contact sheet
    AddContact(AddContactState),
    /// Delete confirmation
    Alert(AlertState<ContactsAlert>),
}

/// Actions of the list's alerts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactsAlert {
    /// Delete the contact with this id
    ConfirmDeletion(Uuid),
}

/// Actions of the presented destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationAction {
    /// The add-contact sheet
    AddContact(AddContactAction),
    /// The alert
    Alert(ContactsAlert),
}

/// Contacts actions
#[derive(Debug, Clone, PartialEq)]
pub enum ContactsAction {
    /// "+" tapped
    AddButtonTapped,
    /// Trash icon tapped on a row
    DeleteButtonTapped(Uuid),
    /// The presented destination
    Destination(PresentationAction<DestinationAction>),
    /// The navigation stack
    Path(StackAction<ContactDetailState, ContactDetailAction>),
}

/// The alert shown before deleting contact `id`
#[must_use]
pub fn delete_confirmation(id: Uuid) -> AlertState<ContactsAlert> {
    AlertState::new("Are you sure?")
        .with_button(AlertButton::destructive("Delete", ContactsAlert::ConfirmDeletion(id)))
        .with_button(AlertButton::cancel("Cancel"))
}

fn add_contact_state(destination: &mut Destination) -> Option<&mut AddContactState> {
    match destination {
        Destination::AddContact(state) => Some(state),
        Destination::Alert(_) => None,
    }
}

/// Runs the presented destination's feature
///
/// Alerts have no logic of their own; only the sheet is scoped.
fn destination_reducer()
-> impl Reducer<State = Destination, Action = DestinationAction, Environment = Dependencies> + Send + Sync {
    Scope::case(add_contact_state, case_path!(DestinationAction::AddContact), AddContactReducer)
}

/// Build the contacts reducer
///
/// The list's own logic runs after the presented destination and after the
/// addressed stack element, so it sees their delegate actions.
#[must_use]
pub fn contacts_reducer()
-> impl Reducer<State = ContactsState, Action = ContactsAction, Environment = Dependencies> + Send + Sync {
    Reduce::new(reduce_contacts)
        .if_let(
            |state: &mut ContactsState| &mut state.destination,
            case_path!(ContactsAction::Destination),
            destination_reducer(),
        )
        .for_each_stack(
            |state: &mut ContactsState| &mut state.path,
            case_path!(ContactsAction::Path),
            ContactDetailReducer::new(),
        )
}

fn reduce_contacts(
    state: &mut ContactsState,
    action: ContactsAction,
    deps: &Dependencies,
) -> SmallVec<[Effect<ContactsAction>; 4]> {
    match action {
        ContactsAction::AddButtonTapped => {
            let id = deps.get::<UuidKey>().next();
            state.destination = Some(Destination::AddContact(AddContactState {
                contact: Contact::new(id, ""),
            }));
            smallvec![]
        },
        ContactsAction::DeleteButtonTapped(id) => {
            state.destination = Some(Destination::Alert(delete_confirmation(id)));
            smallvec![]
        },
        ContactsAction::Destination(PresentationAction::Presented(DestinationAction::AddContact(
            AddContactAction::Delegate(AddContactDelegate::SaveContact(contact)),
        ))) => {
            state.contacts.append(contact);
            smallvec![]
        },
        ContactsAction::Destination(PresentationAction::Presented(DestinationAction::Alert(
            ContactsAlert::ConfirmDeletion(id),
        ))) => {
            state.contacts.remove(&id);
            // Any button closes the alert.
            state.destination = None;
            smallvec![]
        },
        ContactsAction::Path(StackAction::Element {
            id,
            action: ContactDetailAction::Delegate(ContactDetailDelegate::ConfirmDeletion),
        }) => {
            if let Some(contact_id) = state.path.get(id).map(|detail| detail.contact.id) {
                state.contacts.remove(&contact_id);
            }
            smallvec![]
        },
        ContactsAction::Destination(_) | ContactsAction::Path(_) => smallvec![],
    }
}
