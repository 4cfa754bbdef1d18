//! # Contacts Example
//!
//! A contact list showing the presentation tools of the architecture.
//!
//! This example showcases:
//! - A sheet (add contact) and an alert (delete confirmation) modeled as one
//!   optional destination enum
//! - Child-to-parent communication through delegate actions
//! - Children dismissing themselves from effects
//! - A navigation stack of contact details
//! - Deterministic ids through the `UuidKey` dependency

use composable_core::Identifiable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The add-contact sheet
pub mod add_contact;

/// The contact detail screen
pub mod contact_detail;

/// The contact list
pub mod contacts;

pub use add_contact::{AddContactAction, AddContactDelegate, AddContactReducer, AddContactState};
pub use contact_detail::{
    ContactDetailAction, ContactDetailAlert, ContactDetailDelegate, ContactDetailReducer, ContactDetailState,
};
pub use contacts::{
    ContactsAction, ContactsAlert, ContactsState, Destination, DestinationAction, contacts_reducer,
};

/// A contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Stable identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
}

impl Contact {
    /// Create a contact
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

impl Identifiable for Contact {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }
}
