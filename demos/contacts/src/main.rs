//! Contacts example binary
//!
//! Adds a few contacts through the add-contact sheet, deletes one from its
//! detail screen, and prints the remaining list as JSON.

use composable_core::{Dependencies, PresentationAction, StackAction};
use composable_runtime::{Store, metrics};
use contacts::{
    AddContactAction, Contact, ContactDetailAction, ContactDetailAlert, ContactDetailState, ContactsAction,
    ContactsState, DestinationAction, contacts_reducer,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn sheet(action: AddContactAction) -> ContactsAction {
    ContactsAction::Destination(PresentationAction::Presented(DestinationAction::AddContact(action)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contacts=debug,composable_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    metrics::describe_metrics();

    println!("=== Contacts Example ===\n");

    let store = Store::new(ContactsState::default(), contacts_reducer(), Dependencies::live());

    for name in ["Blob", "Blob Jr.", "Blob Sr."] {
        println!(">>> Adding {name}");
        store.send(ContactsAction::AddButtonTapped).await?;
        store.send(sheet(AddContactAction::SetName(name.to_string()))).await?;
        // Saving sends the delegate action and dismisses the sheet from an effect.
        store
            .send(sheet(AddContactAction::SaveButtonTapped))
            .await?
            .wait_with_timeout(Duration::from_secs(1))
            .await?;
    }
    println!(
        "Sheet dismissed: {}",
        store.state(|s| s.destination.is_none()).await
    );

    let Some(junior) = store.state(|s| s.contacts.get_index(1).cloned()).await else {
        anyhow::bail!("expected at least two contacts");
    };

    println!("\n>>> Opening {} and deleting it", junior.name);
    let id = store.state(|s| s.path.next_id()).await;
    store
        .send(ContactsAction::Path(StackAction::Push {
            id,
            state: ContactDetailState::new(junior),
        }))
        .await?;
    store
        .send(ContactsAction::Path(StackAction::Element {
            id,
            action: ContactDetailAction::DeleteButtonTapped,
        }))
        .await?;
    store
        .send(ContactsAction::Path(StackAction::Element {
            id,
            action: ContactDetailAction::Alert(PresentationAction::Presented(ContactDetailAlert::ConfirmDeletion)),
        }))
        .await?
        .wait_with_timeout(Duration::from_secs(1))
        .await?;
    println!("Detail popped: {}", store.state(|s| s.path.is_empty()).await);

    let contacts: Vec<Contact> = store.state(|s| s.contacts.iter().cloned().collect()).await;
    println!("\nContacts:\n{}", serde_json::to_string_pretty(&contacts)?);

    store.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
