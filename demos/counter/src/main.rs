//! Counter example binary
//!
//! Drives the two-tab counter app against live dependencies: a real clock
//! for the timer and the HTTP number-fact service.

use composable_core::Dependencies;
use composable_runtime::{Store, metrics};
use counter::{AppAction, AppState, CounterAction, app_reducer};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter=debug,composable_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    metrics::describe_metrics();

    println!("=== Counter Example: two tabs, one store ===\n");

    let store = Store::new(AppState::default(), app_reducer(), Dependencies::live());
    let tab1 = store.scope(|app: &AppState| &app.tab1, AppAction::Tab1);
    let tab2 = store.scope(|app: &AppState| &app.tab2, AppAction::Tab2);

    println!(">>> Tab 1: + +   Tab 2: -");
    tab1.send(CounterAction::IncrementButtonTapped).await?;
    tab1.send(CounterAction::IncrementButtonTapped).await?;
    tab2.send(CounterAction::DecrementButtonTapped).await?;
    println!(
        "Tab 1 count: {}, Tab 2 count: {}",
        tab1.state(|s| s.count).await,
        tab2.state(|s| s.count).await
    );

    println!("\n>>> Tab 1: start timer, let it tick for a few seconds");
    tab1.send(CounterAction::ToggleTimerButtonTapped).await?;
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    tab1.send(CounterAction::ToggleTimerButtonTapped).await?;
    println!(
        "Tab 1 count after timer: {} (timer running: {})",
        tab1.state(|s| s.count).await,
        tab1.state(|s| s.is_timer_running).await
    );

    println!("\n>>> Tab 2: fetch a fact");
    let response = store
        .send_and_wait_for(
            AppAction::Tab2(CounterAction::FactButtonTapped),
            |action| {
                matches!(
                    action,
                    AppAction::Tab2(CounterAction::FactResponse(_) | CounterAction::FactResponseFailed(_))
                )
            },
            Duration::from_secs(15),
        )
        .await;

    match response {
        Ok(AppAction::Tab2(CounterAction::FactResponseFailed(error))) => println!("Fact request failed: {error}"),
        Ok(_) => println!("Fact: {}", tab2.state(|s| s.fact.clone()).await.unwrap_or_default()),
        Err(error) => println!("No fact arrived: {error}"),
    }

    let state = store.snapshot().await;
    println!("\nFinal state:\n{state:#?}");

    store.shutdown(Duration::from_secs(5)).await?;
    println!("\n=== Store shut down cleanly ===");
    Ok(())
}
