//! Admin Console Example
//!
//! Wires a handful of console resources into a registry and walks through
//! what a session does with them: browsing, switching filters faster than
//! the backend answers, retrying a failure and signing out.
//!
//! Run with: cargo run --example admin_console
//! Fixtures instead of the simulated backend: MILLPOND_MOCK=1 cargo run --example admin_console

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use millpond::prelude::*;
use millpond::RegistryError;
use tokio::time::sleep;

// =============================================================================
// Simulated backend
// =============================================================================

async fn list_studies(_: ()) -> Result<Vec<String>, String> {
    sleep(Duration::from_millis(40)).await;
    Ok(vec![
        "Sleep and memory".to_string(),
        "Reading speed".to_string(),
        "Bilingual attention".to_string(),
    ])
}

/// Older studies live in the archive and take much longer to list.
async fn list_participants(study: u32) -> Result<Vec<String>, String> {
    let latency = if study < 10 { 400 } else { 30 };
    sleep(Duration::from_millis(latency)).await;
    Ok((1..=3).map(|n| format!("P{}-{:02}", study, n)).collect())
}

fn flaky_publications(online: Arc<AtomicBool>) -> impl Fetcher<u32, Vec<String>, String> {
    move |study: u32| {
        let online = online.clone();
        async move {
            sleep(Duration::from_millis(20)).await;
            if online.load(Ordering::SeqCst) {
                Ok(vec![format!("Results of study {}", study)])
            } else {
                Err("publication index offline".to_string())
            }
        }
    }
}

fn register_all(registry: &Registry, publications_online: Arc<AtomicBool>) -> Result<(), RegistryError> {
    registry.register_with(
        "studies",
        ResourceOptions::new(list_studies)
            .with_fixture(Fixture::value(vec!["Demo study".to_string()])),
    )?;
    registry.register_with(
        "participants",
        ResourceOptions::new(list_participants).with_fixture(
            Fixture::from_fn(|study: u32| Ok::<Vec<String>, String>(vec![format!("Demo P{}", study)]))
                .with_latency(Duration::from_millis(25)),
        ),
    )?;
    registry.register_with(
        "publications",
        ResourceOptions::new(flaky_publications(publications_online))
            .with_fixture(Fixture::value(vec!["Demo publication".to_string()])),
    )?;
    Ok(())
}

// =============================================================================
// Session
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = Config::from_env()?;
    tracing::info!(mock = config.mock(), "starting admin console");

    let registry = Registry::new(config);
    let publications_online = Arc::new(AtomicBool::new(false));
    register_all(&registry, publications_online.clone())?;

    let studies = registry.get::<(), Vec<String>, String>("studies")?;
    let participants = registry.get::<u32, Vec<String>, String>("participants")?;
    let publications = registry.get::<u32, Vec<String>, String>("publications")?;

    println!("\n=== Browsing ===");
    studies.request((), false);
    let listed = studies.subscribe().wait_settled().await;
    println!("studies: {:?}", listed.and_then(|s| s.data().cloned()));

    println!("\n=== Switching filters ===");
    // Study 3 is archived and slow; the user moves on to study 12 before it answers.
    participants.request(3, false);
    participants.request(12, false);
    let shown = participants.subscribe().wait_settled().await;
    println!("participants: {:?}", shown.and_then(|s| s.data().cloned()));

    sleep(Duration::from_millis(500)).await;
    println!(
        "after the archive answered: {:?} (args {:?})",
        participants.view().data,
        participants.snapshot().args()
    );

    println!("\n=== Retrying ===");
    publications.request(12, false);
    if let Some(state) = publications.subscribe().wait_settled().await {
        println!("publications: {} {:?}", state.status(), state.error().map(|e| e.to_string()));
    }

    publications_online.store(true, Ordering::SeqCst);
    println!("without force: {:?}", publications.request(12, false));
    println!("with force: {:?}", publications.refresh(12));
    let retried = publications.subscribe().wait_settled().await;
    println!("publications: {:?}", retried.and_then(|s| s.data().cloned()));

    println!("\n=== Signing out ===");
    registry.reset_all();
    for (name, status) in registry.statuses() {
        println!("{:<14} {}", name, status);
    }

    Ok(())
}
