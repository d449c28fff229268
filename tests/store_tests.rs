// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::{MemoryBackend, goal_row, transaction_row};
use duocash::backend::Backend;
use duocash::feed::ChangeEvent;
use duocash::models::Collection;
use duocash::store::{SyncState, SyncStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn store(backend: &Arc<MemoryBackend>) -> SyncStore {
    let b: Arc<dyn Backend> = backend.clone();
    SyncStore::new(b)
}

async fn until(rx: &mut watch::Receiver<SyncState>, f: impl Fn(&SyncState) -> bool) -> SyncState {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| f(s)))
        .await
        .expect("state never reached")
        .expect("store dropped")
        .clone()
}

#[tokio::test]
async fn empty_couple_loads_to_empty_collections() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store(&backend);
    assert!(!store.state().loading);

    store.open("c1");
    assert!(store.state().loading);
    let state = store.ready().await;
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(state.scope.as_deref(), Some("c1"));
    assert!(state.snapshot.transactions.is_empty());
    assert!(state.snapshot.investments.is_empty());
    assert_eq!(backend.fetch_count(), 5);
}

#[tokio::test]
async fn initial_rows_are_loaded_and_sorted() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(
        Collection::Transactions,
        "c1",
        transaction_row("old", 5, "expense", "2025-01-01T00:00:00Z"),
    );
    backend.seed(
        Collection::Transactions,
        "c1",
        transaction_row("new", 7, "income", "2025-02-01T00:00:00Z"),
    );
    // Undecodable rows are skipped, not fatal.
    backend.seed(Collection::Goals, "c1", json!({ "id": "bad", "target_amount": [] }));
    backend.seed(Collection::Goals, "c1", goal_row("g1", "Trip", 0, 100));

    let store = store(&backend);
    store.open("c1");
    let state = store.ready().await;
    let ids: Vec<_> = state.snapshot.transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
    assert_eq!(state.snapshot.goals.len(), 1);
    assert_eq!(state.snapshot.balance().to_string(), "2");
}

#[tokio::test]
async fn one_failed_fetch_fails_the_load_and_releases_subscriptions() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_fetch(Collection::Tasks);
    let store = store(&backend);
    store.open("c1");
    let state = store.ready().await;
    assert!(!state.loading);
    let err = state.error.expect("error recorded");
    assert!(err.contains("tasks"), "{}", err);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(backend.open_subscriptions("c1"), 0);
}

#[tokio::test]
async fn live_events_are_folded_into_the_snapshot() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store(&backend);
    let mut rx = store.watch();
    store.open("c1");
    store.ready().await;
    backend.wait_subscribed("c1", 5).await;

    backend.emit(ChangeEvent::insert(
        Collection::Transactions,
        "c1",
        transaction_row("t1", 150, "expense", "2025-03-01T20:00:00Z"),
    ));
    let state = until(&mut rx, |s| s.snapshot.transactions.len() == 1).await;
    assert_eq!(state.snapshot.transactions[0].id, "t1");

    backend.emit(ChangeEvent::delete(
        Collection::Transactions,
        "c1",
        json!({ "id": "t1" }),
    ));
    until(&mut rx, |s| s.snapshot.transactions.is_empty()).await;
}

#[tokio::test]
async fn lagged_feed_reloads_the_snapshot() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(Collection::Goals, "c1", goal_row("g1", "Trip", 0, 100));
    let store = store(&backend);
    let mut rx = store.watch();
    store.open("c1");
    store.ready().await;
    backend.wait_subscribed("c1", 5).await;

    // Written while the feed was dropping events: only a reload can see it.
    backend.seed(Collection::Goals, "c1", goal_row("g2", "House", 0, 500));
    backend.lag(Collection::Goals, "c1");

    let state = until(&mut rx, |s| s.snapshot.goals.len() == 2).await;
    assert!(state.error.is_none());
    assert!(backend.fetch_count() >= 10);

    // The fresh subscriptions keep following.
    backend.wait_subscribed("c1", 5).await;
    backend.emit(ChangeEvent::insert(
        Collection::Tasks,
        "c1",
        json!({ "id": "k1", "title": "Call bank" }),
    ));
    until(&mut rx, |s| s.snapshot.tasks.len() == 1).await;
}

#[tokio::test]
async fn events_from_another_couple_are_dropped() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store(&backend);
    let mut rx = store.watch();
    store.open("c1");
    store.ready().await;
    backend.wait_subscribed("c1", 5).await;

    backend.emit(ChangeEvent::insert(
        Collection::Goals,
        "intruder",
        goal_row("x", "Not ours", 0, 1),
    ));
    backend.emit(ChangeEvent::insert(
        Collection::Goals,
        "c1",
        goal_row("g1", "Ours", 0, 1),
    ));
    let state = until(&mut rx, |s| !s.snapshot.goals.is_empty()).await;
    let ids: Vec<_> = state.snapshot.goals.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["g1"]);
}

#[tokio::test]
async fn rescope_replaces_state_and_subscriptions() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(Collection::Goals, "c1", goal_row("g1", "Trip", 0, 100));
    backend.seed(Collection::Goals, "c2", goal_row("g2", "House", 0, 100));
    let store = store(&backend);
    let mut rx = store.watch();

    store.open("c1");
    store.ready().await;
    backend.wait_subscribed("c1", 5).await;

    store.rescope("c2");
    let state = until(&mut rx, |s| s.scope.as_deref() == Some("c2") && !s.loading).await;
    assert_eq!(state.snapshot.goals[0].id, "g2");
    backend.wait_unsubscribed("c1").await;

    // Late events for the old scope never reach the new state.
    backend.emit(ChangeEvent::insert(Collection::Goals, "c1", goal_row("late", "Old", 0, 1)));
    tokio::time::sleep(Duration::from_millis(30)).await;
    let goals = store.snapshot().goals;
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].id, "g2");
}

#[tokio::test]
async fn close_stops_all_updates() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store(&backend);
    store.open("c1");
    store.ready().await;
    backend.wait_subscribed("c1", 5).await;

    store.close();
    backend.wait_unsubscribed("c1").await;
    backend.emit(ChangeEvent::insert(Collection::Goals, "c1", goal_row("g", "Late", 0, 1)));
    tokio::time::sleep(Duration::from_millis(30)).await;

    let state = store.state();
    assert!(state.scope.is_none());
    assert!(state.snapshot.goals.is_empty());
}
