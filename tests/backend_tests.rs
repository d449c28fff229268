// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use async_trait::async_trait;
use chrono::Utc;
use duocash::backend::{Backend, LocalBackend, Subscription};
use duocash::db::open_in_memory;
use duocash::error::StoreError;
use duocash::feed::{ChangeEvent, ChangeKind};
use duocash::models::{Collection, NewTransaction, TransactionKind};
use duocash::mutations::{BackendMutations, Mutations};
use duocash::saga::ContributionSaga;
use duocash::store::{SyncState, SyncStore};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn setup() -> LocalBackend {
    let conn = open_in_memory().unwrap();
    for id in ["c1", "c2"] {
        conn.execute(
            "INSERT INTO couples(id, name) VALUES (?1, 'Home')",
            rusqlite::params![id],
        )
        .unwrap();
    }
    LocalBackend::new(conn)
}

async fn next(sub: &mut Subscription) -> ChangeEvent {
    tokio::time::timeout(Duration::from_secs(2), sub.recv())
        .await
        .expect("no change event")
        .expect("feed closed")
        .expect("feed lagged")
}

async fn settle(store: &SyncStore, f: impl Fn(&SyncState) -> bool) -> SyncState {
    let mut rx = store.watch();
    let state = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| f(s)))
        .await
        .expect("state never reached")
        .expect("store dropped")
        .clone();
    state
}

#[tokio::test]
async fn writes_publish_insert_update_and_delete() {
    let backend = setup();
    let mut sub = backend.subscribe(Collection::Goals, "c1").await.unwrap();

    let row = backend
        .insert(Collection::Goals, "c1", json!({ "id": "g1", "title": "Trip" }))
        .await
        .unwrap();
    assert_eq!(row["couple_id"], "c1");
    let inserted = next(&mut sub).await;
    assert_eq!(inserted.kind, ChangeKind::Insert);
    assert_eq!(inserted.new.as_ref().unwrap()["title"], "Trip");

    backend
        .insert(Collection::Goals, "c1", json!({ "id": "g1", "title": "Trip 2" }))
        .await
        .unwrap();
    let replaced = next(&mut sub).await;
    assert_eq!(replaced.kind, ChangeKind::Update);
    assert_eq!(replaced.old.as_ref().unwrap()["title"], "Trip");

    let merged = backend
        .update(Collection::Goals, "c1", "g1", json!({ "current_amount": 10, "id": "x" }))
        .await
        .unwrap();
    assert_eq!(merged["id"], "g1");
    assert_eq!(merged["title"], "Trip 2");
    assert_eq!(merged["current_amount"], 10);
    assert_eq!(next(&mut sub).await.kind, ChangeKind::Update);

    backend.delete(Collection::Goals, "c1", "missing").await.unwrap();
    backend.delete(Collection::Goals, "c1", "g1").await.unwrap();
    let deleted = next(&mut sub).await;
    assert_eq!(deleted.kind, ChangeKind::Delete);
    assert_eq!(deleted.old.as_ref().unwrap()["id"], "g1");
    assert!(backend.fetch(Collection::Goals, "c1").await.unwrap().is_empty());
}

#[tokio::test]
async fn subscriptions_are_scoped_to_collection_and_couple() {
    let backend = setup();
    let mut sub = backend.subscribe(Collection::Tasks, "c1").await.unwrap();
    backend
        .insert(Collection::Tasks, "c2", json!({ "title": "theirs" }))
        .await
        .unwrap();
    backend
        .insert(Collection::Goals, "c1", json!({ "title": "other collection" }))
        .await
        .unwrap();
    backend
        .insert(Collection::Tasks, "c1", json!({ "title": "ours" }))
        .await
        .unwrap();
    let event = next(&mut sub).await;
    assert_eq!(event.couple_id, "c1");
    assert_eq!(event.new.as_ref().unwrap()["title"], "ours");
}

#[tokio::test]
async fn updating_a_missing_row_is_not_found() {
    let backend = setup();
    let err = backend
        .update(Collection::Tasks, "c1", "nope", json!({ "completed": true }))
        .await;
    assert!(err.is_err());
}

#[tokio::test]
async fn mutations_reach_the_store_through_the_feed() {
    let backend = setup();
    let shared: Arc<dyn Backend> = Arc::new(backend.clone());
    let store = SyncStore::new(Arc::clone(&shared));
    store.open("c1");
    store.ready().await;

    let mutations = BackendMutations::new(Arc::clone(&shared), "c1", None);
    mutations
        .create_transaction(NewTransaction {
            id: None,
            amount: Decimal::from(150),
            category: "Jantar".into(),
            description: String::new(),
            kind: TransactionKind::Expense,
            date: Utc::now(),
        })
        .await
        .unwrap();
    let state = settle(&store, |s| s.snapshot.transactions.len() == 1).await;
    assert_eq!(state.snapshot.transactions[0].category, "Jantar");
    assert_eq!(state.snapshot.balance(), Decimal::from(-150));
    store.close();
}

#[tokio::test]
async fn contribution_saga_updates_the_live_goal() {
    let backend = setup();
    let shared: Arc<dyn Backend> = Arc::new(backend.clone());
    backend
        .insert(
            Collection::Goals,
            "c1",
            json!({
                "id": "g1",
                "title": "Viagem",
                "target_amount": 1000,
                "current_amount": 800,
                "status": "in-progress"
            }),
        )
        .await
        .unwrap();
    let store = SyncStore::new(Arc::clone(&shared));
    store.open("c1");
    let state = store.ready().await;
    let goal = state.snapshot.goal("g1").unwrap().clone();

    let mutations = BackendMutations::new(Arc::clone(&shared), "c1", None);
    let mut saga = ContributionSaga::new(&goal, Decimal::from(200), Utc::now()).unwrap();
    assert!(saga.run(&mutations).await.is_completed());

    let state = settle(&store, |s| {
        s.snapshot
            .goal("g1")
            .is_some_and(|g| g.current_amount == Decimal::from(1000))
            && s.snapshot.transactions.len() == 1
    })
    .await;
    assert_eq!(state.snapshot.transactions[0].amount, Decimal::from(200));
    store.close();
}

#[tokio::test]
async fn same_id_in_two_couples_stays_separate() {
    let backend = setup();
    let mut ours = backend.subscribe(Collection::Transactions, "c1").await.unwrap();
    let mut theirs = backend.subscribe(Collection::Transactions, "c2").await.unwrap();

    backend
        .insert(
            Collection::Transactions,
            "c1",
            json!({ "id": "T1", "amount": "10", "category": "A" }),
        )
        .await
        .unwrap();
    assert_eq!(next(&mut ours).await.kind, ChangeKind::Insert);

    backend
        .insert(
            Collection::Transactions,
            "c2",
            json!({ "id": "T1", "amount": "999", "category": "B" }),
        )
        .await
        .unwrap();
    assert_eq!(next(&mut theirs).await.kind, ChangeKind::Insert);

    let c1 = backend.fetch(Collection::Transactions, "c1").await.unwrap();
    let c2 = backend.fetch(Collection::Transactions, "c2").await.unwrap();
    assert_eq!(c1.len(), 1);
    assert_eq!(c1[0]["amount"], "10");
    assert_eq!(c1[0]["couple_id"], "c1");
    assert_eq!(c2.len(), 1);
    assert_eq!(c2[0]["amount"], "999");

    backend.delete(Collection::Transactions, "c2", "T1").await.unwrap();
    assert_eq!(backend.fetch(Collection::Transactions, "c1").await.unwrap().len(), 1);
    // c1 never heard about any of c2's writes.
    let quiet = tokio::time::timeout(Duration::from_millis(50), ours.recv()).await;
    assert!(quiet.is_err());
}

/// Commits a transaction right after the first transactions fetch has
/// read the table, before the store has seen it.
struct WriteAfterFetch {
    inner: LocalBackend,
    fired: AtomicBool,
}

#[async_trait]
impl Backend for WriteAfterFetch {
    async fn fetch(&self, collection: Collection, couple_id: &str) -> Result<Vec<Value>, StoreError> {
        let rows = self.inner.fetch(collection, couple_id).await?;
        if collection == Collection::Transactions && !self.fired.swap(true, Ordering::SeqCst) {
            self.inner
                .insert(
                    collection,
                    couple_id,
                    json!({
                        "id": "late",
                        "amount": "42",
                        "category": "Food",
                        "type": "expense",
                        "date": "2025-03-01T12:00:00Z"
                    }),
                )
                .await?;
        }
        Ok(rows)
    }

    async fn subscribe(
        &self,
        collection: Collection,
        couple_id: &str,
    ) -> Result<Subscription, StoreError> {
        self.inner.subscribe(collection, couple_id).await
    }

    async fn insert(
        &self,
        collection: Collection,
        couple_id: &str,
        row: Value,
    ) -> Result<Value, StoreError> {
        self.inner.insert(collection, couple_id, row).await
    }

    async fn update(
        &self,
        collection: Collection,
        couple_id: &str,
        id: &str,
        patch: Value,
    ) -> Result<Value, StoreError> {
        self.inner.update(collection, couple_id, id, patch).await
    }

    async fn delete(&self, collection: Collection, couple_id: &str, id: &str)
    -> Result<(), StoreError> {
        self.inner.delete(collection, couple_id, id).await
    }
}

#[tokio::test]
async fn write_committed_during_the_initial_load_is_not_lost() {
    let shared: Arc<dyn Backend> = Arc::new(WriteAfterFetch {
        inner: setup(),
        fired: AtomicBool::new(false),
    });
    let store = SyncStore::new(shared);
    store.open("c1");
    let state = settle(&store, |s| !s.loading && s.snapshot.transactions.len() == 1).await;
    assert!(state.error.is_none());
    assert_eq!(state.snapshot.transactions[0].id, "late");
    store.close();
}
