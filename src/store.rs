// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The sync store: one couple's five collections, loaded in bulk and then
//! kept current from the change feed. A feed that lost events triggers a
//! fresh load.
//!
//! Every state write goes through [`guarded_update`], which checks the
//! session's liveness flag and generation under the watch lock. A torn-down
//! session can therefore never write into the state of its successor.

use crate::backend::{Backend, Subscription};
use crate::error::StoreError;
use crate::feed::{ChangeEvent, Entity, decode, reduce};
use crate::models::{
    CalendarEvent, Collection, Goal, GoalStatus, Investment, Task, Transaction, TransactionKind,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub transactions: Vec<Transaction>,
    pub goals: Vec<Goal>,
    pub tasks: Vec<Task>,
    pub events: Vec<CalendarEvent>,
    pub investments: Vec<Investment>,
}

impl Snapshot {
    /// Folds one event into the collection it names. Other collections are
    /// left untouched.
    pub fn apply(&mut self, event: &ChangeEvent) -> Result<(), crate::error::FeedError> {
        match event.collection {
            Collection::Transactions => self.transactions = reduce(&self.transactions, event)?,
            Collection::Goals => self.goals = reduce(&self.goals, event)?,
            Collection::Tasks => self.tasks = reduce(&self.tasks, event)?,
            Collection::Events => self.events = reduce(&self.events, event)?,
            Collection::Investments => self.investments = reduce(&self.investments, event)?,
        }
        Ok(())
    }

    /// Income minus expenses over every transaction held.
    pub fn balance(&self) -> Decimal {
        self.transactions
            .iter()
            .fold(Decimal::ZERO, |acc, t| match t.kind {
                TransactionKind::Income => acc + t.amount,
                TransactionKind::Expense => acc - t.amount,
            })
    }

    pub fn recent_transactions(&self, n: usize) -> &[Transaction] {
        &self.transactions[..n.min(self.transactions.len())]
    }

    pub fn in_progress_goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals
            .iter()
            .filter(|g| g.status == GoalStatus::InProgress)
    }

    pub fn goal(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncState {
    pub scope: Option<String>,
    pub snapshot: Snapshot,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pub generation: u64,
}

struct Session {
    alive: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Session {
    fn teardown(self) {
        self.alive.store(false, Ordering::Release);
        self.handle.abort();
    }
}

pub struct SyncStore {
    backend: Arc<dyn Backend>,
    state: Arc<watch::Sender<SyncState>>,
    session: Mutex<Option<Session>>,
    generations: AtomicU64,
}

impl SyncStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            backend,
            state: Arc::new(state),
            session: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    /// Starts syncing `couple_id`, tearing down any previous scope first.
    /// Must be called from within a tokio runtime.
    pub fn open(&self, couple_id: &str) {
        let mut session = self.session.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = session.take() {
            debug!("tearing down previous sync scope");
            previous.teardown();
        }

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(SyncState {
            scope: Some(couple_id.to_string()),
            snapshot: Snapshot::default(),
            loading: true,
            error: None,
            generation,
        });

        let alive = Arc::new(AtomicBool::new(true));
        let ctx = SessionCtx {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            alive: Arc::clone(&alive),
            generation,
            scope: couple_id.to_string(),
        };
        let handle = tokio::spawn(run_session(ctx));
        *session = Some(Session { alive, handle });
    }

    /// Alias for [`SyncStore::open`] that reads better at call sites
    /// switching identity.
    pub fn rescope(&self, couple_id: &str) {
        self.open(couple_id);
    }

    /// Closes every subscription. No state update happens afterwards.
    pub fn close(&self) {
        let mut session = self.session.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = session.take() {
            info!("closing sync store");
            previous.teardown();
        }
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(SyncState {
            generation,
            ..SyncState::default()
        });
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Waits until the initial load of the current scope has settled.
    pub async fn ready(&self) -> SyncState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

impl Drop for SyncStore {
    fn drop(&mut self) {
        let session = self.session.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = session.take() {
            previous.teardown();
        }
    }
}

#[derive(Clone)]
struct SessionCtx {
    backend: Arc<dyn Backend>,
    state: Arc<watch::Sender<SyncState>>,
    alive: Arc<AtomicBool>,
    generation: u64,
    scope: String,
}

impl SessionCtx {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn update(&self, f: impl FnOnce(&mut SyncState) -> bool) -> bool {
        guarded_update(&self.state, &self.alive, self.generation, f)
    }
}

fn guarded_update(
    state: &watch::Sender<SyncState>,
    alive: &AtomicBool,
    generation: u64,
    f: impl FnOnce(&mut SyncState) -> bool,
) -> bool {
    state.send_if_modified(|s| {
        if !alive.load(Ordering::Acquire) || s.generation != generation {
            return false;
        }
        f(s)
    })
}

fn decode_all<E: Entity>(rows: Vec<Value>) -> Vec<E> {
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        match decode::<E>(&row) {
            Ok(entity) => items.push(entity),
            Err(err) => warn!(collection = %E::COLLECTION, "skipping row: {}", err),
        }
    }
    E::sort(&mut items);
    items
}

async fn load_snapshot(ctx: &SessionCtx) -> Result<Snapshot, StoreError> {
    let b = &ctx.backend;
    let scope = ctx.scope.as_str();
    // Wait for all five reads to settle, then fail if any failed.
    let (transactions, goals, tasks, events, investments) = tokio::join!(
        b.fetch(Collection::Transactions, scope),
        b.fetch(Collection::Goals, scope),
        b.fetch(Collection::Tasks, scope),
        b.fetch(Collection::Events, scope),
        b.fetch(Collection::Investments, scope),
    );
    Ok(Snapshot {
        transactions: decode_all(transactions?),
        goals: decode_all(goals?),
        tasks: decode_all(tasks?),
        events: decode_all(events?),
        investments: decode_all(investments?),
    })
}

/// How a follower stopped.
enum FollowEnd {
    Closed,
    Lagged,
}

fn fail(ctx: &SessionCtx, err: &StoreError) {
    ctx.update(|s| {
        s.loading = false;
        s.error = Some(err.to_string());
        true
    });
}

/// Subscribes to every collection, then loads the snapshot. Events that
/// arrive while the fetches run wait in their subscription and are folded
/// in once the snapshot is set, so a write committed between the fetch
/// and the subscribe is never lost. Replaying one the fetch already saw
/// is harmless: the reducer upserts.
async fn attach(ctx: &SessionCtx) -> Option<JoinSet<FollowEnd>> {
    let mut subs = Vec::with_capacity(Collection::ALL.len());
    for collection in Collection::ALL {
        if !ctx.is_alive() {
            return None;
        }
        match ctx.backend.subscribe(collection, &ctx.scope).await {
            Ok(sub) => {
                debug!(%collection, couple = %ctx.scope, "subscribed");
                subs.push(sub);
            }
            Err(err) => {
                error!(%collection, "subscription failed: {}", err);
                fail(ctx, &err);
                return None;
            }
        }
    }

    info!(couple = %ctx.scope, "loading snapshot");
    let snapshot = match load_snapshot(ctx).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!(couple = %ctx.scope, "snapshot load failed: {}", err);
            fail(ctx, &err);
            return None;
        }
    };
    if !ctx.update(|s| {
        s.snapshot = snapshot;
        s.loading = false;
        s.error = None;
        true
    }) {
        return None;
    }

    let mut followers = JoinSet::new();
    for sub in subs {
        followers.spawn(follow(ctx.clone(), sub));
    }
    Some(followers)
}

async fn run_session(ctx: SessionCtx) {
    loop {
        let Some(mut followers) = attach(&ctx).await else {
            return;
        };
        let mut lagged = false;
        while let Some(done) = followers.join_next().await {
            if matches!(done, Ok(FollowEnd::Lagged)) {
                lagged = true;
                break;
            }
        }
        // Old followers must be gone before the reload replaces the snapshot.
        followers.shutdown().await;
        if !lagged || !ctx.is_alive() {
            return;
        }
        warn!(couple = %ctx.scope, "change feed lagged, reloading snapshot");
    }
}

async fn follow(ctx: SessionCtx, mut sub: Subscription) -> FollowEnd {
    let collection = sub.collection;
    while let Some(item) = sub.recv().await {
        if !ctx.is_alive() {
            break;
        }
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                warn!(%collection, "subscription lost events: {}", err);
                return FollowEnd::Lagged;
            }
        };
        if event.couple_id != ctx.scope {
            warn!(
                %collection,
                expected = %ctx.scope,
                got = %event.couple_id,
                "dropping event from another couple"
            );
            continue;
        }
        if event.collection != collection {
            warn!(%collection, got = %event.collection, "dropping event for another collection");
            continue;
        }
        ctx.update(|s| match s.snapshot.apply(&event) {
            Ok(()) => true,
            Err(err) => {
                warn!(%collection, "ignoring change event: {}", err);
                false
            }
        });
    }
    debug!(%collection, "subscription ended");
    FollowEnd::Closed
}
