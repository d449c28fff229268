// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

#![allow(dead_code)]

use async_trait::async_trait;
use duocash::assistant::{Completion, CompletionClient, CompletionRequest, ToolInvocation};
use duocash::backend::{Backend, FeedItem, Subscription};
use duocash::error::{AssistantError, StoreError};
use duocash::feed::ChangeEvent;
use duocash::models::{Collection, NewEvent, NewGoal, NewTask, NewTransaction};
use duocash::mutations::Mutations;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Backend double. `emit` delivers to every subscriber of the event's
/// collection without checking the couple, like a leaky transport would.
#[derive(Default)]
pub struct MemoryBackend {
    rows: Mutex<HashMap<(Collection, String), Vec<Value>>>,
    subscribers: Mutex<Vec<(Collection, String, mpsc::UnboundedSender<FeedItem>)>>,
    failing: Mutex<Option<Collection>>,
    fetches: Mutex<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, collection: Collection, couple_id: &str, row: Value) {
        self.rows
            .lock()
            .unwrap()
            .entry((collection, couple_id.to_string()))
            .or_default()
            .push(row);
    }

    pub fn fail_fetch(&self, collection: Collection) {
        *self.failing.lock().unwrap() = Some(collection);
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    pub fn emit(&self, event: ChangeEvent) {
        for (collection, _, tx) in self.subscribers.lock().unwrap().iter() {
            if *collection == event.collection {
                let _ = tx.send(Ok(event.clone()));
            }
        }
    }

    /// Tells every live subscriber of `collection` in `couple_id` that it
    /// missed events.
    pub fn lag(&self, collection: Collection, couple_id: &str) {
        for (c, scope, tx) in self.subscribers.lock().unwrap().iter() {
            if *c == collection && scope == couple_id {
                let _ = tx.send(Err(StoreError::Lagged {
                    collection,
                    skipped: 3,
                }));
            }
        }
    }

    pub fn open_subscriptions(&self, couple_id: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, scope, tx)| scope == couple_id && !tx.is_closed())
            .count()
    }

    /// Polls until `n` live subscriptions exist for `couple_id`.
    pub async fn wait_subscribed(&self, couple_id: &str, n: usize) {
        for _ in 0..200 {
            if self.open_subscriptions(couple_id) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscriptions for {} never reached {}", couple_id, n);
    }

    pub async fn wait_unsubscribed(&self, couple_id: &str) {
        for _ in 0..200 {
            if self.open_subscriptions(couple_id) == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscriptions for {} were never closed", couple_id);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn fetch(&self, collection: Collection, couple_id: &str) -> Result<Vec<Value>, StoreError> {
        *self.fetches.lock().unwrap() += 1;
        if *self.failing.lock().unwrap() == Some(collection) {
            return Err(StoreError::Unavailable(format!("{} offline", collection)));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(collection, couple_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn subscribe(
        &self,
        collection: Collection,
        couple_id: &str,
    ) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap()
            .push((collection, couple_id.to_string(), tx));
        Ok(Subscription::new(collection, rx))
    }

    async fn insert(
        &self,
        collection: Collection,
        couple_id: &str,
        row: Value,
    ) -> Result<Value, StoreError> {
        self.seed(collection, couple_id, row.clone());
        self.emit(ChangeEvent::insert(collection, couple_id, row.clone()));
        Ok(row)
    }

    async fn update(
        &self,
        collection: Collection,
        couple_id: &str,
        id: &str,
        patch: Value,
    ) -> Result<Value, StoreError> {
        Err(StoreError::NotFound {
            collection,
            id: format!("{} in {} ({})", id, couple_id, patch),
        })
    }

    async fn delete(&self, _: Collection, _: &str, _: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Completion double that replays scripted answers and records requests.
#[derive(Default)]
pub struct ScriptedCompletion {
    answers: Mutex<VecDeque<Result<Completion, AssistantError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedCompletion {
    pub fn new(answers: Vec<Result<Completion, AssistantError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AssistantError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Completion::default()))
    }
}

pub fn call(name: &str, args: Value) -> ToolInvocation {
    ToolInvocation {
        name: name.to_string(),
        args,
    }
}

pub fn calls(text: Option<&str>, calls: Vec<ToolInvocation>) -> Completion {
    Completion {
        text: text.map(str::to_string),
        calls,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Transaction(NewTransaction),
    Goal(NewGoal),
    Task(NewTask),
    Event(NewEvent),
    GoalAmount(String, Decimal),
}

/// Mutation double. Failures are injected per operation.
#[derive(Default)]
pub struct RecordingMutations {
    pub log: Mutex<Vec<Recorded>>,
    pub fail_transactions: Mutex<usize>,
    pub fail_goal_updates: Mutex<usize>,
    pub fail_goals: Mutex<bool>,
}

impl RecordingMutations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    fn take_failure(counter: &Mutex<usize>) -> bool {
        let mut n = counter.lock().unwrap();
        if *n > 0 {
            *n -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl Mutations for RecordingMutations {
    async fn create_transaction(&self, input: NewTransaction) -> anyhow::Result<()> {
        if Self::take_failure(&self.fail_transactions) {
            anyhow::bail!("transactions table unavailable");
        }
        let mut log = self.log.lock().unwrap();
        // Same id twice is an upsert, as in the real store.
        if let Some(id) = &input.id {
            log.retain(|r| !matches!(r, Recorded::Transaction(t) if t.id.as_ref() == Some(id)));
        }
        log.push(Recorded::Transaction(input));
        Ok(())
    }

    async fn create_goal(&self, input: NewGoal) -> anyhow::Result<()> {
        if *self.fail_goals.lock().unwrap() {
            anyhow::bail!("goals table unavailable");
        }
        self.log.lock().unwrap().push(Recorded::Goal(input));
        Ok(())
    }

    async fn create_task(&self, input: NewTask) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(Recorded::Task(input));
        Ok(())
    }

    async fn create_event(&self, input: NewEvent) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(Recorded::Event(input));
        Ok(())
    }

    async fn update_goal_amount(&self, goal_id: &str, amount: Decimal) -> anyhow::Result<()> {
        if Self::take_failure(&self.fail_goal_updates) {
            anyhow::bail!("goal update rejected");
        }
        self.log
            .lock()
            .unwrap()
            .push(Recorded::GoalAmount(goal_id.to_string(), amount));
        Ok(())
    }
}

pub fn transaction_row(id: &str, amount: i64, kind: &str, date: &str) -> Value {
    json!({
        "id": id,
        "amount": amount,
        "category": "Food",
        "description": "",
        "date": date,
        "type": kind,
        "user_id": "u1",
    })
}

pub fn goal_row(id: &str, title: &str, current: i64, target: i64) -> Value {
    json!({
        "id": id,
        "title": title,
        "current_amount": current,
        "target_amount": target,
        "deadline": "2026-12-31",
        "status": "in-progress",
        "category": "Travel",
    })
}
