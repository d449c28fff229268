// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Storage and change-feed access for the synced collections.

use crate::error::StoreError;
use crate::feed::ChangeEvent;
use crate::models::Collection;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// One item on a subscription. An `Err` means the stream lost events and
/// ends; the consumer has to reload before trusting its projection again.
pub type FeedItem = Result<ChangeEvent, StoreError>;

/// Live stream of change events for one collection in one couple scope.
pub struct Subscription {
    pub collection: Collection,
    receiver: mpsc::UnboundedReceiver<FeedItem>,
    forwarder: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(collection: Collection, receiver: mpsc::UnboundedReceiver<FeedItem>) -> Self {
        Self {
            collection,
            receiver,
            forwarder: None,
        }
    }

    pub async fn recv(&mut self) -> Option<FeedItem> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.forwarder.take() {
            handle.abort();
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// All rows of `collection` owned by `couple_id`, oldest first.
    async fn fetch(&self, collection: Collection, couple_id: &str) -> Result<Vec<Value>, StoreError>;

    async fn subscribe(
        &self,
        collection: Collection,
        couple_id: &str,
    ) -> Result<Subscription, StoreError>;

    /// Writes a row. A row whose `id` already exists replaces it.
    async fn insert(
        &self,
        collection: Collection,
        couple_id: &str,
        row: Value,
    ) -> Result<Value, StoreError>;

    /// Merges the top-level fields of `patch` into an existing row.
    async fn update(
        &self,
        collection: Collection,
        couple_id: &str,
        id: &str,
        patch: Value,
    ) -> Result<Value, StoreError>;

    async fn delete(&self, collection: Collection, couple_id: &str, id: &str)
    -> Result<(), StoreError>;
}

const FEED_CAPACITY: usize = 1024;

/// SQLite-backed store that publishes a change event after every write.
#[derive(Clone)]
pub struct LocalBackend {
    conn: Arc<Mutex<Connection>>,
    feed: broadcast::Sender<ChangeEvent>,
}

impl LocalBackend {
    pub fn new(conn: Connection) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            feed,
        }
    }

    /// Runs `f` against the underlying connection.
    pub fn with_conn<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        let guard = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    /// Like [`LocalBackend::with_conn`], for callers that open a transaction.
    pub fn with_conn_mut<R>(&self, f: impl FnOnce(&mut Connection) -> R) -> R {
        let mut guard = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn publish(&self, event: ChangeEvent) {
        debug!(
            collection = %event.collection,
            kind = event.kind.as_str(),
            couple = %event.couple_id,
            "publishing change"
        );
        // No live subscribers is not an error.
        let _ = self.feed.send(event);
    }

    fn load(
        conn: &Connection,
        collection: Collection,
        couple_id: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM records WHERE collection=?1 AND id=?2 AND couple_id=?3",
                params![collection.as_str(), id, couple_id],
                |r| r.get(0),
            )
            .optional()?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    fn store(
        conn: &Connection,
        collection: Collection,
        couple_id: &str,
        id: &str,
        row: &Value,
    ) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO records(collection, id, couple_id, body) VALUES (?1,?2,?3,?4)
             ON CONFLICT(collection, couple_id, id) DO UPDATE SET body=excluded.body, updated_at=datetime('now')",
            params![collection.as_str(), id, couple_id, serde_json::to_string(row)?],
        )?;
        Ok(())
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn fetch(&self, collection: Collection, couple_id: &str) -> Result<Vec<Value>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT body FROM records WHERE collection=?1 AND couple_id=?2 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![collection.as_str(), couple_id], |r| {
                r.get::<_, String>(0)
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(serde_json::from_str(&row?)?);
            }
            Ok(out)
        })
    }

    async fn subscribe(
        &self,
        collection: Collection,
        couple_id: &str,
    ) -> Result<Subscription, StoreError> {
        let mut feed = self.feed.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        let scope = couple_id.to_string();
        let forwarder = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    msg = feed.recv() => match msg {
                        Ok(event) => {
                            if event.collection != collection || event.couple_id != scope {
                                continue;
                            }
                            if tx.send(Ok(event)).is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(%collection, skipped, "change feed subscriber lagged");
                            let _ = tx.send(Err(StoreError::Lagged { collection, skipped }));
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
        let mut sub = Subscription::new(collection, rx);
        sub.forwarder = Some(forwarder);
        Ok(sub)
    }

    async fn insert(
        &self,
        collection: Collection,
        couple_id: &str,
        mut row: Value,
    ) -> Result<Value, StoreError> {
        let obj = row
            .as_object_mut()
            .ok_or_else(|| StoreError::Unavailable("row must be a JSON object".into()))?;
        let id = match obj.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        obj.insert("id".into(), Value::String(id.clone()));
        obj.insert("couple_id".into(), Value::String(couple_id.to_string()));

        let previous = self.with_conn(|conn| {
            let previous = Self::load(conn, collection, couple_id, &id)?;
            Self::store(conn, collection, couple_id, &id, &row)?;
            Ok::<_, StoreError>(previous)
        })?;
        let event = match previous {
            Some(old) => ChangeEvent::update(collection, couple_id, Some(old), row.clone()),
            None => ChangeEvent::insert(collection, couple_id, row.clone()),
        };
        self.publish(event);
        Ok(row)
    }

    async fn update(
        &self,
        collection: Collection,
        couple_id: &str,
        id: &str,
        patch: Value,
    ) -> Result<Value, StoreError> {
        let (old, new) = self.with_conn(|conn| {
            let old = Self::load(conn, collection, couple_id, id)?.ok_or_else(|| {
                StoreError::NotFound {
                    collection,
                    id: id.to_string(),
                }
            })?;
            let mut new = old.clone();
            if let (Some(target), Some(fields)) = (new.as_object_mut(), patch.as_object()) {
                for (k, v) in fields {
                    if k == "id" || k == "couple_id" {
                        continue;
                    }
                    target.insert(k.clone(), v.clone());
                }
            }
            Self::store(conn, collection, couple_id, id, &new)?;
            Ok::<_, StoreError>((old, new))
        })?;
        self.publish(ChangeEvent::update(collection, couple_id, Some(old), new.clone()));
        Ok(new)
    }

    async fn delete(
        &self,
        collection: Collection,
        couple_id: &str,
        id: &str,
    ) -> Result<(), StoreError> {
        let old = self.with_conn(|conn| {
            let old = Self::load(conn, collection, couple_id, id)?;
            conn.execute(
                "DELETE FROM records WHERE collection=?1 AND id=?2 AND couple_id=?3",
                params![collection.as_str(), id, couple_id],
            )?;
            Ok::<_, StoreError>(old)
        })?;
        if let Some(old) = old {
            self.publish(ChangeEvent::delete(collection, couple_id, old));
        }
        Ok(())
    }
}
