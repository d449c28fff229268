// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Change-feed events and the per-collection reducer.

use crate::error::FeedError;
use crate::mappers::{map_event, map_goal, map_investment, map_task, map_transaction};
use crate::models::{CalendarEvent, Collection, Goal, Investment, Task, Transaction};
use crate::rows::{EventRow, GoalRow, InvestmentRow, TaskRow, TransactionRow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

/// One insert/update/delete notification from the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub couple_id: String,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

impl ChangeEvent {
    pub fn insert(collection: Collection, couple_id: &str, row: Value) -> Self {
        Self {
            collection,
            kind: ChangeKind::Insert,
            couple_id: couple_id.to_string(),
            new: Some(row),
            old: None,
        }
    }

    pub fn update(collection: Collection, couple_id: &str, old: Option<Value>, row: Value) -> Self {
        Self {
            collection,
            kind: ChangeKind::Update,
            couple_id: couple_id.to_string(),
            new: Some(row),
            old,
        }
    }

    pub fn delete(collection: Collection, couple_id: &str, old: Value) -> Self {
        Self {
            collection,
            kind: ChangeKind::Delete,
            couple_id: couple_id.to_string(),
            new: None,
            old: Some(old),
        }
    }
}

/// An application entity that is projected from a persisted row.
pub trait Entity: Clone + Send + Sync + 'static {
    type Row: DeserializeOwned;

    const COLLECTION: Collection;

    /// Row column used when the primary id cannot identify an entity.
    const SECONDARY_KEY: Option<&'static str> = None;

    fn from_row(row: Self::Row) -> Self;

    fn primary_id(&self) -> Option<&str>;

    fn secondary_key(&self) -> Option<&str> {
        None
    }

    /// Presentation order, re-applied after every event.
    fn sort(_items: &mut [Self]) {}
}

impl Entity for Transaction {
    type Row = TransactionRow;
    const COLLECTION: Collection = Collection::Transactions;

    fn from_row(row: TransactionRow) -> Self {
        map_transaction(row)
    }

    fn primary_id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    fn sort(items: &mut [Self]) {
        items.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

impl Entity for Goal {
    type Row = GoalRow;
    const COLLECTION: Collection = Collection::Goals;

    fn from_row(row: GoalRow) -> Self {
        map_goal(row)
    }

    fn primary_id(&self) -> Option<&str> {
        non_empty(&self.id)
    }
}

impl Entity for Task {
    type Row = TaskRow;
    const COLLECTION: Collection = Collection::Tasks;

    fn from_row(row: TaskRow) -> Self {
        map_task(row)
    }

    fn primary_id(&self) -> Option<&str> {
        non_empty(&self.id)
    }
}

impl Entity for CalendarEvent {
    type Row = EventRow;
    const COLLECTION: Collection = Collection::Events;

    fn from_row(row: EventRow) -> Self {
        map_event(row)
    }

    fn primary_id(&self) -> Option<&str> {
        non_empty(&self.id)
    }
}

impl Entity for Investment {
    type Row = InvestmentRow;
    const COLLECTION: Collection = Collection::Investments;
    const SECONDARY_KEY: Option<&'static str> = Some("symbol");

    fn from_row(row: InvestmentRow) -> Self {
        map_investment(row)
    }

    fn primary_id(&self) -> Option<&str> {
        None
    }

    fn secondary_key(&self) -> Option<&str> {
        non_empty(&self.symbol)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

/// Identity of a raw row as seen by the reducer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowKey {
    pub id: Option<String>,
    pub secondary: Option<String>,
}

impl RowKey {
    pub fn of<E: Entity>(row: &Value) -> Self {
        let text = |field: &str| {
            row.get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            id: text("id"),
            secondary: E::SECONDARY_KEY.and_then(text),
        }
    }

    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        if let (Some(a), Some(b)) = (self.id.as_deref(), entity.primary_id()) {
            return a == b;
        }
        matches!(
            (self.secondary.as_deref(), entity.secondary_key()),
            (Some(a), Some(b)) if a == b
        )
    }
}

pub fn decode<E: Entity>(row: &Value) -> Result<E, FeedError> {
    let typed = serde_json::from_value::<E::Row>(row.clone()).map_err(|source| FeedError::Decode {
        collection: E::COLLECTION,
        source,
    })?;
    Ok(E::from_row(typed))
}

/// Computes the collection value after `event`.
///
/// INSERT of an entity already present replaces it, so replaying an insert
/// never duplicates. UPDATE and DELETE of an absent entity leave the
/// collection unchanged.
pub fn reduce<E: Entity>(items: &[E], event: &ChangeEvent) -> Result<Vec<E>, FeedError> {
    let mut next = match event.kind {
        ChangeKind::Insert => {
            let row = event.new.as_ref().ok_or(FeedError::MissingPayload("INSERT"))?;
            let key = RowKey::of::<E>(row);
            let entity = decode::<E>(row)?;
            let mut next = items.to_vec();
            match next.iter().position(|e| key.matches(e)) {
                Some(idx) => next[idx] = entity,
                None => next.push(entity),
            }
            next
        }
        ChangeKind::Update => {
            let row = event.new.as_ref().ok_or(FeedError::MissingPayload("UPDATE"))?;
            let key = RowKey::of::<E>(row);
            let entity = decode::<E>(row)?;
            items
                .iter()
                .map(|e| if key.matches(e) { entity.clone() } else { e.clone() })
                .collect()
        }
        ChangeKind::Delete => {
            let row = event.old.as_ref().ok_or(FeedError::MissingPayload("DELETE"))?;
            let key = RowKey::of::<E>(row);
            items.iter().filter(|e| !key.matches(*e)).cloned().collect()
        }
    };
    E::sort(&mut next);
    Ok(next)
}
