// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::{goal_row, transaction_row};
use duocash::error::FeedError;
use duocash::feed::{ChangeEvent, ChangeKind, reduce};
use duocash::models::{Collection, Goal, Investment, Transaction};
use duocash::store::Snapshot;
use pretty_assertions::assert_eq;
use serde_json::json;

fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|i| id(i).to_string()).collect()
}

fn tx(id: &str, date: &str) -> ChangeEvent {
    ChangeEvent::insert(
        Collection::Transactions,
        "c1",
        transaction_row(id, 10, "expense", date),
    )
}

#[test]
fn transactions_stay_newest_first_after_each_insert() {
    let mut items: Vec<Transaction> = Vec::new();
    for (id, date) in [
        ("a", "2025-01-02T10:00:00Z"),
        ("b", "2025-01-05T10:00:00Z"),
        ("c", "2025-01-01T10:00:00Z"),
    ] {
        items = reduce(&items, &tx(id, date)).unwrap();
        let dates: Vec<_> = items.iter().map(|t| t.date).collect();
        let mut sorted = dates.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(dates, sorted);
    }
    assert_eq!(ids(&items, |t| &t.id), vec!["b", "a", "c"]);
}

#[test]
fn transactions_resort_after_update_and_delete() {
    let mut items: Vec<Transaction> = Vec::new();
    for (id, date) in [
        ("a", "2025-01-02T10:00:00Z"),
        ("b", "2025-01-05T10:00:00Z"),
        ("c", "2025-01-01T10:00:00Z"),
    ] {
        items = reduce(&items, &tx(id, date)).unwrap();
    }
    assert_eq!(ids(&items, |t| &t.id), vec!["b", "a", "c"]);

    // Moving b to the oldest date sends it to the end.
    let moved = ChangeEvent::update(
        Collection::Transactions,
        "c1",
        None,
        transaction_row("b", 10, "expense", "2024-12-31T10:00:00Z"),
    );
    items = reduce(&items, &moved).unwrap();
    assert_eq!(ids(&items, |t| &t.id), vec!["a", "c", "b"]);

    // And c to the newest brings it to the front.
    let moved = ChangeEvent::update(
        Collection::Transactions,
        "c1",
        None,
        transaction_row("c", 10, "expense", "2025-02-01T10:00:00Z"),
    );
    items = reduce(&items, &moved).unwrap();
    assert_eq!(ids(&items, |t| &t.id), vec!["c", "a", "b"]);

    let gone = ChangeEvent::delete(Collection::Transactions, "c1", json!({ "id": "a" }));
    items = reduce(&items, &gone).unwrap();
    assert_eq!(ids(&items, |t| &t.id), vec!["c", "b"]);
}

#[test]
fn replayed_insert_does_not_duplicate() {
    let event = tx("a", "2025-01-02T10:00:00Z");
    let once: Vec<Transaction> = reduce(&[], &event).unwrap();
    let twice = reduce(&once, &event).unwrap();
    assert_eq!(once, twice);
    assert_eq!(twice.len(), 1);
}

#[test]
fn update_replaces_matching_entity_only() {
    let goals: Vec<Goal> = [goal_row("g1", "Trip", 100, 1000), goal_row("g2", "Car", 0, 5000)]
        .iter()
        .fold(Vec::new(), |acc, row| {
            reduce(&acc, &ChangeEvent::insert(Collection::Goals, "c1", row.clone())).unwrap()
        });
    let update = ChangeEvent::update(
        Collection::Goals,
        "c1",
        None,
        goal_row("g1", "Trip", 900, 1000),
    );
    let next = reduce(&goals, &update).unwrap();
    assert_eq!(next.len(), 2);
    assert_eq!(next[0].current_amount.to_string(), "900");
    assert_eq!(next[1], goals[1]);
}

#[test]
fn update_of_absent_entity_is_a_no_op() {
    let goals: Vec<Goal> =
        reduce(&[], &ChangeEvent::insert(Collection::Goals, "c1", goal_row("g1", "Trip", 0, 10)))
            .unwrap();
    let update =
        ChangeEvent::update(Collection::Goals, "c1", None, goal_row("zz", "Ghost", 1, 1));
    assert_eq!(reduce(&goals, &update).unwrap(), goals);
}

#[test]
fn delete_uses_old_row_and_ignores_absent_ids() {
    let goals: Vec<Goal> =
        reduce(&[], &ChangeEvent::insert(Collection::Goals, "c1", goal_row("g1", "Trip", 0, 10)))
            .unwrap();
    let absent = ChangeEvent::delete(Collection::Goals, "c1", json!({ "id": "nope" }));
    assert_eq!(reduce(&goals, &absent).unwrap(), goals);

    let present = ChangeEvent::delete(Collection::Goals, "c1", json!({ "id": "g1" }));
    assert!(reduce(&goals, &present).unwrap().is_empty());
}

#[test]
fn investments_are_keyed_by_symbol() {
    let insert = ChangeEvent::insert(
        Collection::Investments,
        "c1",
        json!({ "id": "row-1", "symbol": "PETR4", "current_price": 30, "shares": 10 }),
    );
    let items: Vec<Investment> = reduce(&[], &insert).unwrap();

    // Different row id, same symbol: still the same position.
    let update = ChangeEvent::update(
        Collection::Investments,
        "c1",
        None,
        json!({ "id": "row-2", "symbol": "PETR4", "current_price": 31, "shares": 12 }),
    );
    let items = reduce(&items, &update).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].shares.to_string(), "12");

    let delete = ChangeEvent::delete(Collection::Investments, "c1", json!({ "symbol": "PETR4" }));
    assert!(reduce(&items, &delete).unwrap().is_empty());
}

#[test]
fn missing_payload_is_an_error() {
    let event = ChangeEvent {
        collection: Collection::Goals,
        kind: ChangeKind::Insert,
        couple_id: "c1".into(),
        new: None,
        old: None,
    };
    let err = reduce::<Goal>(&[], &event).unwrap_err();
    assert!(matches!(err, FeedError::MissingPayload("INSERT")));
}

#[test]
fn undecodable_row_is_a_decode_error() {
    let event = ChangeEvent::insert(
        Collection::Goals,
        "c1",
        json!({ "id": "g1", "target_amount": "lots" }),
    );
    let err = reduce::<Goal>(&[], &event).unwrap_err();
    assert!(matches!(err, FeedError::Decode { collection: Collection::Goals, .. }));
}

#[test]
fn snapshot_applies_to_the_named_collection_only() {
    let mut snap = Snapshot::default();
    snap.apply(&tx("a", "2025-01-02T10:00:00Z")).unwrap();
    snap.apply(&ChangeEvent::insert(Collection::Goals, "c1", goal_row("g1", "Trip", 0, 10)))
        .unwrap();
    assert_eq!(snap.transactions.len(), 1);
    assert_eq!(snap.goals.len(), 1);
    assert!(snap.tasks.is_empty());
    assert_eq!(snap.balance().to_string(), "-10");
}
