// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use duocash::mappers::{
    event_row, investment_row, map_event, map_goal, map_investment, map_task, map_transaction,
    transaction_row,
};
use duocash::models::{
    Assignee, EventKind, GoalStatus, Member, NewEvent, NewInvestment, NewTransaction, Priority,
    TransactionKind,
};
use duocash::rows::{EventRow, GoalRow, InvestmentRow, TaskRow, TransactionRow};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn transaction_defaults_fill_nulls() {
    let t = map_transaction(TransactionRow::default());
    assert_eq!(t.id, "");
    assert_eq!(t.amount, Decimal::ZERO);
    assert_eq!(t.kind, TransactionKind::Expense);
    assert_eq!(t.date, DateTime::<Utc>::UNIX_EPOCH);
    assert_eq!(t.user, Member::B);
}

#[test]
fn transaction_with_user_reference_is_first_member() {
    let t = map_transaction(TransactionRow {
        id: Some("t1".into()),
        amount: Some(d("42.5")),
        kind: Some("income".into()),
        user_id: Some("someone-else".into()),
        ..Default::default()
    });
    assert_eq!(t.user, Member::A);
    assert_eq!(t.kind, TransactionKind::Income);
    assert_eq!(t.amount, d("42.5"));
}

#[test]
fn unknown_enum_values_fall_back() {
    let t = map_transaction(TransactionRow {
        kind: Some("refund".into()),
        ..Default::default()
    });
    assert_eq!(t.kind, TransactionKind::Expense);

    let g = map_goal(GoalRow {
        status: Some("paused".into()),
        ..Default::default()
    });
    assert_eq!(g.status, GoalStatus::InProgress);
}

#[test]
fn goal_status_is_read_not_derived() {
    let g = map_goal(GoalRow {
        id: Some("g".into()),
        current_amount: Some(d("1500")),
        target_amount: Some(d("1000")),
        status: Some("in-progress".into()),
        ..Default::default()
    });
    // Over target but still in progress: status only changes when stored.
    assert_eq!(g.status, GoalStatus::InProgress);
}

#[test]
fn task_assignee_is_always_both() {
    let t = map_task(TaskRow {
        assignee: Some("user1".into()),
        priority: None,
        ..Default::default()
    });
    assert_eq!(t.assignee, Assignee::Both);
    assert_eq!(t.priority, Priority::Medium);
    assert!(!t.completed);
}

#[test]
fn event_end_defaults_to_start_and_sync_follows_external_id() {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();
    let e = map_event(EventRow {
        id: Some("e1".into()),
        start_time: Some(start),
        ..Default::default()
    });
    assert_eq!(e.end, start);
    assert_eq!(e.kind, EventKind::Social);
    assert!(!e.synced);

    let synced = map_event(EventRow {
        external_event_id: Some("g-123".into()),
        ..Default::default()
    });
    assert!(synced.synced);
}

#[test]
fn investment_change_fields_are_zero() {
    let i = map_investment(InvestmentRow {
        symbol: Some("PETR4".into()),
        current_price: Some(d("38.2")),
        change: Some(d("1.5")),
        change_percent: Some(d("4.1")),
        shares: Some(d("10")),
        ..Default::default()
    });
    assert_eq!(i.change, Decimal::ZERO);
    assert_eq!(i.change_percent, Decimal::ZERO);
    assert_eq!(i.price, d("38.2"));
    assert!(i.history.is_empty());
}

#[test]
fn transaction_row_keeps_caller_id() {
    let input = NewTransaction {
        id: Some("fixed".into()),
        amount: d("10"),
        category: "Food".into(),
        description: "".into(),
        kind: TransactionKind::Expense,
        date: Utc::now(),
    };
    let row = transaction_row(&input, "c1", Some("u1"));
    assert_eq!(row.id.as_deref(), Some("fixed"));
    assert_eq!(row.couple_id.as_deref(), Some("c1"));
    assert_eq!(row.kind.as_deref(), Some("expense"));

    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["type"], "expense");
}

#[test]
fn event_row_carries_external_reference() {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();
    let input = NewEvent {
        title: "Dinner".into(),
        start,
        end: start,
        kind: EventKind::Social,
        value: None,
        assignee: None,
        goal_id: None,
    };
    let row = event_row(&input, "c1", Some(("ext".into(), "https://cal/ext".into())));
    let back = map_event(row);
    assert!(back.synced);
    assert_eq!(back.external_link.as_deref(), Some("https://cal/ext"));
}

#[test]
fn investment_row_records_first_contribution() {
    let input = NewInvestment {
        symbol: " itsa4 ".into(),
        name: "Itausa".into(),
        price: d("10.5"),
        shares: d("4"),
        goal_id: None,
        date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
    };
    let row = investment_row(&input, "c1");
    assert_eq!(row.symbol.as_deref(), Some("ITSA4"));
    assert_eq!(row.total_invested, Some(d("42.0")));
    let back = map_investment(row);
    assert_eq!(back.history.len(), 1);
    assert_eq!(back.history[0].amount, d("42.0"));
}
