// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Row <-> entity mapping.
//!
//! `map_*` never fail: nulls become the documented defaults. The `*_row`
//! builders go the other way for writes.

use crate::models::{
    Assignee, CalendarEvent, Contribution, EventKind, Goal, GoalStatus, Investment, Member,
    NewEvent, NewGoal, NewInvestment, NewTask, NewTransaction, Priority, Task, Transaction,
    TransactionKind,
};
use crate::rows::{ContributionRow, EventRow, GoalRow, InvestmentRow, TaskRow, TransactionRow};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn parse_or<T: FromStr>(raw: Option<&str>, fallback: T) -> T {
    raw.and_then(|s| s.parse().ok()).unwrap_or(fallback)
}

pub fn map_transaction(row: TransactionRow) -> Transaction {
    Transaction {
        id: row.id.unwrap_or_default(),
        amount: row.amount.unwrap_or(Decimal::ZERO),
        category: row.category.unwrap_or_default(),
        description: row.description.unwrap_or_default(),
        date: row.date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        kind: parse_or(row.kind.as_deref(), TransactionKind::Expense),
        // Lossy: any user reference is the first member, none is the second.
        user: if row.user_id.is_some() {
            Member::A
        } else {
            Member::B
        },
    }
}

pub fn map_goal(row: GoalRow) -> Goal {
    Goal {
        id: row.id.unwrap_or_default(),
        title: row.title.unwrap_or_default(),
        target_amount: row.target_amount.unwrap_or(Decimal::ZERO),
        current_amount: row.current_amount.unwrap_or(Decimal::ZERO),
        deadline: row.deadline,
        status: parse_or(row.status.as_deref(), GoalStatus::InProgress),
        category: row.category.unwrap_or_default(),
    }
}

pub fn map_task(row: TaskRow) -> Task {
    Task {
        id: row.id.unwrap_or_default(),
        title: row.title.unwrap_or_default(),
        // The stored assignee is not carried through.
        assignee: Assignee::Both,
        deadline: row.deadline,
        completed: row.completed.unwrap_or(false),
        priority: parse_or(row.priority.as_deref(), Priority::Medium),
        goal_id: row.goal_id,
        financial_impact: row.financial_impact,
    }
}

pub fn map_event(row: EventRow) -> CalendarEvent {
    let start = row.start_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    CalendarEvent {
        id: row.id.unwrap_or_default(),
        title: row.title.unwrap_or_default(),
        start,
        end: row.end_time.unwrap_or(start),
        kind: parse_or(row.kind.as_deref(), EventKind::Social),
        value: row.value,
        assignee: row.assignee.as_deref().and_then(|s| s.parse().ok()),
        goal_id: row.goal_id,
        synced: row.external_event_id.is_some(),
        external_link: row.external_link,
    }
}

pub fn map_investment(row: InvestmentRow) -> Investment {
    Investment {
        symbol: row.symbol.unwrap_or_default(),
        name: row.name.unwrap_or_default(),
        price: row.current_price.unwrap_or(Decimal::ZERO),
        // Day change is fetched separately, never read from storage.
        change: Decimal::ZERO,
        change_percent: Decimal::ZERO,
        shares: row.shares.unwrap_or(Decimal::ZERO),
        total_invested: row.total_invested.unwrap_or(Decimal::ZERO),
        goal_id: row.goal_id,
        history: row
            .history
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| {
                Some(Contribution {
                    date: c.date?,
                    amount: c.amount.unwrap_or(Decimal::ZERO),
                })
            })
            .collect(),
    }
}

pub fn transaction_row(
    input: &NewTransaction,
    couple_id: &str,
    user_id: Option<&str>,
) -> TransactionRow {
    TransactionRow {
        id: Some(input.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string())),
        couple_id: Some(couple_id.to_string()),
        amount: Some(input.amount),
        category: Some(input.category.clone()),
        description: Some(input.description.clone()),
        date: Some(input.date),
        kind: Some(input.kind.as_str().to_string()),
        user_id: user_id.map(str::to_string),
    }
}

pub fn goal_row(input: &NewGoal, couple_id: &str) -> GoalRow {
    GoalRow {
        id: Some(Uuid::new_v4().to_string()),
        couple_id: Some(couple_id.to_string()),
        title: Some(input.title.clone()),
        target_amount: Some(input.target_amount),
        current_amount: Some(Decimal::ZERO),
        deadline: Some(input.deadline),
        status: Some(GoalStatus::InProgress.as_str().to_string()),
        category: Some(input.category.clone()),
    }
}

pub fn task_row(input: &NewTask, couple_id: &str) -> TaskRow {
    TaskRow {
        id: Some(Uuid::new_v4().to_string()),
        couple_id: Some(couple_id.to_string()),
        title: Some(input.title.clone()),
        assignee: Some(input.assignee.as_str().to_string()),
        deadline: input.deadline,
        completed: Some(false),
        priority: Some(input.priority.as_str().to_string()),
        goal_id: input.goal_id.clone(),
        financial_impact: input.financial_impact,
    }
}

/// `external` is the provider's `(event id, link)` when the mirror succeeded.
pub fn event_row(input: &NewEvent, couple_id: &str, external: Option<(String, String)>) -> EventRow {
    let (external_event_id, external_link) = match external {
        Some((id, link)) => (Some(id), Some(link)),
        None => (None, None),
    };
    EventRow {
        id: Some(Uuid::new_v4().to_string()),
        couple_id: Some(couple_id.to_string()),
        title: Some(input.title.clone()),
        start_time: Some(input.start),
        end_time: Some(input.end),
        kind: Some(input.kind.as_str().to_string()),
        value: input.value,
        assignee: input.assignee.map(|a| a.as_str().to_string()),
        goal_id: input.goal_id.clone(),
        external_event_id,
        external_link,
    }
}

pub fn investment_row(input: &NewInvestment, couple_id: &str) -> InvestmentRow {
    let invested = input.price * input.shares;
    InvestmentRow {
        id: Some(Uuid::new_v4().to_string()),
        couple_id: Some(couple_id.to_string()),
        symbol: Some(input.symbol.trim().to_uppercase()),
        name: Some(input.name.clone()),
        current_price: Some(input.price),
        change: None,
        change_percent: None,
        shares: Some(input.shares),
        total_invested: Some(invested),
        goal_id: input.goal_id.clone(),
        history: Some(vec![ContributionRow {
            date: Some(input.date),
            amount: Some(invested),
        }]),
    }
}
