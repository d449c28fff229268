// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Persisted row shapes, one per table.
//!
//! Every column except the key columns is nullable in the store, so every
//! field is an `Option`. Decoding a JSON row into one of these structs is
//! the typed boundary; anything past it is handled by `mappers`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub id: Option<String>,
    pub couple_id: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalRow {
    pub id: Option<String>,
    pub couple_id: Option<String>,
    pub title: Option<String>,
    pub target_amount: Option<Decimal>,
    pub current_amount: Option<Decimal>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: Option<String>,
    pub couple_id: Option<String>,
    pub title: Option<String>,
    pub assignee: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub priority: Option<String>,
    pub goal_id: Option<String>,
    pub financial_impact: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub id: Option<String>,
    pub couple_id: Option<String>,
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<Decimal>,
    pub assignee: Option<String>,
    pub goal_id: Option<String>,
    pub external_event_id: Option<String>,
    pub external_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionRow {
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRow {
    pub id: Option<String>,
    pub couple_id: Option<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub current_price: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
    pub shares: Option<Decimal>,
    pub total_invested: Option<Decimal>,
    pub goal_id: Option<String>,
    pub history: Option<Vec<ContributionRow>>,
}
