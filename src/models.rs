// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five collections kept in sync for a couple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Transactions,
    Goals,
    Tasks,
    Events,
    Investments,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Transactions,
        Collection::Goals,
        Collection::Tasks,
        Collection::Events,
        Collection::Investments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Transactions => "transactions",
            Collection::Goals => "goals",
            Collection::Tasks => "tasks",
            Collection::Events => "events",
            Collection::Investments => "investments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown collection '{}'", s))
    }
}

// Small string enums share one shape: lowercase wire value, parse, display.
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn values() -> &'static [&'static str] {
                &[$($wire),+]
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(format!(
                        "invalid {} '{}', expected one of {}",
                        stringify!($name),
                        other,
                        $name::values().join("|")
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(TransactionKind { Income => "income", Expense => "expense" });
wire_enum!(Member { A => "user1", B => "user2" });
wire_enum!(Assignee { User1 => "user1", User2 => "user2", Both => "both" });
wire_enum!(GoalStatus { InProgress => "in-progress", Achieved => "achieved" });
wire_enum!(Priority { High => "high", Medium => "medium", Low => "low" });
wire_enum!(EventKind { Finance => "finance", Social => "social", Work => "work", Task => "task" });
wire_enum!(RiskTolerance { Low => "low", Medium => "medium", High => "high" });
wire_enum!(Role { Primary => "primary", Partner => "partner" });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub user: Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub deadline: Option<NaiveDate>,
    pub status: GoalStatus,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub assignee: Assignee,
    pub deadline: Option<NaiveDate>,
    pub completed: bool,
    pub priority: Priority,
    pub goal_id: Option<String>,
    pub financial_impact: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: EventKind,
    pub value: Option<Decimal>,
    pub assignee: Option<Assignee>,
    pub goal_id: Option<String>,
    pub synced: bool,
    pub external_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// A holding. Has no surface id: the reducer addresses it by `symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub shares: Decimal,
    pub total_invested: Decimal,
    pub goal_id: Option<String>,
    pub history: Vec<Contribution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberDetails {
    pub name: String,
    pub email: String,
    pub monthly_income: Decimal,
    pub income_day: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Couple {
    pub id: String,
    pub name: String,
    pub user1: MemberDetails,
    pub user2: MemberDetails,
    pub risk_tolerance: RiskTolerance,
    pub invite_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub couple_id: Option<String>,
    pub role: Role,
    pub monthly_income: Decimal,
    pub income_day: u32,
    pub avatar_url: Option<String>,
}

// Normalised inputs handed to the mutation surface.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Set when the caller needs an idempotent write.
    pub id: Option<String>,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub kind: TransactionKind,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGoal {
    pub title: String,
    pub target_amount: Decimal,
    pub deadline: NaiveDate,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub assignee: Assignee,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
    pub goal_id: Option<String>,
    pub financial_impact: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: EventKind,
    pub value: Option<Decimal>,
    pub assignee: Option<Assignee>,
    pub goal_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvestment {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub shares: Decimal,
    pub goal_id: Option<String>,
    pub date: NaiveDate,
}
