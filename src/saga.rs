// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Two-step writes without an atomic commit.
//!
//! A saga records which step last committed. On failure it stops at the
//! failing step and `run` can be called again to retry from there; every
//! step is written so that repeating it has no additional effect.

use crate::error::ValidationError;
use crate::models::{Goal, NewTransaction, TransactionKind};
use crate::mutations::Mutations;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

pub const CONTRIBUTION_CATEGORY: &str = "Goal contribution";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaState<S> {
    Pending,
    Committed(S),
    Completed,
    Failed { step: S, reason: String },
}

impl<S: Copy> SagaState<S> {
    pub fn is_completed(&self) -> bool {
        matches!(self, SagaState::Completed)
    }

    pub fn failed_step(&self) -> Option<S> {
        match self {
            SagaState::Failed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionStep {
    RecordExpense,
    RaiseGoal,
}

impl fmt::Display for ContributionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributionStep::RecordExpense => f.write_str("record expense"),
            ContributionStep::RaiseGoal => f.write_str("raise goal"),
        }
    }
}

/// Parses a user-entered contribution amount. Rejects zero, negatives and
/// anything that is not a number.
pub fn parse_contribution(raw: &str) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim().replace(',', ".");
    let amount = trimmed
        .parse::<Decimal>()
        .map_err(|_| ValidationError::InvalidAmount(raw.trim().to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(amount.to_string()));
    }
    Ok(amount)
}

/// Moves money into a goal: records an expense, then raises the goal.
///
/// The new goal amount is fixed when the saga is created and the expense id
/// is derived from the saga id, so a retry of either step is idempotent.
#[derive(Debug, Clone)]
pub struct ContributionSaga {
    id: Uuid,
    goal_id: String,
    goal_title: String,
    amount: Decimal,
    new_amount: Decimal,
    date: DateTime<Utc>,
    state: SagaState<ContributionStep>,
}

impl ContributionSaga {
    pub fn new(goal: &Goal, amount: Decimal, date: DateTime<Utc>) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount.to_string()));
        }
        if goal.id.is_empty() {
            return Err(ValidationError::Required("goal id"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            goal_id: goal.id.clone(),
            goal_title: goal.title.clone(),
            amount,
            new_amount: goal.current_amount + amount,
            date,
            state: SagaState::Pending,
        })
    }

    pub fn state(&self) -> &SagaState<ContributionStep> {
        &self.state
    }

    pub fn new_amount(&self) -> Decimal {
        self.new_amount
    }

    pub fn expense(&self) -> NewTransaction {
        NewTransaction {
            id: Some(self.id.to_string()),
            amount: self.amount,
            category: CONTRIBUTION_CATEGORY.to_string(),
            description: format!("Contribution to {}", self.goal_title),
            kind: TransactionKind::Expense,
            date: self.date,
        }
    }

    fn next_step(&self) -> Option<ContributionStep> {
        match &self.state {
            SagaState::Pending => Some(ContributionStep::RecordExpense),
            SagaState::Committed(ContributionStep::RecordExpense) => {
                Some(ContributionStep::RaiseGoal)
            }
            SagaState::Committed(ContributionStep::RaiseGoal) | SagaState::Completed => None,
            SagaState::Failed { step, .. } => Some(*step),
        }
    }

    /// Runs (or resumes) the saga until it completes or a step fails.
    pub async fn run(&mut self, mutations: &dyn Mutations) -> &SagaState<ContributionStep> {
        while let Some(step) = self.next_step() {
            let result = match step {
                ContributionStep::RecordExpense => {
                    mutations.create_transaction(self.expense()).await
                }
                ContributionStep::RaiseGoal => {
                    mutations
                        .update_goal_amount(&self.goal_id, self.new_amount)
                        .await
                }
            };
            match result {
                Ok(()) => {
                    self.state = match step {
                        ContributionStep::RecordExpense => SagaState::Committed(step),
                        ContributionStep::RaiseGoal => SagaState::Completed,
                    };
                }
                Err(err) => {
                    warn!(saga = %self.id, %step, "contribution step failed: {:#}", err);
                    self.state = SagaState::Failed {
                        step,
                        reason: err.to_string(),
                    };
                    return &self.state;
                }
            }
        }
        info!(saga = %self.id, goal = %self.goal_id, amount = %self.amount, "contribution completed");
        &self.state
    }
}
