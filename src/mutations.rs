// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::backend::Backend;
use crate::error::StoreError;
use crate::mappers::{event_row, goal_row, investment_row, task_row, transaction_row};
use crate::models::{Collection, NewEvent, NewGoal, NewInvestment, NewTask, NewTransaction};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Write operations the assistant and the sagas are allowed to trigger.
///
/// Writes return once the store accepted them. The snapshot catches up when
/// the corresponding change event arrives.
#[async_trait]
pub trait Mutations: Send + Sync {
    async fn create_transaction(&self, input: NewTransaction) -> anyhow::Result<()>;
    async fn create_goal(&self, input: NewGoal) -> anyhow::Result<()>;
    async fn create_task(&self, input: NewTask) -> anyhow::Result<()>;
    async fn create_event(&self, input: NewEvent) -> anyhow::Result<()>;
    async fn update_goal_amount(&self, goal_id: &str, current_amount: Decimal)
    -> anyhow::Result<()>;
}

/// Writes straight to a [`Backend`] on behalf of one member of one couple.
pub struct BackendMutations {
    backend: Arc<dyn Backend>,
    couple_id: String,
    user_id: Option<String>,
}

impl BackendMutations {
    pub fn new(backend: Arc<dyn Backend>, couple_id: &str, user_id: Option<&str>) -> Self {
        Self {
            backend,
            couple_id: couple_id.to_string(),
            user_id: user_id.map(str::to_string),
        }
    }

    async fn write(&self, collection: Collection, row: Value) -> Result<Value, StoreError> {
        let stored = self.backend.insert(collection, &self.couple_id, row).await?;
        let id = stored.get("id").and_then(|v| v.as_str()).unwrap_or_default();
        info!(%collection, id, "row written");
        Ok(stored)
    }

    pub async fn create_event_mirrored(
        &self,
        input: &NewEvent,
        external: Option<(String, String)>,
    ) -> anyhow::Result<Value> {
        let row = serde_json::to_value(event_row(input, &self.couple_id, external))?;
        Ok(self.write(Collection::Events, row).await?)
    }

    pub async fn create_investment(&self, input: &NewInvestment) -> anyhow::Result<Value> {
        let row = serde_json::to_value(investment_row(input, &self.couple_id))?;
        Ok(self.write(Collection::Investments, row).await?)
    }

    pub async fn set_task_completed(&self, task_id: &str, completed: bool) -> anyhow::Result<()> {
        self.backend
            .update(
                Collection::Tasks,
                &self.couple_id,
                task_id,
                json!({ "completed": completed }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Mutations for BackendMutations {
    async fn create_transaction(&self, input: NewTransaction) -> anyhow::Result<()> {
        let row = transaction_row(&input, &self.couple_id, self.user_id.as_deref());
        self.write(Collection::Transactions, serde_json::to_value(row)?)
            .await?;
        Ok(())
    }

    async fn create_goal(&self, input: NewGoal) -> anyhow::Result<()> {
        let row = goal_row(&input, &self.couple_id);
        self.write(Collection::Goals, serde_json::to_value(row)?).await?;
        Ok(())
    }

    async fn create_task(&self, input: NewTask) -> anyhow::Result<()> {
        let row = task_row(&input, &self.couple_id);
        self.write(Collection::Tasks, serde_json::to_value(row)?).await?;
        Ok(())
    }

    async fn create_event(&self, input: NewEvent) -> anyhow::Result<()> {
        self.create_event_mirrored(&input, None).await?;
        Ok(())
    }

    async fn update_goal_amount(
        &self,
        goal_id: &str,
        current_amount: Decimal,
    ) -> anyhow::Result<()> {
        self.backend
            .update(
                Collection::Goals,
                &self.couple_id,
                goal_id,
                json!({ "current_amount": current_amount }),
            )
            .await?;
        Ok(())
    }
}
