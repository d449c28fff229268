// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Conversational assistant.
//!
//! One turn sends the utterance plus a snapshot summary to the completion
//! endpoint, then dispatches every returned tool invocation, in order, to the
//! caller's [`Mutations`]. The reply ends with one fixed confirmation
//! sentence per applied action. Endpoint failures and timeouts never reach
//! the caller: they turn into [`FALLBACK_REPLY`].

pub mod context;
pub mod gemini;
pub mod tools;

use crate::config::Config;
use crate::error::AssistantError;
use crate::mutations::Mutations;
use crate::store::Snapshot;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use self::context::{ADVISOR_INSTRUCTION, SYSTEM_INSTRUCTION, build_context, build_portfolio_context};
use self::tools::{ToolAction, confirmation, declarations, parse_invocation};

pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't reach the assistant right now. Please try again in a moment.";
pub const EMPTY_REPLY: &str = "Tell me what you'd like to do and I'll take care of it.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Grounding {
    Tools(Vec<ToolDeclaration>),
    /// Passive web-search grounding; no callable tools.
    Search,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub context: String,
    pub utterance: String,
    pub grounding: Grounding,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: Option<String>,
    pub calls: Vec<ToolInvocation>,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AssistantError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionStatus {
    Applied,
    /// Arguments failed validation; nothing was written.
    Rejected(String),
    /// The mutation callback failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub tool: String,
    pub status: ActionStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub actions: Vec<ActionOutcome>,
}

impl Reply {
    fn text_only(text: &str) -> Self {
        Self {
            text: text.to_string(),
            actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Sending,
    Dispatching,
    Replying,
}

pub struct Assistant {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    recent: usize,
    currency: String,
    turn: Mutex<()>,
    advisory_turn: Mutex<()>,
    phase: StdMutex<TurnPhase>,
}

impl Assistant {
    pub fn new(client: Arc<dyn CompletionClient>, config: &Config) -> Self {
        Self::with_settings(
            client,
            config.assistant_timeout,
            config.recent_transactions,
            &config.currency,
        )
    }

    pub fn with_settings(
        client: Arc<dyn CompletionClient>,
        timeout: Duration,
        recent: usize,
        currency: &str,
    ) -> Self {
        Self {
            client,
            timeout,
            recent,
            currency: currency.to_string(),
            turn: Mutex::new(()),
            advisory_turn: Mutex::new(()),
            phase: StdMutex::new(TurnPhase::Idle),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_phase(&self, phase: TurnPhase) {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner()) = phase;
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AssistantError> {
        match tokio::time::timeout(self.timeout, self.client.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(AssistantError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Runs one action turn. A second call waits until the running turn of
    /// this assistant has finished dispatching.
    pub async fn converse(
        &self,
        utterance: &str,
        couple_id: &str,
        snapshot: &Snapshot,
        mutations: &dyn Mutations,
    ) -> Reply {
        let _turn = self.turn.lock().await;
        let reply = self.run_turn(utterance, couple_id, snapshot, mutations).await;
        self.set_phase(TurnPhase::Idle);
        reply
    }

    async fn run_turn(
        &self,
        utterance: &str,
        couple_id: &str,
        snapshot: &Snapshot,
        mutations: &dyn Mutations,
    ) -> Reply {
        if couple_id.trim().is_empty() {
            error!("assistant turn requested without a couple scope");
            return Reply::text_only(FALLBACK_REPLY);
        }
        if utterance.trim().is_empty() {
            return Reply::text_only(EMPTY_REPLY);
        }

        let now = Utc::now();
        let request = CompletionRequest {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            context: build_context(snapshot, self.recent, &self.currency, now),
            utterance: utterance.trim().to_string(),
            grounding: Grounding::Tools(declarations()),
        };

        self.set_phase(TurnPhase::Sending);
        let completion = match self.complete(&request).await {
            Ok(c) => c,
            Err(err) => {
                warn!(couple = %couple_id, "completion failed: {}", err);
                return Reply::text_only(FALLBACK_REPLY);
            }
        };
        debug!(calls = completion.calls.len(), "completion received");

        let mut lines = Vec::new();
        if let Some(text) = completion.text.as_deref().map(str::trim) {
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }

        let mut actions = Vec::with_capacity(completion.calls.len());
        if !completion.calls.is_empty() {
            self.set_phase(TurnPhase::Dispatching);
        }
        for call in &completion.calls {
            let outcome = self
                .dispatch(call, snapshot, mutations, now, &mut lines)
                .await;
            actions.push(ActionOutcome {
                tool: call.name.clone(),
                status: outcome,
            });
        }

        self.set_phase(TurnPhase::Replying);
        if lines.is_empty() {
            lines.push(FALLBACK_REPLY.to_string());
        }
        Reply {
            text: lines.join("\n"),
            actions,
        }
    }

    async fn dispatch(
        &self,
        call: &ToolInvocation,
        snapshot: &Snapshot,
        mutations: &dyn Mutations,
        now: chrono::DateTime<Utc>,
        lines: &mut Vec<String>,
    ) -> ActionStatus {
        let action = match parse_invocation(call, now) {
            Ok(action) => action,
            Err(err) => {
                warn!(tool = %call.name, "rejected tool call: {}", err);
                lines.push(format!("I couldn't do that: {}.", err));
                return ActionStatus::Rejected(err.to_string());
            }
        };

        let result = match &action {
            ToolAction::Transaction(t) => mutations.create_transaction(t.clone()).await,
            ToolAction::Goal(g) => mutations.create_goal(g.clone()).await,
            ToolAction::Task(t) => mutations.create_task(t.clone()).await,
            ToolAction::Event(e) => mutations.create_event(e.clone()).await,
            ToolAction::Advice { question } => {
                let _turn = self.advisory_turn.lock().await;
                return match self.ask_advisor(question, snapshot).await {
                    Ok(text) => {
                        lines.push(text);
                        ActionStatus::Applied
                    }
                    Err(err) => {
                        warn!(tool = %call.name, "advice unavailable: {}", err);
                        lines.push(FALLBACK_REPLY.to_string());
                        ActionStatus::Failed(err.to_string())
                    }
                };
            }
        };

        match result {
            Ok(()) => {
                info!(tool = %call.name, "tool call applied");
                lines.push(confirmation(&action, &self.currency));
                ActionStatus::Applied
            }
            Err(err) => {
                error!(tool = %call.name, "tool callback failed: {:#}", err);
                lines.push(format!("I couldn't save that ({}). Please try again.", call.name));
                ActionStatus::Failed(err.to_string())
            }
        }
    }

    /// Advisory chat: search-grounded, declares no tools, never writes.
    pub async fn advise(&self, question: &str, snapshot: &Snapshot) -> Reply {
        let _turn = self.advisory_turn.lock().await;
        if question.trim().is_empty() {
            return Reply::text_only(EMPTY_REPLY);
        }
        match self.ask_advisor(question, snapshot).await {
            Ok(text) => Reply::text_only(&text),
            Err(err) => {
                warn!("advisory completion failed: {}", err);
                Reply::text_only(FALLBACK_REPLY)
            }
        }
    }

    async fn ask_advisor(&self, question: &str, snapshot: &Snapshot) -> Result<String, AssistantError> {
        let request = CompletionRequest {
            system_instruction: ADVISOR_INSTRUCTION.to_string(),
            context: build_portfolio_context(snapshot, &self.currency),
            utterance: question.trim().to_string(),
            grounding: Grounding::Search,
        };
        match self.complete(&request).await? {
            Completion {
                text: Some(text), ..
            } if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(AssistantError::InvalidResponse("advisor returned no text".into())),
        }
    }
}
