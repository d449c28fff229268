// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Env;
use crate::assistant::{ActionStatus, Assistant, CompletionClient, gemini::GeminiClient};
use crate::error::AssistantError;
use crate::store::SyncState;
use crate::utils::fmt_money;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

fn assistant(env: &Env) -> Result<Assistant> {
    let key = env
        .config
        .gemini_api_key
        .as_deref()
        .ok_or(AssistantError::MissingApiKey)?;
    let client: Arc<dyn CompletionClient> = Arc::new(GeminiClient::new(
        key,
        &env.config.gemini_model,
        env.config.assistant_timeout,
    )?);
    Ok(Assistant::new(client, &env.config))
}

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    let message = m
        .get_many::<String>("message")
        .map(|words| words.cloned().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let household = env.household().await?;
    let assistant = assistant(env)?;

    if m.get_flag("advice") {
        let reply = assistant.advise(&message, &household.snapshot).await;
        println!("{}", reply.text);
        return Ok(());
    }

    let mutations = household.mutations(env);
    let reply = assistant
        .converse(&message, &household.couple_id, &household.snapshot, &mutations)
        .await;
    println!("{}", reply.text);
    for action in &reply.actions {
        match &action.status {
            ActionStatus::Applied => debug!(tool = %action.tool, "applied"),
            ActionStatus::Rejected(why) | ActionStatus::Failed(why) => {
                eprintln!("  {} not applied: {}", action.tool, why)
            }
        }
    }
    Ok(())
}

fn summary(state: &SyncState, currency: &str) -> String {
    let s = &state.snapshot;
    format!(
        "{} transactions, {} goals, {} tasks, {} events, {} positions | balance {}",
        s.transactions.len(),
        s.goals.len(),
        s.tasks.len(),
        s.events.len(),
        s.investments.len(),
        fmt_money(&s.balance(), currency)
    )
}

/// Prints a line every time the household's synced state changes.
pub async fn watch(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    let household = env.household().await?;
    let store = Arc::clone(household.ctx.store());
    let mut rx = store.watch();
    println!("{}", summary(&rx.borrow_and_update(), &env.config.currency));

    let limit = m.get_one::<u64>("seconds").copied().map(Duration::from_secs);
    let deadline = async {
        match limit {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                if let Some(err) = &state.error {
                    eprintln!("sync error: {}", err);
                }
                println!("{}", summary(&state, &env.config.currency));
            }
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    household.ctx.store().close();
    Ok(())
}
