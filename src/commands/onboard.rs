// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg};
use crate::db::data_dir;
use crate::saga::SagaState;
use crate::wizard::{DraftStore, FIELDS, OnboardingDraft, finish};
use anyhow::{Result, bail};

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    let drafts = DraftStore::new(&data_dir()?);
    match m.subcommand() {
        Some(("set", sub)) => set(&drafts, sub)?,
        Some(("status", _)) => status(&drafts)?,
        Some(("finish", _)) => finish_cmd(env, &drafts).await?,
        Some(("reset", _)) => {
            drafts.clear()?;
            println!("Onboarding answers discarded");
        }
        _ => {}
    }
    Ok(())
}

fn set(drafts: &DraftStore, sub: &clap::ArgMatches) -> Result<()> {
    let mut draft = drafts.load_or_default()?;
    draft.set(arg(sub, "field")?, arg(sub, "value")?)?;
    drafts.save(&draft)?;
    match draft.next_field() {
        Some(next) => println!("Saved. Next: {}", next),
        None => println!("All answers saved. Run `duocash onboard finish`."),
    }
    Ok(())
}

fn show(draft: &OnboardingDraft) -> Vec<(&'static str, String)> {
    let a = &draft.answers;
    let values = [
        a.couple_name.clone(),
        a.name.clone(),
        a.monthly_income.map(|d| d.to_string()),
        a.income_day.map(|d| d.to_string()),
        a.risk_tolerance.map(|r| r.to_string()),
    ];
    FIELDS
        .iter()
        .copied()
        .zip(values)
        .map(|(f, v)| (f, v.unwrap_or_else(|| "-".into())))
        .collect()
}

fn status(drafts: &DraftStore) -> Result<()> {
    let Some(draft) = drafts.load()? else {
        println!("No onboarding in progress");
        return Ok(());
    };
    for (field, value) in show(&draft) {
        println!("{:<16} {}", field, value);
    }
    if let Some(next) = draft.next_field() {
        println!("Next: {}", next);
    }
    Ok(())
}

async fn finish_cmd(env: &Env, drafts: &DraftStore) -> Result<()> {
    let ctx = env.context().await?;
    let save = env.backend.with_conn_mut(|conn| {
        finish(conn, drafts, &ctx.session.user_id, &ctx.session.email)
    })?;
    match save.state() {
        SagaState::Completed => {
            println!(
                "Household ready ({})",
                save.couple_id().unwrap_or_default()
            );
            Ok(())
        }
        SagaState::Failed { step, reason } => {
            bail!("Onboarding stopped at '{}': {}. Your answers are kept.", step, reason)
        }
        other => bail!("Onboarding did not finish: {:?}", other),
    }
}
