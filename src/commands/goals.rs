// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg};
use crate::models::{Goal, NewGoal};
use crate::mutations::Mutations;
use crate::saga::{ContributionSaga, SagaState, parse_contribution};
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(env, sub).await?,
        Some(("list", sub)) => list(env, sub).await?,
        Some(("contribute", sub)) => contribute(env, sub).await?,
        _ => {}
    }
    Ok(())
}

async fn add(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let target = parse_decimal(arg(sub, "target")?)?;
    if target <= Decimal::ZERO {
        bail!("Target must be positive, got {}", target);
    }
    let input = NewGoal {
        title: arg(sub, "title")?.trim().to_string(),
        target_amount: target,
        deadline: parse_date(arg(sub, "deadline")?)?,
        category: arg(sub, "category")?.trim().to_string(),
    };
    let household = env.household().await?;
    household.mutations(env).create_goal(input.clone()).await?;
    println!(
        "Created goal '{}' of {} by {}",
        input.title,
        fmt_money(&input.target_amount, &env.config.currency),
        input.deadline
    );
    Ok(())
}

#[derive(Serialize)]
struct GoalLine {
    id: String,
    title: String,
    saved: String,
    target: String,
    progress: String,
    deadline: String,
    status: String,
    category: String,
}

fn progress(g: &Goal) -> String {
    if g.target_amount <= Decimal::ZERO {
        return "-".into();
    }
    let pct = g.current_amount / g.target_amount * Decimal::from(100);
    format!("{:.0}%", pct.round_dp(0))
}

async fn list(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let household = env.household().await?;
    let data: Vec<GoalLine> = household
        .snapshot
        .goals
        .iter()
        .map(|g| GoalLine {
            id: g.id.clone(),
            title: g.title.clone(),
            saved: g.current_amount.round_dp(2).to_string(),
            target: g.target_amount.round_dp(2).to_string(),
            progress: progress(g),
            deadline: g.deadline.map(|d| d.to_string()).unwrap_or_default(),
            status: g.status.to_string(),
            category: g.category.clone(),
        })
        .collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|g| {
                vec![
                    g.id, g.title, g.saved, g.target, g.progress, g.deadline, g.status, g.category,
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Title", "Saved", "Target", "Progress", "Deadline", "Status", "Category"],
                rows,
            )
        );
    }
    Ok(())
}

async fn contribute(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_contribution(arg(sub, "amount")?)?;
    let goal_id = arg(sub, "goal")?;
    let household = env.household().await?;
    let goal = household
        .snapshot
        .goal(goal_id)
        .ok_or_else(|| anyhow!("Goal '{}' not found", goal_id))?;
    let mut saga = ContributionSaga::new(goal, amount, Utc::now())?;
    let mutations = household.mutations(env);
    let state = saga.run(&mutations).await.clone();
    match state {
        SagaState::Completed => {
            println!(
                "Contributed {} to '{}' (now {})",
                fmt_money(&amount, &env.config.currency),
                goal.title,
                fmt_money(&saga.new_amount(), &env.config.currency)
            );
            Ok(())
        }
        SagaState::Failed { step, reason } => {
            bail!("Contribution stopped at '{}': {}", step, reason)
        }
        other => bail!("Contribution did not finish: {:?}", other),
    }
}
