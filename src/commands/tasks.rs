// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg, opt};
use crate::models::NewTask;
use crate::mutations::Mutations;
use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Result, anyhow};
use serde::Serialize;

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(env, sub).await?,
        Some(("list", sub)) => list(env, sub).await?,
        Some(("done", sub)) => done(env, sub).await?,
        _ => {}
    }
    Ok(())
}

async fn add(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let input = NewTask {
        title: arg(sub, "title")?.trim().to_string(),
        assignee: arg(sub, "assignee")?.parse().map_err(|e: String| anyhow!(e))?,
        priority: arg(sub, "priority")?.parse().map_err(|e: String| anyhow!(e))?,
        deadline: opt(sub, "deadline").map(parse_date).transpose()?,
        goal_id: opt(sub, "goal").map(str::to_string),
        financial_impact: opt(sub, "impact").map(parse_decimal).transpose()?,
    };
    let household = env.household().await?;
    household.mutations(env).create_task(input.clone()).await?;
    println!("Created task '{}' ({} priority)", input.title, input.priority);
    Ok(())
}

#[derive(Serialize)]
struct TaskLine {
    id: String,
    title: String,
    assignee: String,
    priority: String,
    deadline: String,
    done: bool,
}

async fn list(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let household = env.household().await?;
    let data: Vec<TaskLine> = household
        .snapshot
        .tasks
        .iter()
        .map(|t| TaskLine {
            id: t.id.clone(),
            title: t.title.clone(),
            assignee: t.assignee.to_string(),
            priority: t.priority.to_string(),
            deadline: t.deadline.map(|d| d.to_string()).unwrap_or_default(),
            done: t.completed,
        })
        .collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|t| {
                vec![
                    t.id,
                    t.title,
                    t.assignee,
                    t.priority,
                    t.deadline,
                    if t.done { "yes".into() } else { String::new() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Title", "Assignee", "Priority", "Deadline", "Done"], rows)
        );
    }
    Ok(())
}

async fn done(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let id = arg(sub, "id")?;
    let completed = !sub.get_flag("undo");
    let household = env.household().await?;
    household
        .mutations(env)
        .set_task_completed(id, completed)
        .await?;
    println!(
        "Task {} marked {}",
        id,
        if completed { "done" } else { "open" }
    );
    Ok(())
}
