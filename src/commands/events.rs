// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg, opt};
use crate::calendar::{CalendarClient, MirrorOutcome, refresh_token_for};
use crate::models::NewEvent;
use crate::utils::{maybe_print_json, parse_datetime, parse_decimal, pretty_table};
use anyhow::{Result, anyhow, bail};
use chrono::Duration;
use serde::Serialize;

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(env, sub).await?,
        Some(("list", sub)) => list(env, sub).await?,
        _ => {}
    }
    Ok(())
}

pub fn new_event(sub: &clap::ArgMatches) -> Result<NewEvent> {
    let start = parse_datetime(arg(sub, "start")?)?;
    let end = match opt(sub, "end") {
        Some(e) => parse_datetime(e)?,
        None => start + Duration::hours(1),
    };
    if end < start {
        bail!("Event ends before it starts");
    }
    Ok(NewEvent {
        title: arg(sub, "title")?.trim().to_string(),
        start,
        end,
        kind: arg(sub, "kind")?.parse().map_err(|e: String| anyhow!(e))?,
        value: opt(sub, "value").map(parse_decimal).transpose()?,
        assignee: None,
        goal_id: opt(sub, "goal").map(str::to_string),
    })
}

async fn add(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let input = new_event(sub)?;
    let household = env.household().await?;
    let outcome = if sub.get_flag("no-mirror") {
        MirrorOutcome::Fallback {
            link: crate::calendar::fallback_link(&input),
        }
    } else {
        let token = env
            .backend
            .with_conn(|conn| refresh_token_for(conn, &household.ctx.session.user_id))?;
        let client = CalendarClient::new(&env.config.calendar)?;
        client.mirror_event(token.as_deref(), &input).await
    };
    household
        .mutations(env)
        .create_event_mirrored(&input, outcome.external())
        .await?;
    match &outcome {
        MirrorOutcome::Synced { link, .. } => {
            println!("Created '{}' and added it to your calendar: {}", input.title, link)
        }
        MirrorOutcome::Fallback { link } => {
            println!("Created '{}'. Add it to your calendar: {}", input.title, link)
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct EventLine {
    id: String,
    title: String,
    start: String,
    end: String,
    kind: String,
    synced: bool,
    link: String,
}

async fn list(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let household = env.household().await?;
    let mut events = household.snapshot.events.clone();
    events.sort_by_key(|e| e.start);
    let data: Vec<EventLine> = events
        .into_iter()
        .map(|e| EventLine {
            id: e.id,
            title: e.title,
            start: e.start.format("%Y-%m-%d %H:%M").to_string(),
            end: e.end.format("%Y-%m-%d %H:%M").to_string(),
            kind: e.kind.to_string(),
            synced: e.synced,
            link: e.external_link.unwrap_or_default(),
        })
        .collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|e| {
                vec![
                    e.id,
                    e.title,
                    e.start,
                    e.end,
                    e.kind,
                    if e.synced { "yes".into() } else { String::new() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Title", "Start", "End", "Type", "Synced"], rows)
        );
    }
    Ok(())
}
