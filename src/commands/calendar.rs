// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg};
use crate::calendar::{CalendarClient, connect, disconnect, refresh_token_for};
use crate::utils::pretty_table;
use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("connect", sub)) => connect_cmd(env, sub).await?,
        Some(("disconnect", _)) => disconnect_cmd(env).await?,
        Some(("upcoming", sub)) => upcoming(env, sub).await?,
        _ => {}
    }
    Ok(())
}

async fn connect_cmd(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let ctx = env.context().await?;
    let owner = ctx.session.user_id.clone();
    ctx.ensure_owner(&owner)?;
    env.backend
        .with_conn(|conn| connect(conn, &owner, arg(sub, "refresh-token")?))?;
    println!("Calendar connected");
    Ok(())
}

async fn disconnect_cmd(env: &Env) -> Result<()> {
    let ctx = env.context().await?;
    let owner = ctx.session.user_id.clone();
    ctx.ensure_owner(&owner)?;
    env.backend.with_conn(|conn| disconnect(conn, &owner))?;
    println!("Calendar disconnected");
    Ok(())
}

async fn upcoming(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let ctx = env.context().await?;
    let days = sub.get_one::<i64>("days").copied().unwrap_or(7).max(1);
    let token = env
        .backend
        .with_conn(|conn| refresh_token_for(conn, &ctx.session.user_id))?
        .ok_or_else(|| anyhow!("Calendar not connected. Run `duocash calendar connect`."))?;
    let client = CalendarClient::new(&env.config.calendar)?;
    let access = client.refresh_access_token(&token).await?;
    let now = Utc::now();
    let events = client
        .list_events(&access, now, now + Duration::days(days))
        .await?;
    let rows = events
        .into_iter()
        .map(|e| {
            vec![
                e.start
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
                e.title,
                e.link.unwrap_or_default(),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Start", "Title", "Link"], rows));
    Ok(())
}
