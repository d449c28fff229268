// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg};
use crate::household::set_invite_link;
use crate::invite::{DEFAULT_TTL_DAYS, accept, create, invite_link, validate};
use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => create_cmd(env, sub).await?,
        Some(("show", sub)) => show(env, sub)?,
        Some(("accept", sub)) => accept_cmd(env, sub).await?,
        _ => {}
    }
    Ok(())
}

async fn create_cmd(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let ctx = env.context().await?;
    let couple_id = ctx
        .couple_id()
        .ok_or_else(|| anyhow!("Set up your household before inviting a partner"))?;
    let days = sub
        .get_one::<i64>("days")
        .copied()
        .unwrap_or(DEFAULT_TTL_DAYS)
        .max(1);
    let invite = env.backend.with_conn(|conn| {
        let invite = create(
            conn,
            couple_id,
            &ctx.session.user_id,
            Duration::days(days),
            Utc::now(),
        )?;
        let link = invite_link(&env.config.app_url, &invite.token);
        set_invite_link(conn, couple_id, &link)?;
        Ok::<_, anyhow::Error>((invite, link))
    })?;
    let (invite, link) = invite;
    println!("Invite link: {}", link);
    println!("Token: {}", invite.token);
    println!("Expires: {}", invite.expires_at.format("%Y-%m-%d %H:%M UTC"));
    Ok(())
}

fn show(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let token = arg(sub, "token")?;
    let info = env
        .backend
        .with_conn(|conn| validate(conn, token, Utc::now()))?;
    let from = if info.inviter_name.is_empty() {
        "your partner".to_string()
    } else {
        info.inviter_name
    };
    println!("Invite from {} to join '{}'", from, info.couple_name);
    println!("Expires: {}", info.expires_at.format("%Y-%m-%d %H:%M UTC"));
    Ok(())
}

async fn accept_cmd(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let token = arg(sub, "token")?;
    let ctx = env.context().await?;
    let user_id = ctx.session.user_id.clone();
    let couple_id = env
        .backend
        .with_conn_mut(|conn| accept(conn, token, &user_id, Utc::now()))?;
    // The store follows the couple the member just joined.
    ctx.store().rescope(&couple_id);
    let state = ctx.store().ready().await;
    println!(
        "Joined household {} ({} transactions shared)",
        couple_id,
        state.snapshot.transactions.len()
    );
    Ok(())
}
