// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg, opt};
use crate::auth::{AuthService, register_or_sign_in};
use crate::db;
use crate::utils::fmt_money;
use anyhow::Result;
use std::path::Path;

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("signup", sub)) => signup(env, sub).await?,
        Some(("login", sub)) => login(env, sub).await?,
        Some(("logout", _)) => logout(env).await?,
        Some(("whoami", _)) => whoami(env).await?,
        Some(("avatar", sub)) => avatar(env, sub).await?,
        _ => {}
    }
    Ok(())
}

async fn signup(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let auth = env.auth();
    let session = register_or_sign_in(
        &auth,
        arg(sub, "email")?,
        arg(sub, "password")?,
        arg(sub, "name")?,
    )
    .await?;
    env.remember_session(&session.token)?;
    println!("Signed in as {}", session.email);
    Ok(())
}

async fn login(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let auth = env.auth();
    let session = auth
        .sign_in(arg(sub, "email")?, arg(sub, "password")?)
        .await?;
    env.remember_session(&session.token)?;
    println!("Signed in as {}", session.email);
    Ok(())
}

async fn logout(env: &Env) -> Result<()> {
    if env.session_token()?.is_none() {
        println!("Not signed in");
        return Ok(());
    }
    let auth = env.auth();
    match env.context().await {
        Ok(ctx) => ctx.sign_out(&auth).await?,
        Err(err) => tracing::warn!("stale session: {:#}", err),
    }
    env.forget_session()?;
    println!("Signed out");
    Ok(())
}

async fn whoami(env: &Env) -> Result<()> {
    let ctx = env.context().await?;
    let p = &ctx.profile;
    println!("{} <{}> ({})", p.name, p.email, p.role);
    println!(
        "Income: {} on day {}",
        fmt_money(&p.monthly_income, &env.config.currency),
        p.income_day
    );
    if let Some(url) = &p.avatar_url {
        println!("Avatar: {}", url);
    }
    match &ctx.couple {
        Some(c) => {
            println!("Household: {} ({})", c.name, c.id);
            println!("  {} / {}", c.user1.name, c.user2.name);
            println!("  Risk tolerance: {}", c.risk_tolerance);
        }
        None => println!("Household: none yet"),
    }
    Ok(())
}

async fn avatar(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let mut ctx = env.context().await?;
    let owner = opt(sub, "member")
        .map(str::to_string)
        .unwrap_or_else(|| ctx.session.user_id.clone());
    let storage = db::data_dir()?.join("storage");
    let url = ctx.upload_avatar(&env.backend, &storage, &owner, Path::new(arg(sub, "file")?))?;
    println!("Avatar uploaded: {}", url);
    Ok(())
}
