// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg, opt};
use crate::models::NewInvestment;
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Result, bail};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(env, sub).await?,
        Some(("list", sub)) => list(env, sub).await?,
        _ => {}
    }
    Ok(())
}

async fn add(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let symbol = arg(sub, "symbol")?.trim().to_uppercase();
    let price = parse_decimal(arg(sub, "price")?)?;
    let shares = parse_decimal(arg(sub, "shares")?)?;
    if price <= Decimal::ZERO || shares <= Decimal::ZERO {
        bail!("Price and shares must be positive");
    }
    let input = NewInvestment {
        name: opt(sub, "name").unwrap_or(&symbol).to_string(),
        symbol,
        price,
        shares,
        goal_id: opt(sub, "goal").map(str::to_string),
        date: match opt(sub, "date") {
            Some(d) => parse_date(d)?,
            None => Utc::now().date_naive(),
        },
    };
    let household = env.household().await?;
    household.mutations(env).create_investment(&input).await?;
    println!(
        "Recorded {} x {} at {}",
        input.shares,
        input.symbol,
        fmt_money(&input.price, &env.config.currency)
    );
    Ok(())
}

#[derive(Serialize)]
struct PositionLine {
    symbol: String,
    name: String,
    shares: String,
    price: String,
    invested: String,
    value: String,
}

async fn list(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let household = env.household().await?;
    let mut total_invested = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;
    let data: Vec<PositionLine> = household
        .snapshot
        .investments
        .iter()
        .map(|i| {
            let value = i.price * i.shares;
            total_invested += i.total_invested;
            total_value += value;
            PositionLine {
                symbol: i.symbol.clone(),
                name: i.name.clone(),
                shares: i.shares.normalize().to_string(),
                price: i.price.round_dp(2).to_string(),
                invested: i.total_invested.round_dp(2).to_string(),
                value: value.round_dp(2).to_string(),
            }
        })
        .collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|p| vec![p.symbol, p.name, p.shares, p.price, p.invested, p.value])
            .collect();
        println!(
            "{}",
            pretty_table(&["Symbol", "Name", "Shares", "Price", "Invested", "Value"], rows)
        );
        println!(
            "Invested {} / value {}",
            fmt_money(&total_invested, &env.config.currency),
            fmt_money(&total_value, &env.config.currency)
        );
    }
    Ok(())
}
