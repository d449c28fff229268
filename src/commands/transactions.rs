// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg, opt};
use crate::models::{NewTransaction, Transaction, TransactionKind};
use crate::mutations::Mutations;
use crate::utils::{fmt_money, maybe_print_json, parse_datetime, pretty_table};
use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn parse_kind(raw: &str) -> Result<TransactionKind> {
    raw.parse().map_err(|e: String| anyhow!(e))
}

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(env, sub).await?,
        Some(("list", sub)) => list(env, sub).await?,
        _ => {}
    }
    Ok(())
}

/// Builds the transaction described by `tx add` arguments.
pub fn new_transaction(sub: &clap::ArgMatches) -> Result<NewTransaction> {
    let amount = crate::utils::parse_decimal(arg(sub, "amount")?)?;
    if amount <= Decimal::ZERO {
        bail!("Amount must be positive, got {}", amount);
    }
    let date = match opt(sub, "date") {
        Some(d) => parse_datetime(d)?,
        None => Utc::now(),
    };
    Ok(NewTransaction {
        id: None,
        amount,
        category: arg(sub, "category")?.trim().to_string(),
        description: opt(sub, "description").unwrap_or_default().to_string(),
        kind: parse_kind(arg(sub, "kind")?)?,
        date,
    })
}

async fn add(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let input = new_transaction(sub)?;
    let household = env.household().await?;
    household
        .mutations(env)
        .create_transaction(input.clone())
        .await?;
    println!(
        "Recorded {} of {} in {} on {}",
        input.kind,
        fmt_money(&input.amount, &env.config.currency),
        input.category,
        input.date.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionLine {
    pub id: String,
    pub date: String,
    pub kind: String,
    pub amount: String,
    pub category: String,
    pub description: String,
    pub member: String,
}

pub fn lines(items: &[Transaction], limit: Option<usize>) -> Vec<TransactionLine> {
    items
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|t| TransactionLine {
            id: t.id.clone(),
            date: t.date.format("%Y-%m-%d %H:%M").to_string(),
            kind: t.kind.to_string(),
            amount: t.amount.round_dp(2).to_string(),
            category: t.category.clone(),
            description: t.description.clone(),
            member: t.user.to_string(),
        })
        .collect()
}

async fn list(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let household = env.household().await?;
    let data = lines(
        &household.snapshot.transactions,
        sub.get_one::<usize>("limit").copied(),
    );
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.date.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.category.clone(),
                    r.description.clone(),
                    r.member.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Kind", "Amount", "Category", "Description", "Member"],
                rows,
            )
        );
        println!(
            "Balance: {}",
            fmt_money(&household.snapshot.balance(), &env.config.currency)
        );
    }
    Ok(())
}
