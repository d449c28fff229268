// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg};
use super::transactions::lines;
use crate::models::Transaction;
use anyhow::{Result, bail};
use std::path::Path;

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(env, sub).await,
        _ => Ok(()),
    }
}

/// Writes `items` to `out` as csv or json, newest first.
pub fn write_transactions(items: &[Transaction], format: &str, out: &Path) -> Result<()> {
    let data = lines(items, None);
    match format {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id",
                "date",
                "type",
                "amount",
                "category",
                "description",
                "member",
            ])?;
            for row in data {
                wtr.write_record([
                    row.id,
                    row.date,
                    row.kind,
                    row.amount,
                    row.category,
                    row.description,
                    row.member,
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(&data)?)?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    Ok(())
}

async fn export_transactions(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let format = arg(sub, "format")?.to_lowercase();
    let out = arg(sub, "out")?;
    let household = env.household().await?;
    write_transactions(&household.snapshot.transactions, &format, Path::new(out))?;
    println!(
        "Exported {} transactions to {}",
        household.snapshot.transactions.len(),
        out
    );
    Ok(())
}
