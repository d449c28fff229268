// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg};
use crate::error::PaymentError;
use crate::payments::{PaymentsClient, WebhookOutcome, handle_webhook};
use anyhow::{Context, Result};
use chrono::Utc;

pub async fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("checkout", sub)) => checkout(env, sub).await?,
        Some(("webhook", sub)) => webhook(env, sub)?,
        _ => {}
    }
    Ok(())
}

async fn checkout(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let ctx = env.context().await?;
    let client = PaymentsClient::new(&env.config.stripe)?;
    let session = client
        .create_checkout(
            &ctx.session.user_id,
            &ctx.session.email,
            arg(sub, "couple-name")?,
            &env.config.app_url,
        )
        .await?;
    match session.url {
        Some(url) => println!("Complete your checkout at {}", url),
        None => println!("Checkout session {} created", session.id),
    }
    Ok(())
}

fn webhook(env: &Env, sub: &clap::ArgMatches) -> Result<()> {
    let secret = env
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or(PaymentError::NotConfigured("stripe_webhook_secret"))?;
    let path = arg(sub, "payload")?;
    let payload =
        std::fs::read_to_string(path).with_context(|| format!("Read payload {}", path))?;
    let outcome = env.backend.with_conn_mut(|conn| {
        handle_webhook(conn, secret, arg(sub, "signature")?, &payload, Utc::now())
            .map_err(anyhow::Error::from)
    })?;
    match outcome {
        WebhookOutcome::Provisioned { user_id, couple_id } => {
            println!("Provisioned household {} for {}", couple_id, user_id)
        }
        WebhookOutcome::Ignored(kind) => println!("Ignored event '{}'", kind),
    }
    Ok(())
}
