// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Hosted checkout (Stripe) and the webhook that provisions a couple once
//! the checkout completes.

use crate::config::StripeConfig;
use crate::error::PaymentError;
use crate::household::provision_couple;
use crate::utils::http_client;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rusqlite::Connection;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{info, warn};

const API_URL: &str = "https://api.stripe.com/v1";
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;
pub const COMPLETED_EVENT: &str = "checkout.session.completed";
const DEFAULT_COUPLE_NAME: &str = "Our household";
const BLOCK: usize = 64;

pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut block = [0u8; BLOCK];
    if key.len() > BLOCK {
        block[..32].copy_from_slice(&Sha256::digest(key));
    } else {
        block[..key.len()].copy_from_slice(key);
    }
    let mut inner = Sha256::new();
    inner.update(block.map(|b| b ^ 0x36));
    inner.update(message);
    let inner = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(block.map(|b| b ^ 0x5c));
    outer.update(inner);
    outer.finalize().into()
}

/// Signature header value for `payload` at `timestamp`.
pub fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
    let signed = format!("{}.{}", timestamp, payload);
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(hmac_sha256(secret.as_bytes(), signed.as_bytes()))
    )
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Checks a `t=<unix>,v1=<hex>` header against `payload`. Any `v1` entry may
/// match; the timestamp must be within the tolerance window of `now`.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &str,
    now: DateTime<Utc>,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => candidates.push(v.to_string()),
            _ => {}
        }
    }
    let timestamp =
        timestamp.ok_or_else(|| PaymentError::Signature("missing timestamp".into()))?;
    if candidates.is_empty() {
        return Err(PaymentError::Signature("missing v1 signature".into()));
    }
    if (now.timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentError::Signature("timestamp outside tolerance".into()));
    }
    let signed = format!("{}.{}", timestamp, payload);
    let expected = hmac_sha256(secret.as_bytes(), signed.as_bytes());
    let matched = candidates.iter().any(|c| {
        hex::decode(c)
            .map(|bytes| constant_time_eq(&bytes, &expected))
            .unwrap_or(false)
    });
    if !matched {
        return Err(PaymentError::Signature("no matching signature".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: CheckoutObject,
}

#[derive(Debug, Deserialize)]
struct CheckoutObject {
    #[serde(default)]
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: Option<CheckoutMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutMetadata {
    #[serde(default)]
    couple_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Provisioned { user_id: String, couple_id: String },
    Ignored(String),
}

/// Verifies and applies one webhook delivery. Replays of a completed
/// checkout return the couple the user already has.
pub fn handle_webhook(
    conn: &mut Connection,
    secret: &str,
    signature_header: &str,
    payload: &str,
    now: DateTime<Utc>,
) -> Result<WebhookOutcome, PaymentError> {
    if let Err(err) = verify_signature(secret, signature_header, payload, now) {
        warn!("rejecting webhook: {}", err);
        return Err(err);
    }
    let event: WebhookEvent = serde_json::from_str(payload)?;
    if event.kind != COMPLETED_EVENT {
        info!(kind = %event.kind, "ignoring webhook event");
        return Ok(WebhookOutcome::Ignored(event.kind));
    }
    let object = event.data.object;
    let user_id = object
        .client_reference_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PaymentError::Provider("checkout without client reference".into()))?;
    let name = object
        .metadata
        .and_then(|m| m.couple_name)
        .unwrap_or_else(|| DEFAULT_COUPLE_NAME.to_string());
    let couple_id = provision_couple(conn, &user_id, &name)
        .map_err(|e| PaymentError::Provider(format!("{:#}", e)))?;
    info!(user = %user_id, couple = %couple_id, "couple provisioned from checkout");
    Ok(WebhookOutcome::Provisioned { user_id, couple_id })
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

pub struct PaymentsClient {
    http: Client,
    secret_key: String,
    price_id: String,
    api_url: String,
}

impl PaymentsClient {
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let secret_key = config
            .secret_key
            .clone()
            .ok_or(PaymentError::NotConfigured("stripe_secret_key"))?;
        let price_id = config
            .price_id
            .clone()
            .ok_or(PaymentError::NotConfigured("stripe_price_id"))?;
        Ok(Self {
            http: http_client(Duration::from_secs(20))?,
            secret_key,
            price_id,
            api_url: API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.api_url = url.trim_end_matches('/').to_string();
        self
    }

    pub async fn create_checkout(
        &self,
        user_id: &str,
        email: &str,
        couple_name: &str,
        app_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let success = format!("{}/onboarding?checkout=success", app_url);
        let cancel = format!("{}/onboarding?checkout=cancel", app_url);
        let resp = self
            .http
            .post(format!("{}/checkout/sessions", self.api_url))
            .basic_auth(&self.secret_key, Some(""))
            .form(&[
                ("mode", "subscription"),
                ("line_items[0][price]", self.price_id.as_str()),
                ("line_items[0][quantity]", "1"),
                ("client_reference_id", user_id),
                ("customer_email", email),
                ("metadata[couple_name]", couple_name),
                ("success_url", success.as_str()),
                ("cancel_url", cancel.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Provider(format!("checkout HTTP {}: {}", status, body)));
        }
        let session: CheckoutSession = resp.json().await?;
        info!(user = %user_id, session = %session.id, "checkout session created");
        Ok(session)
    }
}
