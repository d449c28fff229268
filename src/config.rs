// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime configuration.
//!
//! Lookup order per key: `DUOCASH_<KEY>` environment variable, then the
//! `settings` table, then the built-in default.

use crate::utils::get_setting;
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use std::time::Duration;

pub const KEYS: &[&str] = &[
    "currency",
    "gemini_api_key",
    "gemini_model",
    "assistant_timeout_secs",
    "assistant_recent_transactions",
    "calendar_client_id",
    "calendar_client_secret",
    "stripe_secret_key",
    "stripe_webhook_secret",
    "stripe_price_id",
    "app_url",
];

#[derive(Debug, Clone, Default)]
pub struct CalendarConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub price_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub currency: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub assistant_timeout: Duration,
    pub recent_transactions: usize,
    pub calendar: CalendarConfig,
    pub stripe: StripeConfig,
    pub app_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: "BRL".into(),
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".into(),
            assistant_timeout: Duration::from_secs(30),
            recent_transactions: 5,
            calendar: CalendarConfig::default(),
            stripe: StripeConfig::default(),
            app_url: "http://localhost:3000".into(),
        }
    }
}

pub fn env_var_for(key: &str) -> String {
    format!("DUOCASH_{}", key.to_uppercase())
}

pub fn is_known_key(key: &str) -> bool {
    KEYS.contains(&key)
}

fn lookup(conn: &Connection, key: &str) -> Result<Option<String>> {
    if let Ok(v) = std::env::var(env_var_for(key)) {
        if !v.trim().is_empty() {
            return Ok(Some(v.trim().to_string()));
        }
    }
    if key == "gemini_api_key" {
        if let Ok(v) = std::env::var("GEMINI_API_KEY") {
            if !v.trim().is_empty() {
                return Ok(Some(v.trim().to_string()));
            }
        }
    }
    get_setting(conn, key)
}

impl Config {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut cfg = Config::default();
        if let Some(v) = lookup(conn, "currency")? {
            cfg.currency = v.to_uppercase();
        }
        cfg.gemini_api_key = lookup(conn, "gemini_api_key")?;
        if let Some(v) = lookup(conn, "gemini_model")? {
            cfg.gemini_model = v;
        }
        if let Some(v) = lookup(conn, "assistant_timeout_secs")? {
            let secs: u64 = v
                .parse()
                .with_context(|| format!("Invalid assistant_timeout_secs '{}'", v))?;
            if secs == 0 {
                return Err(anyhow!("assistant_timeout_secs must be positive"));
            }
            cfg.assistant_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = lookup(conn, "assistant_recent_transactions")? {
            cfg.recent_transactions = v
                .parse()
                .with_context(|| format!("Invalid assistant_recent_transactions '{}'", v))?;
        }
        cfg.calendar = CalendarConfig {
            client_id: lookup(conn, "calendar_client_id")?,
            client_secret: lookup(conn, "calendar_client_secret")?,
        };
        cfg.stripe = StripeConfig {
            secret_key: lookup(conn, "stripe_secret_key")?,
            webhook_secret: lookup(conn, "stripe_webhook_secret")?,
            price_id: lookup(conn, "stripe_price_id")?,
        };
        if let Some(v) = lookup(conn, "app_url")? {
            cfg.app_url = v.trim_end_matches('/').to_string();
        }
        Ok(cfg)
    }
}
