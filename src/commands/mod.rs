// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod auth;
pub mod billing;
pub mod calendar;
pub mod chat;
pub mod config;
pub mod events;
pub mod exporter;
pub mod goals;
pub mod invite;
pub mod onboard;
pub mod portfolio;
pub mod tasks;
pub mod transactions;

use crate::auth::{AppContext, LocalAuth};
use crate::backend::{Backend, LocalBackend};
use crate::config::Config;
use crate::mutations::BackendMutations;
use crate::store::{Snapshot, SyncStore};
use crate::utils::{clear_setting, get_setting, set_setting};
use anyhow::{Context, Result, anyhow, bail};
use std::sync::Arc;

/// Settings key holding the CLI's current session token.
pub const SESSION_KEY: &str = "session_token";

/// What every handler gets: the local backend and the resolved config.
pub struct Env {
    pub backend: LocalBackend,
    pub config: Config,
}

impl Env {
    pub fn new(backend: LocalBackend, config: Config) -> Self {
        Self { backend, config }
    }

    pub fn auth(&self) -> LocalAuth {
        LocalAuth::new(self.backend.clone())
    }

    pub fn session_token(&self) -> Result<Option<String>> {
        self.backend.with_conn(|conn| get_setting(conn, SESSION_KEY))
    }

    pub fn remember_session(&self, token: &str) -> Result<()> {
        self.backend
            .with_conn(|conn| set_setting(conn, SESSION_KEY, token))
    }

    pub fn forget_session(&self) -> Result<()> {
        self.backend.with_conn(|conn| clear_setting(conn, SESSION_KEY))
    }

    /// Builds the signed-in member's context and opens the sync store on
    /// their couple, if they have one.
    pub async fn context(&self) -> Result<AppContext> {
        let token = self
            .session_token()?
            .ok_or_else(|| anyhow!("Not signed in. Run `duocash auth login` first."))?;
        let backend: Arc<dyn Backend> = Arc::new(self.backend.clone());
        let store = Arc::new(SyncStore::new(backend));
        let auth = self.auth();
        AppContext::initialize(&auth, &self.backend, &token, store)
            .await
            .context("Could not restore session")
    }

    /// Signed-in context with a couple and a settled snapshot.
    pub async fn household(&self) -> Result<Household> {
        let ctx = self.context().await?;
        let couple_id = ctx
            .couple_id()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No household yet. Run `duocash onboard` or accept an invite."))?;
        let state = ctx.store().ready().await;
        if let Some(err) = state.error {
            bail!("Could not load household data: {}", err);
        }
        Ok(Household {
            ctx,
            couple_id,
            snapshot: state.snapshot,
        })
    }
}

pub struct Household {
    pub ctx: AppContext,
    pub couple_id: String,
    pub snapshot: Snapshot,
}

impl Household {
    pub fn mutations(&self, env: &Env) -> BackendMutations {
        BackendMutations::new(
            Arc::new(env.backend.clone()),
            &self.couple_id,
            Some(&self.ctx.session.user_id),
        )
    }
}

/// A required argument; clap has already enforced presence.
pub(crate) fn arg<'a>(m: &'a clap::ArgMatches, name: &str) -> Result<&'a str> {
    m.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing --{}", name))
}

pub(crate) fn opt<'a>(m: &'a clap::ArgMatches, name: &str) -> Option<&'a str> {
    m.get_one::<String>(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}
