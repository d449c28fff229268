// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Identity, sessions and the per-user application context.

use crate::backend::LocalBackend;
use crate::error::AuthError;
use crate::household::{avatar_path, create_profile, load_couple, load_profile, set_avatar_url, upload};
use crate::invite::generate_token;
use crate::models::{Couple, Profile};
use crate::store::SyncStore;
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use rusqlite::{OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

static EMAIL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub token: String,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
    async fn session(&self, token: &str) -> Result<Option<Session>, AuthError>;
}

pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match EMAIL.as_ref() {
        Some(re) if re.is_match(&email) => Ok(email),
        _ => Err(AuthError::InvalidEmail(email)),
    }
}

/// Signs up, or signs in when the email is already registered.
pub async fn register_or_sign_in(
    auth: &dyn AuthService,
    email: &str,
    password: &str,
    name: &str,
) -> Result<Session, AuthError> {
    match auth.sign_up(email, password, name).await {
        Err(AuthError::AlreadyRegistered) => {
            info!("email already registered, signing in instead");
            auth.sign_in(email, password).await
        }
        other => other,
    }
}

/// Argon2id with a fresh 16-byte salt. Returns the PHC string and the salt.
fn hash_password(password: &str) -> Result<(String, String), AuthError> {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok((hash.to_string(), salt.as_str().to_string()))
}

fn verify_password(stored: &str, password: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!("unreadable password hash: {}", err);
            false
        }
    }
}

/// Password auth against the local database.
pub struct LocalAuth {
    backend: LocalBackend,
}

impl LocalAuth {
    pub fn new(backend: LocalBackend) -> Self {
        Self { backend }
    }

    fn open_session(&self, user_id: &str, email: &str) -> Result<Session, AuthError> {
        let token = generate_token();
        self.backend.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions(token, user_id) VALUES (?1,?2)",
                params![token, user_id],
            )
        })?;
        Ok(Session {
            user_id: user_id.to_string(),
            email: email.to_string(),
            token,
        })
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;
        if password.len() < 6 {
            return Err(AuthError::Forbidden(
                "password must have at least 6 characters".into(),
            ));
        }
        let user_id = Uuid::new_v4().to_string();
        let (hash, salt) = hash_password(password)?;
        self.backend.with_conn(|conn| {
            let exists: Option<String> = conn
                .query_row("SELECT id FROM users WHERE email=?1", params![email], |r| {
                    r.get(0)
                })
                .optional()?;
            if exists.is_some() {
                return Err(AuthError::AlreadyRegistered);
            }
            conn.execute(
                "INSERT INTO users(id, email, password_hash, salt) VALUES (?1,?2,?3,?4)",
                params![user_id, email, hash, salt],
            )?;
            create_profile(conn, &user_id, &email, name.trim())
                .map_err(|e| AuthError::Forbidden(e.to_string()))?;
            Ok(())
        })?;
        info!(user = %user_id, "user registered");
        self.open_session(&user_id, &email)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;
        let row = self.backend.with_conn(|conn| {
            conn.query_row(
                "SELECT id, password_hash FROM users WHERE email=?1",
                params![email],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()
        })?;
        let Some((user_id, stored)) = row else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&stored, password) {
            warn!(user = %user_id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        self.open_session(&user_id, &email)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        self.backend.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token=?1", params![session.token])
        })?;
        Ok(())
    }

    async fn session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let row = self.backend.with_conn(|conn| {
            conn.query_row(
                "SELECT u.id, u.email FROM sessions s JOIN users u ON s.user_id=u.id WHERE s.token=?1",
                params![token],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()
        })?;
        Ok(row.map(|(user_id, email)| Session {
            user_id,
            email,
            token: token.to_string(),
        }))
    }
}

/// Everything scoped to the signed-in member, built in a fixed order:
/// session, then profile, then couple. The sync store is opened on the
/// couple and closed again on sign-out.
pub struct AppContext {
    pub session: Session,
    pub profile: Profile,
    pub couple: Option<Couple>,
    store: Arc<SyncStore>,
}

impl AppContext {
    pub async fn initialize(
        auth: &dyn AuthService,
        backend: &LocalBackend,
        token: &str,
        store: Arc<SyncStore>,
    ) -> Result<Self, AuthError> {
        let session = auth.session(token).await?.ok_or(AuthError::NoSession)?;
        let profile = backend
            .with_conn(|conn| load_profile(conn, &session.user_id))
            .map_err(|e| AuthError::Forbidden(e.to_string()))?
            .ok_or(AuthError::NoSession)?;
        let couple = match profile.couple_id.as_deref() {
            Some(id) => backend
                .with_conn(|conn| load_couple(conn, id))
                .map_err(|e| AuthError::Forbidden(e.to_string()))?,
            None => None,
        };
        if let Some(c) = &couple {
            store.open(&c.id);
        }
        Ok(Self {
            session,
            profile,
            couple,
            store,
        })
    }

    pub fn couple_id(&self) -> Option<&str> {
        self.couple.as_ref().map(|c| c.id.as_str())
    }

    pub fn store(&self) -> &Arc<SyncStore> {
        &self.store
    }

    /// Rejects edits to anything owned by the other member.
    pub fn ensure_owner(&self, owner_id: &str) -> Result<(), AuthError> {
        if owner_id != self.session.user_id {
            return Err(AuthError::Forbidden(
                "you can only change your own profile and calendar connection".into(),
            ));
        }
        Ok(())
    }

    /// Stores `file` as `owner_id`'s avatar under `storage` and records its
    /// URL on the profile. Only the signed-in member may change their own.
    pub fn upload_avatar(
        &mut self,
        backend: &LocalBackend,
        storage: &Path,
        owner_id: &str,
        file: &Path,
    ) -> anyhow::Result<String> {
        self.ensure_owner(owner_id)?;
        let url = upload(storage, &avatar_path(owner_id, file)?, file)?;
        backend.with_conn(|conn| set_avatar_url(conn, owner_id, &url))?;
        info!(user = %owner_id, "avatar updated");
        self.profile.avatar_url = Some(url.clone());
        Ok(url)
    }

    pub async fn sign_out(self, auth: &dyn AuthService) -> Result<(), AuthError> {
        self.store.close();
        auth.sign_out(&self.session).await
    }
}
