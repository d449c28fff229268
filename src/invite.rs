// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Token-based partner invites.

use crate::error::InviteError;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::info;

pub const DEFAULT_TTL_DAYS: i64 = 7;
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invite {
    pub token: String,
    pub couple_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Public view of a pending invite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InviteInfo {
    pub couple_id: String,
    pub couple_name: String,
    pub inviter_name: String,
    pub expires_at: DateTime<Utc>,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn invite_link(app_url: &str, token: &str) -> String {
    format!("{}/join/{}", app_url.trim_end_matches('/'), token)
}

pub fn create(
    conn: &Connection,
    couple_id: &str,
    created_by: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Invite, InviteError> {
    let token = generate_token();
    let expires_at = now + ttl;
    conn.execute(
        "INSERT INTO invites(token, couple_id, created_by, expires_at) VALUES (?1,?2,?3,?4)",
        params![token, couple_id, created_by, expires_at.to_rfc3339()],
    )?;
    info!(couple = %couple_id, "invite created");
    Ok(Invite {
        token,
        couple_id: couple_id.to_string(),
        expires_at,
    })
}

struct InviteRecord {
    couple_id: String,
    created_by: String,
    expires_at: DateTime<Utc>,
    used: bool,
}

fn load(conn: &Connection, token: &str) -> Result<InviteRecord, InviteError> {
    let row = conn
        .query_row(
            "SELECT couple_id, created_by, expires_at, used_at FROM invites WHERE token=?1",
            params![token.trim()],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?
        .ok_or(InviteError::NotFound)?;
    let (couple_id, created_by, expires_raw, used_at) = row;
    // An unreadable expiry is treated as already expired.
    let expires_at = DateTime::parse_from_rfc3339(&expires_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    Ok(InviteRecord {
        couple_id,
        created_by,
        expires_at,
        used: used_at.is_some(),
    })
}

fn check(record: &InviteRecord, now: DateTime<Utc>) -> Result<(), InviteError> {
    if record.used {
        return Err(InviteError::AlreadyUsed);
    }
    if record.expires_at <= now {
        return Err(InviteError::Expired);
    }
    Ok(())
}

/// Read-only check that needs no session.
pub fn validate(conn: &Connection, token: &str, now: DateTime<Utc>) -> Result<InviteInfo, InviteError> {
    let record = load(conn, token)?;
    check(&record, now)?;
    let couple_name: String = conn
        .query_row(
            "SELECT name FROM couples WHERE id=?1",
            params![record.couple_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(InviteError::NotFound)?;
    let inviter_name: String = conn
        .query_row(
            "SELECT name FROM profiles WHERE id=?1",
            params![record.created_by],
            |r| r.get(0),
        )
        .optional()?
        .unwrap_or_default();
    Ok(InviteInfo {
        couple_id: record.couple_id,
        couple_name,
        inviter_name,
        expires_at: record.expires_at,
    })
}

/// Joins `user_id` to the inviting couple as its partner and consumes the
/// token. Returns the couple id.
pub fn accept(
    conn: &mut Connection,
    token: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<String, InviteError> {
    let tx = conn.transaction()?;
    let record = load(&tx, token)?;
    check(&record, now)?;

    let current: Option<Option<String>> = tx
        .query_row(
            "SELECT couple_id FROM profiles WHERE id=?1",
            params![user_id],
            |r| r.get(0),
        )
        .optional()?;
    let current = current.ok_or(InviteError::NotFound)?;
    if record.created_by == user_id || current.as_deref() == Some(record.couple_id.as_str()) {
        return Err(InviteError::AlreadyMember);
    }

    let members: i64 = tx.query_row(
        "SELECT COUNT(*) FROM profiles WHERE couple_id=?1 AND id != ?2",
        params![record.couple_id, user_id],
        |r| r.get(0),
    )?;
    if members >= 2 {
        return Err(InviteError::CoupleFull);
    }

    let updated = tx.execute(
        "UPDATE profiles SET couple_id=?1, role='partner' WHERE id=?2",
        params![record.couple_id, user_id],
    )?;
    if updated == 0 {
        return Err(InviteError::NotFound);
    }
    tx.execute(
        "UPDATE invites SET used_at=?1, used_by=?2 WHERE token=?3",
        params![now.to_rfc3339(), user_id, token.trim()],
    )?;
    tx.commit()?;
    info!(couple = %record.couple_id, user = %user_id, "invite accepted");
    Ok(record.couple_id)
}
