// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Profiles and the couple aggregate.

use crate::models::{Couple, MemberDetails, Profile, RiskTolerance, Role};
use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use url::Url;
use uuid::Uuid;

const AVATAR_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

fn profile_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<(Profile, String, String)> {
    let role: String = r.get(4)?;
    let income: String = r.get(5)?;
    Ok((
        Profile {
            id: r.get(0)?,
            email: r.get(1)?,
            name: r.get(2)?,
            couple_id: r.get(3)?,
            role: Role::Primary,
            monthly_income: Decimal::ZERO,
            income_day: r.get(6)?,
            avatar_url: r.get(7)?,
        },
        role,
        income,
    ))
}

fn finish_profile((mut p, role, income): (Profile, String, String)) -> Result<Profile> {
    p.role = role.parse().map_err(anyhow::Error::msg)?;
    p.monthly_income = income
        .parse()
        .with_context(|| format!("Invalid monthly income '{}' for {}", income, p.id))?;
    Ok(p)
}

const PROFILE_COLUMNS: &str =
    "id, email, name, couple_id, role, monthly_income, income_day, avatar_url";

pub fn load_profile(conn: &Connection, user_id: &str) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE id=?1", PROFILE_COLUMNS);
    let raw = conn
        .query_row(&sql, params![user_id], profile_from_row)
        .optional()?;
    raw.map(finish_profile).transpose()
}

pub fn members(conn: &Connection, couple_id: &str) -> Result<Vec<Profile>> {
    let sql = format!(
        "SELECT {} FROM profiles WHERE couple_id=?1
         ORDER BY CASE role WHEN 'primary' THEN 0 ELSE 1 END, id",
        PROFILE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![couple_id], profile_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(finish_profile(row?)?);
    }
    Ok(out)
}

pub fn create_profile(conn: &Connection, user_id: &str, email: &str, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO profiles(id, email, name) VALUES (?1,?2,?3)
         ON CONFLICT(id) DO NOTHING",
        params![user_id, email, name],
    )?;
    Ok(())
}

pub fn update_profile_details(conn: &Connection, user_id: &str, details: &MemberDetails) -> Result<()> {
    let n = conn.execute(
        "UPDATE profiles SET name=?1, monthly_income=?2, income_day=?3 WHERE id=?4",
        params![
            details.name,
            details.monthly_income.to_string(),
            details.income_day,
            user_id
        ],
    )?;
    if n == 0 {
        anyhow::bail!("Profile '{}' not found", user_id);
    }
    Ok(())
}

pub fn set_avatar_url(conn: &Connection, user_id: &str, url: &str) -> Result<()> {
    let n = conn.execute(
        "UPDATE profiles SET avatar_url=?1 WHERE id=?2",
        params![url, user_id],
    )?;
    if n == 0 {
        anyhow::bail!("Profile '{}' not found", user_id);
    }
    Ok(())
}

/// Object path for a member's avatar, keyed by the file's extension.
pub fn avatar_path(user_id: &str, file: &Path) -> Result<String> {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !AVATAR_EXTENSIONS.contains(&ext.as_str()) {
        anyhow::bail!(
            "Unsupported avatar image '{}' (use one of: {})",
            file.display(),
            AVATAR_EXTENSIONS.join(", ")
        );
    }
    Ok(format!("avatars/{}.{}", user_id, ext))
}

/// Local object storage: copies `file` to `root/path`, replacing any
/// previous object, and returns its public `file://` URL.
pub fn upload(root: &Path, path: &str, file: &Path) -> Result<String> {
    let dest = root.join(path);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::copy(file, &dest)
        .with_context(|| format!("Failed to copy {} to {}", file.display(), dest.display()))?;
    let dest = dest
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", dest.display()))?;
    let url = Url::from_file_path(&dest)
        .map_err(|_| anyhow!("No URL for {}", dest.display()))?;
    Ok(url.to_string())
}

/// Creates a couple with `user_id` as its primary member. A user who
/// already belongs to a couple keeps it.
pub fn provision_couple(conn: &mut Connection, user_id: &str, name: &str) -> Result<String> {
    let tx = conn.transaction()?;
    let existing: Option<Option<String>> = tx
        .query_row(
            "SELECT couple_id FROM profiles WHERE id=?1",
            params![user_id],
            |r| r.get(0),
        )
        .optional()?;
    let existing = existing.with_context(|| format!("Profile '{}' not found", user_id))?;
    if let Some(couple_id) = existing {
        return Ok(couple_id);
    }
    let couple_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO couples(id, name) VALUES (?1,?2)",
        params![couple_id, name],
    )?;
    tx.execute(
        "UPDATE profiles SET couple_id=?1, role='primary' WHERE id=?2",
        params![couple_id, user_id],
    )?;
    tx.commit()?;
    Ok(couple_id)
}

pub fn update_couple(
    conn: &Connection,
    couple_id: &str,
    name: &str,
    risk: RiskTolerance,
) -> Result<()> {
    let n = conn.execute(
        "UPDATE couples SET name=?1, risk_tolerance=?2 WHERE id=?3",
        params![name, risk.as_str(), couple_id],
    )?;
    if n == 0 {
        anyhow::bail!("Couple '{}' not found", couple_id);
    }
    Ok(())
}

pub fn set_invite_link(conn: &Connection, couple_id: &str, link: &str) -> Result<()> {
    conn.execute(
        "UPDATE couples SET invite_link=?1 WHERE id=?2",
        params![link, couple_id],
    )?;
    Ok(())
}

fn details(p: &Profile) -> MemberDetails {
    MemberDetails {
        name: p.name.clone(),
        email: p.email.clone(),
        monthly_income: p.monthly_income,
        income_day: p.income_day,
    }
}

pub fn load_couple(conn: &Connection, couple_id: &str) -> Result<Option<Couple>> {
    let row = conn
        .query_row(
            "SELECT name, risk_tolerance, invite_link FROM couples WHERE id=?1",
            params![couple_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;
    let Some((name, risk, invite_link)) = row else {
        return Ok(None);
    };
    let people = members(conn, couple_id)?;
    Ok(Some(Couple {
        id: couple_id.to_string(),
        name,
        user1: people.first().map(details).unwrap_or_default(),
        user2: people.get(1).map(details).unwrap_or_default(),
        risk_tolerance: risk.parse().unwrap_or(RiskTolerance::Medium),
        invite_link,
    }))
}
