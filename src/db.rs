// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Duocash", "duocash"));

pub fn data_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.to_path_buf())
}

pub fn db_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("duocash.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("Open in-memory DB")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS users(
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        salt TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS sessions(
        token TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS couples(
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL DEFAULT '',
        risk_tolerance TEXT NOT NULL DEFAULT 'medium'
            CHECK(risk_tolerance IN ('low','medium','high')),
        invite_link TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS profiles(
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        couple_id TEXT,
        role TEXT NOT NULL DEFAULT 'primary' CHECK(role IN ('primary','partner')),
        monthly_income TEXT NOT NULL DEFAULT '0',
        income_day INTEGER NOT NULL DEFAULT 1,
        avatar_url TEXT,
        FOREIGN KEY(id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(couple_id) REFERENCES couples(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_profiles_couple ON profiles(couple_id);

    -- Synced collections keep the row body as JSON; the typed shape lives in rows.rs
    CREATE TABLE IF NOT EXISTS records(
        collection TEXT NOT NULL
            CHECK(collection IN ('transactions','goals','tasks','events','investments')),
        id TEXT NOT NULL,
        couple_id TEXT NOT NULL,
        body TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY(collection, couple_id, id),
        FOREIGN KEY(couple_id) REFERENCES couples(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS invites(
        token TEXT PRIMARY KEY,
        couple_id TEXT NOT NULL,
        created_by TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        used_at TEXT,
        used_by TEXT,
        FOREIGN KEY(couple_id) REFERENCES couples(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS calendar_connections(
        user_id TEXT PRIMARY KEY,
        refresh_token TEXT NOT NULL,
        connected_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );
    "#,
    )?;
    Ok(())
}
