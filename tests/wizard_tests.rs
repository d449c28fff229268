// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use duocash::db::open_in_memory;
use duocash::error::ValidationError;
use duocash::household::{create_profile, load_couple, load_profile};
use duocash::models::RiskTolerance;
use duocash::wizard::{DRAFT_VERSION, DraftStore, OnboardingDraft, finish};
use rusqlite::{Connection, params};
use serde_json::json;
use tempfile::tempdir;

fn setup() -> Connection {
    let conn = open_in_memory().unwrap();
    conn.execute(
        "INSERT INTO users(id, email, password_hash, salt) VALUES ('u1','ana@example.com','x','y')",
        [],
    )
    .unwrap();
    create_profile(&conn, "u1", "ana@example.com", "").unwrap();
    conn
}

fn answered() -> OnboardingDraft {
    let mut draft = OnboardingDraft::default();
    draft.set("couple_name", "Ana & Bia").unwrap();
    draft.set("name", "Ana").unwrap();
    draft.set("monthly_income", "8500.50").unwrap();
    draft.set("income_day", "5").unwrap();
    draft.set("risk_tolerance", "high").unwrap();
    draft
}

#[test]
fn draft_survives_a_restart() {
    let dir = tempdir().unwrap();
    let store = DraftStore::new(dir.path());
    let mut draft = OnboardingDraft::default();
    draft.set("couple_name", "Casa").unwrap();
    store.save(&draft).unwrap();

    let restored = DraftStore::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(restored, draft);
    assert_eq!(restored.next_field(), Some("name"));
}

#[test]
fn draft_from_another_version_is_discarded() {
    let dir = tempdir().unwrap();
    let store = DraftStore::new(dir.path());
    std::fs::write(
        store.path(),
        json!({ "version": DRAFT_VERSION + 1, "step": 2, "answers": {} }).to_string(),
    )
    .unwrap();
    assert!(store.load().unwrap().is_none());
    assert!(!store.path().exists());
}

#[test]
fn corrupt_draft_is_discarded() {
    let dir = tempdir().unwrap();
    let store = DraftStore::new(dir.path());
    std::fs::write(store.path(), "{ not json").unwrap();
    assert!(store.load().unwrap().is_none());
}

#[test]
fn invalid_answers_are_rejected() {
    let mut draft = OnboardingDraft::default();
    assert!(matches!(
        draft.set("income_day", "40"),
        Err(ValidationError::Invalid(_))
    ));
    assert!(matches!(
        draft.set("monthly_income", "lots"),
        Err(ValidationError::InvalidAmount(_))
    ));
    assert!(matches!(
        draft.set("favourite_colour", "blue"),
        Err(ValidationError::Invalid(_))
    ));
    assert_eq!(
        draft.validate("a@b.co").unwrap_err(),
        ValidationError::Required("couple name")
    );
}

#[test]
fn finish_saves_household_and_clears_draft() {
    let dir = tempdir().unwrap();
    let drafts = DraftStore::new(dir.path());
    drafts.save(&answered()).unwrap();
    let mut conn = setup();

    let save = finish(&mut conn, &drafts, "u1", "ana@example.com").unwrap();
    assert!(save.state().is_completed());
    assert!(drafts.load().unwrap().is_none());

    let couple_id = save.couple_id().unwrap().to_string();
    let couple = load_couple(&conn, &couple_id).unwrap().unwrap();
    assert_eq!(couple.name, "Ana & Bia");
    assert_eq!(couple.risk_tolerance, RiskTolerance::High);
    let profile = load_profile(&conn, "u1").unwrap().unwrap();
    assert_eq!(profile.name, "Ana");
    assert_eq!(profile.income_day, 5);
    assert_eq!(profile.monthly_income.to_string(), "8500.50");
}

#[test]
fn failed_profile_step_keeps_the_draft() {
    let dir = tempdir().unwrap();
    let drafts = DraftStore::new(dir.path());
    drafts.save(&answered()).unwrap();
    let mut conn = setup();
    conn.execute_batch(
        "CREATE TRIGGER no_income BEFORE UPDATE OF monthly_income ON profiles
         BEGIN SELECT RAISE(ABORT, 'income locked'); END;",
    )
    .unwrap();

    let save = finish(&mut conn, &drafts, "u1", "ana@example.com").unwrap();
    assert_eq!(
        save.state().failed_step().map(|s| s.to_string()),
        Some("save profile".to_string())
    );
    assert!(drafts.load().unwrap().is_some());

    // The couple step already committed; re-running reuses it.
    conn.execute_batch("DROP TRIGGER no_income;").unwrap();
    let again = finish(&mut conn, &drafts, "u1", "ana@example.com").unwrap();
    assert!(again.state().is_completed());
    assert_eq!(again.couple_id(), save.couple_id());
    let couples: i64 = conn
        .query_row("SELECT COUNT(*) FROM couples", params![], |r| r.get(0))
        .unwrap();
    assert_eq!(couples, 1);
}
