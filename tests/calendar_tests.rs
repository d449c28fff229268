// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{TimeZone, Utc};
use duocash::calendar::{
    CalendarClient, MirrorOutcome, connect, disconnect, fallback_link, refresh_token_for,
};
use duocash::config::CalendarConfig;
use duocash::db::open_in_memory;
use duocash::error::CalendarError;
use duocash::models::{EventKind, NewEvent};
use std::collections::HashMap;
use url::Url;

fn dinner() -> NewEvent {
    NewEvent {
        title: "Jantar a dois".into(),
        start: Utc.with_ymd_and_hms(2025, 5, 1, 19, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 5, 1, 21, 30, 0).unwrap(),
        kind: EventKind::Social,
        value: None,
        assignee: None,
        goal_id: None,
    }
}

#[test]
fn fallback_link_prefills_title_and_dates() {
    let link = fallback_link(&dinner());
    let url = Url::parse(&link).unwrap();
    assert_eq!(url.host_str(), Some("calendar.google.com"));
    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(query["action"], "TEMPLATE");
    assert_eq!(query["text"], "Jantar a dois");
    assert_eq!(query["dates"], "20250501T190000Z/20250501T213000Z");
    assert_eq!(query["details"], "social event");
}

#[tokio::test]
async fn unconnected_member_gets_template_link() {
    let client = CalendarClient::new(&CalendarConfig::default()).unwrap();
    let event = dinner();
    let outcome = client.mirror_event(None, &event).await;
    assert_eq!(
        outcome,
        MirrorOutcome::Fallback {
            link: fallback_link(&event)
        }
    );
    assert!(outcome.external().is_none());
}

#[tokio::test]
async fn unreachable_provider_falls_back() {
    let config = CalendarConfig {
        client_id: Some("id".into()),
        client_secret: Some("secret".into()),
    };
    let client = CalendarClient::new(&config)
        .unwrap()
        .with_endpoints("http://127.0.0.1:9/token", "http://127.0.0.1:9/calendar");
    let outcome = client.mirror_event(Some("refresh"), &dinner()).await;
    assert!(matches!(outcome, MirrorOutcome::Fallback { .. }));
}

#[tokio::test]
async fn missing_client_credentials_means_not_connected() {
    let client = CalendarClient::new(&CalendarConfig::default()).unwrap();
    assert!(matches!(
        client.refresh_access_token("refresh").await,
        Err(CalendarError::NotConnected)
    ));
}

#[test]
fn connection_is_stored_per_member() {
    let conn = open_in_memory().unwrap();
    conn.execute(
        "INSERT INTO users(id, email, password_hash, salt) VALUES ('u1','ana@example.com','x','y')",
        [],
    )
    .unwrap();
    assert_eq!(refresh_token_for(&conn, "u1").unwrap(), None);

    connect(&conn, "u1", " first ").unwrap();
    connect(&conn, "u1", "second").unwrap();
    assert_eq!(refresh_token_for(&conn, "u1").unwrap().as_deref(), Some("second"));

    disconnect(&conn, "u1").unwrap();
    assert_eq!(refresh_token_for(&conn, "u1").unwrap(), None);
}
