// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! External calendar mirroring (Google Calendar REST API).
//!
//! Mirroring is best effort: when the provider cannot be reached the caller
//! gets a template link the user can open to add the event by hand.

use crate::config::CalendarConfig;
use crate::error::CalendarError;
use crate::models::NewEvent;
use crate::utils::http_client;
use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary";
const TEMPLATE_URL: &str = "https://calendar.google.com/calendar/render";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    Synced { external_id: String, link: String },
    Fallback { link: String },
}

impl MirrorOutcome {
    pub fn link(&self) -> &str {
        match self {
            MirrorOutcome::Synced { link, .. } | MirrorOutcome::Fallback { link } => link,
        }
    }

    /// `(external id, link)` for the persisted row when the mirror succeeded.
    pub fn external(&self) -> Option<(String, String)> {
        match self {
            MirrorOutcome::Synced { external_id, link } => {
                Some((external_id.clone(), link.clone()))
            }
            MirrorOutcome::Fallback { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub id: String,
    pub title: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventResource {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    html_link: Option<String>,
    #[serde(default)]
    start: Option<EventTime>,
    #[serde(default)]
    end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventResource>,
}

impl From<EventResource> for RemoteEvent {
    fn from(r: EventResource) -> Self {
        RemoteEvent {
            id: r.id,
            title: r.summary.unwrap_or_default(),
            start: r.start.and_then(|t| t.date_time),
            end: r.end.and_then(|t| t.date_time),
            link: r.html_link,
        }
    }
}

/// Link that pre-fills the provider's "new event" page.
pub fn fallback_link(event: &NewEvent) -> String {
    let fmt = "%Y%m%dT%H%M%SZ";
    let dates = format!("{}/{}", event.start.format(fmt), event.end.format(fmt));
    let details = match event.value {
        Some(v) => format!("{} event, value {}", event.kind, v),
        None => format!("{} event", event.kind),
    };
    match Url::parse_with_params(
        TEMPLATE_URL,
        &[
            ("action", "TEMPLATE"),
            ("text", event.title.as_str()),
            ("dates", dates.as_str()),
            ("details", details.as_str()),
        ],
    ) {
        Ok(url) => url.to_string(),
        Err(_) => TEMPLATE_URL.to_string(),
    }
}

pub struct CalendarClient {
    http: Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_url: String,
    api_url: String,
}

impl CalendarClient {
    pub fn new(config: &CalendarConfig) -> Result<Self, CalendarError> {
        Ok(Self {
            http: http_client(Duration::from_secs(15))?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: TOKEN_URL.to_string(),
            api_url: API_URL.to_string(),
        })
    }

    pub fn with_endpoints(mut self, token_url: &str, api_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, CalendarError> {
        let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) else {
            return Err(CalendarError::NotConnected);
        };
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", id.as_str()),
                ("client_secret", secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CalendarError::Provider(format!("token refresh HTTP {}: {}", status, body)));
        }
        let token: TokenResponse = resp.json().await?;
        Ok(token.access_token)
    }

    pub async fn create_event(
        &self,
        access_token: &str,
        event: &NewEvent,
    ) -> Result<RemoteEvent, CalendarError> {
        let body = json!({
            "summary": event.title,
            "description": format!("{} event", event.kind),
            "start": { "dateTime": event.start.to_rfc3339() },
            "end": { "dateTime": event.end.to_rfc3339() },
        });
        let resp = self
            .http
            .post(format!("{}/events", self.api_url))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CalendarError::Provider(format!("create event HTTP {}: {}", status, body)));
        }
        let created: EventResource = resp.json().await?;
        Ok(created.into())
    }

    pub async fn list_events(
        &self,
        access_token: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>, CalendarError> {
        let resp = self
            .http
            .get(format!("{}/events", self.api_url))
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", from.to_rfc3339()),
                ("timeMax", to.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CalendarError::Provider(format!("list events HTTP {}: {}", status, body)));
        }
        let list: EventList = resp.json().await?;
        Ok(list.items.into_iter().map(RemoteEvent::from).collect())
    }

    /// Mirrors `event` to the provider. Never fails.
    pub async fn mirror_event(&self, refresh_token: Option<&str>, event: &NewEvent) -> MirrorOutcome {
        let Some(refresh_token) = refresh_token else {
            debug!("calendar not connected, using template link");
            return MirrorOutcome::Fallback {
                link: fallback_link(event),
            };
        };
        let attempt = async {
            let access = self.refresh_access_token(refresh_token).await?;
            self.create_event(&access, event).await
        };
        match attempt.await {
            Ok(remote) => {
                info!(external = %remote.id, "event mirrored to calendar");
                let link = remote.link.unwrap_or_else(|| fallback_link(event));
                MirrorOutcome::Synced {
                    external_id: remote.id,
                    link,
                }
            }
            Err(err) => {
                warn!("calendar mirror failed, using template link: {}", err);
                MirrorOutcome::Fallback {
                    link: fallback_link(event),
                }
            }
        }
    }
}

pub fn connect(conn: &Connection, user_id: &str, refresh_token: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO calendar_connections(user_id, refresh_token) VALUES (?1,?2)
         ON CONFLICT(user_id) DO UPDATE SET refresh_token=excluded.refresh_token,
             connected_at=datetime('now')",
        params![user_id, refresh_token.trim()],
    )?;
    Ok(())
}

pub fn disconnect(conn: &Connection, user_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM calendar_connections WHERE user_id=?1",
        params![user_id],
    )?;
    Ok(())
}

pub fn refresh_token_for(conn: &Connection, user_id: &str) -> Result<Option<String>> {
    let v = conn
        .query_row(
            "SELECT refresh_token FROM calendar_connections WHERE user_id=?1",
            params![user_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}
