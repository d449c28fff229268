// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Collection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("row encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("{collection} row '{id}' not found")]
    NotFound { collection: Collection, id: String },
    #[error("{0}")]
    Forbidden(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("{collection} feed lagged, {skipped} events lost")]
    Lagged { collection: Collection, skipped: u64 },
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("undecodable {collection} row: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} event without a row payload")]
    MissingPayload(&'static str),
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion endpoint error: {0}")]
    Api(String),
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
    #[error("completion timed out after {0}s")]
    Timeout(u64),
    #[error("missing API key")]
    MissingApiKey,
    #[error("tool '{tool}' is missing required argument '{argument}'")]
    MissingArgument { tool: String, argument: String },
    #[error("tool '{tool}' argument '{argument}' is invalid: {reason}")]
    InvalidArgument {
        tool: String,
        argument: String,
        reason: String,
    },
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(String),
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum InviteError {
    #[error("invite not found")]
    NotFound,
    #[error("invite expired")]
    Expired,
    #[error("invite already used")]
    AlreadyUsed,
    #[error("couple already has two members")]
    CoupleFull,
    #[error("already a member of this couple")]
    AlreadyMember,
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email already registered")]
    AlreadyRegistered,
    #[error("invalid email '{0}'")]
    InvalidEmail(String),
    #[error("not signed in")]
    NoSession,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("calendar provider error: {0}")]
    Provider(String),
    #[error("calendar is not connected")]
    NotConnected,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payments provider error: {0}")]
    Provider(String),
    #[error("invalid webhook signature: {0}")]
    Signature(String),
    #[error("invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}
