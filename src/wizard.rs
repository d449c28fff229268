// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Resumable onboarding.
//!
//! The in-progress answers live in a JSON draft file next to the database.
//! A draft written by a different `DRAFT_VERSION` is discarded on load, and
//! the draft is removed once onboarding has been saved.

use crate::error::ValidationError;
use crate::household::{provision_couple, update_couple, update_profile_details};
use crate::models::{MemberDetails, RiskTolerance};
use crate::saga::SagaState;
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DRAFT_VERSION: u32 = 1;
pub const DRAFT_FILE: &str = "onboarding_draft.json";

/// Answer fields in the order the wizard asks for them.
pub const FIELDS: &[&str] = &[
    "couple_name",
    "name",
    "monthly_income",
    "income_day",
    "risk_tolerance",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingAnswers {
    pub couple_name: Option<String>,
    pub name: Option<String>,
    pub monthly_income: Option<Decimal>,
    pub income_day: Option<u32>,
    pub risk_tolerance: Option<RiskTolerance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingDraft {
    pub version: u32,
    pub step: usize,
    pub answers: OnboardingAnswers,
}

impl Default for OnboardingDraft {
    fn default() -> Self {
        Self {
            version: DRAFT_VERSION,
            step: 0,
            answers: OnboardingAnswers::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedOnboarding {
    pub couple_name: String,
    pub details: MemberDetails,
    pub risk_tolerance: RiskTolerance,
}

impl OnboardingDraft {
    /// Records one answer and moves the step pointer past it.
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        let idx = FIELDS
            .iter()
            .position(|f| *f == field)
            .ok_or_else(|| ValidationError::Invalid(format!("unknown field '{}'", field)))?;
        let a = &mut self.answers;
        match field {
            "couple_name" => a.couple_name = Some(non_empty(value, "couple name")?),
            "name" => a.name = Some(non_empty(value, "name")?),
            "monthly_income" => {
                let income = value
                    .parse::<Decimal>()
                    .map_err(|_| ValidationError::InvalidAmount(value.to_string()))?;
                if income < Decimal::ZERO {
                    return Err(ValidationError::NonPositiveAmount(income.to_string()));
                }
                a.monthly_income = Some(income);
            }
            "income_day" => {
                let day = value
                    .parse::<u32>()
                    .ok()
                    .filter(|d| (1..=31).contains(d))
                    .ok_or_else(|| {
                        ValidationError::Invalid(format!("income day '{}' must be 1-31", value))
                    })?;
                a.income_day = Some(day);
            }
            "risk_tolerance" => {
                a.risk_tolerance = Some(value.parse().map_err(ValidationError::Invalid)?);
            }
            _ => return Err(ValidationError::Invalid(format!("unknown field '{}'", field))),
        }
        self.step = self.step.max(idx + 1);
        Ok(())
    }

    pub fn next_field(&self) -> Option<&'static str> {
        FIELDS.get(self.step).copied()
    }

    pub fn validate(&self, email: &str) -> Result<CompletedOnboarding, ValidationError> {
        let a = &self.answers;
        Ok(CompletedOnboarding {
            couple_name: a.couple_name.clone().ok_or(ValidationError::Required("couple name"))?,
            details: MemberDetails {
                name: a.name.clone().ok_or(ValidationError::Required("name"))?,
                email: email.to_string(),
                monthly_income: a
                    .monthly_income
                    .ok_or(ValidationError::Required("monthly income"))?,
                income_day: a.income_day.unwrap_or(1),
            },
            risk_tolerance: a.risk_tolerance.unwrap_or(RiskTolerance::Medium),
        })
    }
}

fn non_empty(value: &str, what: &'static str) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required(what));
    }
    Ok(value.to_string())
}

/// File-backed draft persistence.
#[derive(Debug, Clone)]
pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(DRAFT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<OnboardingDraft>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Read draft {}", self.path.display()))?;
        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(err) => {
                warn!("discarding unreadable onboarding draft: {}", err);
                self.clear()?;
                return Ok(None);
            }
        };
        let version = value.get("version").and_then(|v| v.as_u64());
        if version != Some(u64::from(DRAFT_VERSION)) {
            warn!(?version, expected = DRAFT_VERSION, "discarding onboarding draft from another version");
            self.clear()?;
            return Ok(None);
        }
        match serde_json::from_value(value) {
            Ok(draft) => Ok(Some(draft)),
            Err(err) => {
                warn!("discarding malformed onboarding draft: {}", err);
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn load_or_default(&self) -> Result<OnboardingDraft> {
        Ok(self.load()?.unwrap_or_default())
    }

    pub fn save(&self, draft: &OnboardingDraft) -> Result<()> {
        fs::write(&self.path, serde_json::to_string_pretty(draft)?)
            .with_context(|| format!("Write draft {}", self.path.display()))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Remove draft {}", self.path.display())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    SaveCouple,
    SaveProfile,
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnboardingStep::SaveCouple => f.write_str("save couple"),
            OnboardingStep::SaveProfile => f.write_str("save profile"),
        }
    }
}

/// Writes the couple record, then the member's profile. Both steps can be
/// repeated safely: provisioning returns the existing couple and the updates
/// overwrite with the same values.
#[derive(Debug, Clone)]
pub struct OnboardingSave {
    user_id: String,
    answers: CompletedOnboarding,
    couple_id: Option<String>,
    state: SagaState<OnboardingStep>,
}

impl OnboardingSave {
    pub fn new(user_id: &str, answers: CompletedOnboarding) -> Self {
        Self {
            user_id: user_id.to_string(),
            answers,
            couple_id: None,
            state: SagaState::Pending,
        }
    }

    pub fn state(&self) -> &SagaState<OnboardingStep> {
        &self.state
    }

    pub fn couple_id(&self) -> Option<&str> {
        self.couple_id.as_deref()
    }

    fn next_step(&self) -> Option<OnboardingStep> {
        match &self.state {
            SagaState::Pending => Some(OnboardingStep::SaveCouple),
            SagaState::Committed(OnboardingStep::SaveCouple) => Some(OnboardingStep::SaveProfile),
            SagaState::Committed(OnboardingStep::SaveProfile) | SagaState::Completed => None,
            SagaState::Failed { step, .. } => Some(*step),
        }
    }

    fn apply(&mut self, conn: &mut Connection, step: OnboardingStep) -> Result<()> {
        match step {
            OnboardingStep::SaveCouple => {
                let id = provision_couple(conn, &self.user_id, &self.answers.couple_name)?;
                update_couple(
                    conn,
                    &id,
                    &self.answers.couple_name,
                    self.answers.risk_tolerance,
                )?;
                self.couple_id = Some(id);
            }
            OnboardingStep::SaveProfile => {
                update_profile_details(conn, &self.user_id, &self.answers.details)?;
            }
        }
        Ok(())
    }

    pub fn run(&mut self, conn: &mut Connection) -> &SagaState<OnboardingStep> {
        while let Some(step) = self.next_step() {
            match self.apply(conn, step) {
                Ok(()) => {
                    self.state = match step {
                        OnboardingStep::SaveCouple => SagaState::Committed(step),
                        OnboardingStep::SaveProfile => SagaState::Completed,
                    };
                }
                Err(err) => {
                    warn!(user = %self.user_id, %step, "onboarding step failed: {:#}", err);
                    self.state = SagaState::Failed {
                        step,
                        reason: err.to_string(),
                    };
                    return &self.state;
                }
            }
        }
        &self.state
    }
}

/// Validates the draft, saves it and clears the draft file on success.
pub fn finish(
    conn: &mut Connection,
    drafts: &DraftStore,
    user_id: &str,
    email: &str,
) -> Result<OnboardingSave> {
    let draft = drafts
        .load()?
        .ok_or_else(|| anyhow::anyhow!("No onboarding in progress"))?;
    let answers = draft.validate(email)?;
    let mut save = OnboardingSave::new(user_id, answers);
    save.run(conn);
    if save.state().is_completed() {
        drafts.clear()?;
        info!(user = %user_id, "onboarding completed");
    }
    Ok(save)
}
