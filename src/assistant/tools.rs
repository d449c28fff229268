// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The closed set of tools the assistant may call, their schemas, argument
//! normalisation and the fixed confirmation sentences.

use super::{ToolDeclaration, ToolInvocation};
use crate::error::AssistantError;
use crate::models::{
    Assignee, EventKind, NewEvent, NewGoal, NewTask, NewTransaction, Priority, TransactionKind,
};
use crate::utils::{fmt_money, parse_date, parse_datetime};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use std::str::FromStr;

pub const CREATE_TRANSACTION: &str = "createTransaction";
pub const CREATE_GOAL: &str = "createGoal";
pub const CREATE_TASK: &str = "createTask";
pub const CREATE_EVENT: &str = "createEvent";
pub const GET_INVESTMENT_ADVICE: &str = "getInvestmentAdvice";

pub const GOAL_DEFAULT_HORIZON_DAYS: i64 = 30;

pub fn declarations() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration {
            name: CREATE_TRANSACTION.into(),
            description: "Record an income or expense for the couple.".into(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "amount": { "type": "NUMBER", "description": "Positive amount" },
                    "category": { "type": "STRING", "description": "Category, e.g. Food, Rent" },
                    "description": { "type": "STRING" },
                    "type": { "type": "STRING", "enum": TransactionKind::values() },
                    "date": { "type": "STRING", "description": "ISO 8601 date or date-time" }
                },
                "required": ["amount", "category", "type"]
            }),
        },
        ToolDeclaration {
            name: CREATE_GOAL.into(),
            description: "Create a savings goal.".into(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "targetAmount": { "type": "NUMBER" },
                    "deadline": { "type": "STRING", "description": "YYYY-MM-DD" },
                    "category": { "type": "STRING" }
                },
                "required": ["title", "targetAmount"]
            }),
        },
        ToolDeclaration {
            name: CREATE_TASK.into(),
            description: "Create a household task.".into(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "assignee": { "type": "STRING", "enum": Assignee::values() },
                    "priority": { "type": "STRING", "enum": Priority::values() },
                    "deadline": { "type": "STRING", "description": "YYYY-MM-DD" },
                    "financialImpact": { "type": "NUMBER" }
                },
                "required": ["title"]
            }),
        },
        ToolDeclaration {
            name: CREATE_EVENT.into(),
            description: "Add an event to the shared calendar.".into(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "start": { "type": "STRING", "description": "ISO 8601 date-time" },
                    "end": { "type": "STRING", "description": "ISO 8601 date-time" },
                    "type": { "type": "STRING", "enum": EventKind::values() },
                    "value": { "type": "NUMBER" }
                },
                "required": ["title", "start"]
            }),
        },
        ToolDeclaration {
            name: GET_INVESTMENT_ADVICE.into(),
            description: "Answer an investment question with current market context.".into(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "question": { "type": "STRING" }
                },
                "required": ["question"]
            }),
        },
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    Transaction(NewTransaction),
    Goal(NewGoal),
    Task(NewTask),
    Event(NewEvent),
    Advice { question: String },
}

struct Args<'a> {
    tool: &'a str,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    fn new(call: &'a ToolInvocation) -> Self {
        Self {
            tool: &call.name,
            map: call.args.as_object(),
        }
    }

    fn missing(&self, argument: &str) -> AssistantError {
        AssistantError::MissingArgument {
            tool: self.tool.to_string(),
            argument: argument.to_string(),
        }
    }

    fn invalid(&self, argument: &str, reason: impl Into<String>) -> AssistantError {
        AssistantError::InvalidArgument {
            tool: self.tool.to_string(),
            argument: argument.to_string(),
            reason: reason.into(),
        }
    }

    fn raw(&self, name: &str) -> Option<&'a Value> {
        self.map
            .and_then(|m| m.get(name))
            .filter(|v| !v.is_null())
            .filter(|v| !matches!(v, Value::String(s) if s.trim().is_empty()))
    }

    fn text(&self, name: &str) -> Result<Option<String>, AssistantError> {
        match self.raw(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(other) => Err(self.invalid(name, format!("expected text, got {}", other))),
        }
    }

    fn required_text(&self, name: &str) -> Result<String, AssistantError> {
        self.text(name)?.ok_or_else(|| self.missing(name))
    }

    fn decimal(&self, name: &str) -> Result<Option<Decimal>, AssistantError> {
        let parsed = match self.raw(name) {
            None => return Ok(None),
            Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string())),
            Some(Value::String(s)) => Decimal::from_str(s.trim()),
            Some(other) => return Err(self.invalid(name, format!("expected number, got {}", other))),
        };
        parsed
            .map(Some)
            .map_err(|e| self.invalid(name, e.to_string()))
    }

    fn positive(&self, name: &str) -> Result<Decimal, AssistantError> {
        let v = self.decimal(name)?.ok_or_else(|| self.missing(name))?;
        if v <= Decimal::ZERO {
            return Err(self.invalid(name, "must be positive"));
        }
        Ok(v)
    }

    fn choice<T: FromStr<Err = String>>(&self, name: &str) -> Result<Option<T>, AssistantError> {
        self.text(name)?
            .map(|s| s.to_lowercase().parse::<T>().map_err(|e| self.invalid(name, e)))
            .transpose()
    }

    fn datetime(&self, name: &str) -> Result<Option<DateTime<Utc>>, AssistantError> {
        self.text(name)?
            .map(|s| parse_datetime(&s).map_err(|e| self.invalid(name, e.to_string())))
            .transpose()
    }
}

/// Validates an invocation and fills the documented defaults.
pub fn parse_invocation(
    call: &ToolInvocation,
    now: DateTime<Utc>,
) -> Result<ToolAction, AssistantError> {
    let args = Args::new(call);
    match call.name.as_str() {
        CREATE_TRANSACTION => Ok(ToolAction::Transaction(NewTransaction {
            id: None,
            amount: args.positive("amount")?,
            category: args.required_text("category")?,
            description: args.text("description")?.unwrap_or_default(),
            kind: args
                .choice::<TransactionKind>("type")?
                .ok_or_else(|| args.missing("type"))?,
            date: args.datetime("date")?.unwrap_or(now),
        })),
        CREATE_GOAL => {
            let deadline = match args.text("deadline")? {
                Some(s) => parse_date(&s)
                    .or_else(|_| parse_datetime(&s).map(|dt| dt.date_naive()))
                    .map_err(|e| args.invalid("deadline", e.to_string()))?,
                None => (now + Duration::days(GOAL_DEFAULT_HORIZON_DAYS)).date_naive(),
            };
            Ok(ToolAction::Goal(NewGoal {
                title: args.required_text("title")?,
                target_amount: args.positive("targetAmount")?,
                deadline,
                category: args.text("category")?.unwrap_or_else(|| "General".into()),
            }))
        }
        CREATE_TASK => Ok(ToolAction::Task(NewTask {
            title: args.required_text("title")?,
            assignee: args.choice("assignee")?.unwrap_or(Assignee::Both),
            priority: args.choice("priority")?.unwrap_or(Priority::Medium),
            deadline: args
                .text("deadline")?
                .map(|s| parse_date(&s).map_err(|e| args.invalid("deadline", e.to_string())))
                .transpose()?,
            goal_id: None,
            financial_impact: args.decimal("financialImpact")?,
        })),
        CREATE_EVENT => {
            let start = args.datetime("start")?.ok_or_else(|| args.missing("start"))?;
            let end = args.datetime("end")?.unwrap_or(start + Duration::hours(1));
            if end < start {
                return Err(args.invalid("end", "ends before it starts"));
            }
            Ok(ToolAction::Event(NewEvent {
                title: args.required_text("title")?,
                start,
                end,
                kind: args.choice("type")?.unwrap_or(EventKind::Social),
                value: args.decimal("value")?,
                assignee: None,
                goal_id: None,
            }))
        }
        GET_INVESTMENT_ADVICE => Ok(ToolAction::Advice {
            question: args.required_text("question")?,
        }),
        other => Err(AssistantError::UnknownTool(other.to_string())),
    }
}

/// The sentence appended to the reply once an action was applied.
pub fn confirmation(action: &ToolAction, currency: &str) -> String {
    match action {
        ToolAction::Transaction(t) => format!(
            "Recorded {} of {} in {}.",
            t.kind,
            fmt_money(&t.amount, currency),
            t.category
        ),
        ToolAction::Goal(g) => format!(
            "Created goal \"{}\" with a target of {} by {}.",
            g.title,
            fmt_money(&g.target_amount, currency),
            g.deadline
        ),
        ToolAction::Task(t) => format!(
            "Added task \"{}\" for {} with {} priority.",
            t.title, t.assignee, t.priority
        ),
        ToolAction::Event(e) => format!(
            "Scheduled \"{}\" on {}.",
            e.title,
            e.start.format("%Y-%m-%d %H:%M")
        ),
        ToolAction::Advice { question } => format!("Looked into: {}.", question),
    }
}
