// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store::Snapshot;
use crate::utils::fmt_money;
use chrono::{DateTime, Utc};
use std::fmt::Write;

pub const SYSTEM_INSTRUCTION: &str = "You are the shared finance assistant of a couple. \
Be warm, brief and practical. When the user asks to record an expense or income, create a \
savings goal, add a task or schedule an event, call the matching tool instead of describing \
the action. Use the context block for balances and goals; never invent transactions. \
Amounts are positive numbers; use the transaction type to tell income from expense.";

pub const ADVISOR_INSTRUCTION: &str = "You are an investment educator for a couple. \
Explain options in plain language, weigh risk against their goals and stated tolerance, \
cite current market context when search results are available, and never promise returns. \
You cannot change any of their data.";

/// Grounding text for one conversational turn.
pub fn build_context(
    snapshot: &Snapshot,
    recent: usize,
    currency: &str,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Today: {}", now.format("%Y-%m-%d"));
    let _ = writeln!(out, "Current balance: {}", fmt_money(&snapshot.balance(), currency));

    let latest = snapshot.recent_transactions(recent);
    if latest.is_empty() {
        out.push_str("Recent transactions: none\n");
    } else {
        out.push_str("Recent transactions:\n");
        for t in latest {
            let _ = writeln!(
                out,
                "- {} {} {} {}{}",
                t.date.format("%Y-%m-%d"),
                t.kind,
                t.category,
                fmt_money(&t.amount, currency),
                if t.description.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", t.description)
                }
            );
        }
    }

    let mut goals = snapshot.in_progress_goals().peekable();
    if goals.peek().is_none() {
        out.push_str("Goals in progress: none\n");
    } else {
        out.push_str("Goals in progress:\n");
        for g in goals {
            let _ = writeln!(
                out,
                "- {}: {} of {}",
                g.title,
                fmt_money(&g.current_amount, currency),
                fmt_money(&g.target_amount, currency)
            );
        }
    }
    out
}

/// Context for the advisory chat: holdings only.
pub fn build_portfolio_context(snapshot: &Snapshot, currency: &str) -> String {
    if snapshot.investments.is_empty() {
        return "Portfolio: empty\n".to_string();
    }
    let mut out = String::from("Portfolio:\n");
    for i in &snapshot.investments {
        let _ = writeln!(
            out,
            "- {} ({}): {} shares, invested {}",
            i.symbol,
            i.name,
            i.shares,
            fmt_money(&i.total_invested, currency)
        );
    }
    out
}
