// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

use crate::models::{Assignee, EventKind, Priority, TransactionKind};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn required(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).required(true).help(help)
}

fn optional(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

/// A numeric value. Negative input reaches the validator instead of being
/// read as an unknown flag.
fn number(arg: Arg) -> Arg {
    arg.allow_negative_numbers(true)
}

fn auth_cmd() -> Command {
    Command::new("auth")
        .about("Sign up, sign in and out")
        .subcommand_required(true)
        .subcommand(
            Command::new("signup")
                .about("Create an account (signs in if the email already exists)")
                .arg(required("email", "Email address"))
                .arg(required("password", "Password (min 6 characters)"))
                .arg(optional("name", "Display name").default_value("")),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in")
                .arg(required("email", "Email address"))
                .arg(required("password", "Password")),
        )
        .subcommand(Command::new("logout").about("Sign out"))
        .subcommand(Command::new("whoami").about("Show the signed-in member"))
        .subcommand(
            Command::new("avatar")
                .about("Upload a profile picture")
                .arg(required("file", "Image file (png, jpg, gif or webp)"))
                .arg(optional("member", "Member id (defaults to you)")),
        )
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Shared transactions")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Record a transaction")
                .arg(number(required("amount", "Positive amount")))
                .arg(required("category", "Category"))
                .arg(optional("description", "Description").default_value(""))
                .arg(
                    optional("kind", "Transaction kind")
                        .value_parser(TransactionKind::values().to_vec())
                        .default_value("expense"),
                )
                .arg(optional("date", "Date/time (YYYY-MM-DD[ HH:MM]); defaults to now")),
        )
        .subcommand(json_flags(
            Command::new("list")
                .about("List transactions, newest first")
                .arg(
                    optional("limit", "Maximum rows")
                        .value_parser(clap::value_parser!(usize)),
                ),
        ))
}

fn goal_cmd() -> Command {
    Command::new("goal")
        .about("Savings goals")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Create a goal")
                .arg(required("title", "Goal title"))
                .arg(number(required("target", "Target amount")))
                .arg(required("deadline", "Deadline (YYYY-MM-DD)"))
                .arg(optional("category", "Category").default_value("General")),
        )
        .subcommand(json_flags(Command::new("list").about("List goals")))
        .subcommand(
            Command::new("contribute")
                .about("Move money into a goal (records a matching expense)")
                .arg(required("goal", "Goal id"))
                .arg(number(required("amount", "Amount to contribute"))),
        )
}

fn task_cmd() -> Command {
    Command::new("task")
        .about("Shared tasks")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Create a task")
                .arg(required("title", "Task title"))
                .arg(
                    optional("assignee", "Who does it")
                        .value_parser(Assignee::values().to_vec())
                        .default_value("both"),
                )
                .arg(
                    optional("priority", "Priority")
                        .value_parser(Priority::values().to_vec())
                        .default_value("medium"),
                )
                .arg(optional("deadline", "Deadline (YYYY-MM-DD)"))
                .arg(optional("goal", "Linked goal id"))
                .arg(number(optional("impact", "Financial impact"))),
        )
        .subcommand(json_flags(Command::new("list").about("List tasks")))
        .subcommand(
            Command::new("done")
                .about("Mark a task completed")
                .arg(Arg::new("id").required(true).help("Task id"))
                .arg(
                    Arg::new("undo")
                        .long("undo")
                        .action(ArgAction::SetTrue)
                        .help("Mark as not completed"),
                ),
        )
}

fn event_cmd() -> Command {
    Command::new("event")
        .about("Shared calendar")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Create an event, mirrored to the connected calendar")
                .arg(required("title", "Event title"))
                .arg(required("start", "Start (YYYY-MM-DD HH:MM or RFC 3339)"))
                .arg(optional("end", "End; defaults to one hour after start"))
                .arg(
                    optional("kind", "Event type")
                        .value_parser(EventKind::values().to_vec())
                        .default_value("social"),
                )
                .arg(number(optional("value", "Associated amount")))
                .arg(optional("goal", "Linked goal id"))
                .arg(
                    Arg::new("no-mirror")
                        .long("no-mirror")
                        .action(ArgAction::SetTrue)
                        .help("Do not mirror to the external calendar"),
                ),
        )
        .subcommand(json_flags(Command::new("list").about("List events")))
}

fn calendar_cmd() -> Command {
    Command::new("calendar")
        .about("External calendar connection")
        .subcommand_required(true)
        .subcommand(
            Command::new("connect")
                .about("Store your calendar refresh token")
                .arg(required("refresh-token", "OAuth refresh token")),
        )
        .subcommand(Command::new("disconnect").about("Forget your calendar connection"))
        .subcommand(
            Command::new("upcoming")
                .about("List upcoming events on your external calendar")
                .arg(
                    optional("days", "Days ahead")
                        .value_parser(clap::value_parser!(i64))
                        .default_value("7"),
                ),
        )
}

fn invest_cmd() -> Command {
    Command::new("invest")
        .about("Portfolio")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Record a position")
                .arg(required("symbol", "Ticker symbol"))
                .arg(optional("name", "Display name"))
                .arg(number(required("price", "Price per share")))
                .arg(number(required("shares", "Number of shares")))
                .arg(optional("goal", "Linked goal id"))
                .arg(optional("date", "Purchase date (YYYY-MM-DD); defaults to today")),
        )
        .subcommand(json_flags(Command::new("list").about("List positions")))
}

fn invite_cmd() -> Command {
    Command::new("invite")
        .about("Invite your partner")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Create an invite link")
                .arg(
                    optional("days", "Days until the invite expires")
                        .value_parser(clap::value_parser!(i64)),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show who an invite is from")
                .arg(Arg::new("token").required(true)),
        )
        .subcommand(
            Command::new("accept")
                .about("Join the inviting couple")
                .arg(Arg::new("token").required(true)),
        )
}

fn onboard_cmd() -> Command {
    Command::new("onboard")
        .about("Set up your household (resumable)")
        .subcommand_required(true)
        .subcommand(
            Command::new("set")
                .about("Answer one onboarding question")
                .arg(
                    Arg::new("field")
                        .required(true)
                        .value_parser(crate::wizard::FIELDS.to_vec()),
                )
                .arg(Arg::new("value").required(true)),
        )
        .subcommand(Command::new("status").about("Show saved answers"))
        .subcommand(Command::new("finish").about("Save the household"))
        .subcommand(Command::new("reset").about("Discard saved answers"))
}

fn billing_cmd() -> Command {
    Command::new("billing")
        .about("Subscription checkout")
        .subcommand_required(true)
        .subcommand(
            Command::new("checkout")
                .about("Create a hosted checkout session")
                .arg(optional("couple-name", "Household name").default_value("Our household")),
        )
        .subcommand(
            Command::new("webhook")
                .about("Apply a webhook delivery")
                .arg(required("payload", "Path to the raw JSON payload"))
                .arg(required("signature", "Signature header value")),
        )
}

fn chat_cmd() -> Command {
    Command::new("chat")
        .about("Talk to the assistant")
        .arg(
            Arg::new("message")
                .required(true)
                .num_args(1..)
                .help("What to say"),
        )
        .arg(
            Arg::new("advice")
                .long("advice")
                .action(ArgAction::SetTrue)
                .help("Investment advice mode (no actions are taken)"),
        )
}

pub fn build_cli() -> Command {
    Command::new("duocash")
        .version(crate_version!())
        .about("Shared finances for couples")
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(auth_cmd())
        .subcommand(tx_cmd())
        .subcommand(goal_cmd())
        .subcommand(task_cmd())
        .subcommand(event_cmd())
        .subcommand(calendar_cmd())
        .subcommand(invest_cmd())
        .subcommand(chat_cmd())
        .subcommand(
            Command::new("watch")
                .about("Follow live changes to your household's data")
                .arg(
                    optional("seconds", "Stop after this many seconds")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(invite_cmd())
        .subcommand(onboard_cmd())
        .subcommand(billing_cmd())
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand_required(true)
                .subcommand(
                    Command::new("transactions")
                        .about("Export transactions")
                        .arg(
                            optional("format", "csv or json")
                                .value_parser(["csv", "json"])
                                .default_value("csv"),
                        )
                        .arg(required("out", "Output file")),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Settings")
                .subcommand_required(true)
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("get").arg(Arg::new("key").required(true)))
                .subcommand(Command::new("list")),
        )
}
