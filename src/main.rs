// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use duocash::backend::LocalBackend;
use duocash::commands::{self, Env};
use duocash::config::Config;
use duocash::{cli, db};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DUOCASH_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let conn = db::open_or_init()?;
    let config = Config::load(&conn)?;
    let env = Env::new(LocalBackend::new(conn), config);

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("auth", sub)) => commands::auth::handle(&env, sub).await?,
        Some(("tx", sub)) => commands::transactions::handle(&env, sub).await?,
        Some(("goal", sub)) => commands::goals::handle(&env, sub).await?,
        Some(("task", sub)) => commands::tasks::handle(&env, sub).await?,
        Some(("event", sub)) => commands::events::handle(&env, sub).await?,
        Some(("calendar", sub)) => commands::calendar::handle(&env, sub).await?,
        Some(("invest", sub)) => commands::portfolio::handle(&env, sub).await?,
        Some(("chat", sub)) => commands::chat::handle(&env, sub).await?,
        Some(("watch", sub)) => commands::chat::watch(&env, sub).await?,
        Some(("invite", sub)) => commands::invite::handle(&env, sub).await?,
        Some(("onboard", sub)) => commands::onboard::handle(&env, sub).await?,
        Some(("billing", sub)) => commands::billing::handle(&env, sub).await?,
        Some(("export", sub)) => commands::exporter::handle(&env, sub).await?,
        Some(("config", sub)) => commands::config::handle(&env, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
