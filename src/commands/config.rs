// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Env, arg};
use crate::config::{KEYS, env_var_for, is_known_key};
use crate::utils::{get_setting, list_settings, pretty_table, set_setting};
use anyhow::{Result, bail};

fn is_secret(key: &str) -> bool {
    key.ends_with("_key") || key.ends_with("_secret")
}

fn masked(key: &str, value: &str) -> String {
    let len = value.chars().count();
    if is_secret(key) && len > 4 {
        format!("****{}", value.chars().skip(len - 4).collect::<String>())
    } else {
        value.to_string()
    }
}

pub fn handle(env: &Env, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = arg(sub, "key")?;
            if !is_known_key(key) {
                bail!("Unknown key '{}'. Known keys: {}", key, KEYS.join(", "));
            }
            let value = arg(sub, "value")?.trim();
            env.backend.with_conn(|conn| set_setting(conn, key, value))?;
            println!("{} updated", key);
        }
        Some(("get", sub)) => {
            let key = arg(sub, "key")?;
            if !is_known_key(key) {
                bail!("Unknown key '{}'", key);
            }
            match env.backend.with_conn(|conn| get_setting(conn, key))? {
                Some(v) => println!("{}", masked(key, &v)),
                None => println!("(unset; env {} or default applies)", env_var_for(key)),
            }
        }
        Some(("list", _)) => {
            let rows = env
                .backend
                .with_conn(list_settings)?
                .into_iter()
                .filter(|(k, _)| is_known_key(k))
                .map(|(k, v)| {
                    let shown = masked(&k, &v);
                    vec![k, shown]
                })
                .collect();
            println!("{}", pretty_table(&["Key", "Value"], rows));
        }
        _ => {}
    }
    Ok(())
}
