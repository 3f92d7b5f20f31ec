// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{SETTING_DEFAULTS, get_setting, pretty_table, set_setting};
use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", _)) => {
            let mut rows = Vec::new();
            for (key, default) in SETTING_DEFAULTS {
                rows.push(vec![key.to_string(), get_setting(conn, key)?, default.to_string()]);
            }
            println!("{}", pretty_table(&["Key", "Value", "Default"], rows));
        }
        Some(("get", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            println!("{}", get_setting(conn, key)?);
        }
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            let value = sub.get_one::<String>("value").unwrap();
            set_setting(conn, key, value)?;
            info!(%key, "setting changed");
            println!("{} = {}", key, value.trim());
        }
        _ => {}
    }
    Ok(())
}
