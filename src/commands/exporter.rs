// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::clients::list_clients;
use crate::commands::products::list_products;
use crate::commands::transactions::{TxFilter, list_transactions};
use crate::error::ShopError;
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use tracing::info;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let Some((what, sub)) = m.subcommand() else {
        return Ok(());
    };
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();
    let n = match what {
        "transactions" => {
            let mut rows = list_transactions(conn, &TxFilter::default())?;
            rows.reverse();
            write_records(&rows, &fmt, Path::new(out))?
        }
        "clients" => write_records(&list_clients(conn, None)?, &fmt, Path::new(out))?,
        "products" => write_records(&list_products(conn, None)?, &fmt, Path::new(out))?,
        _ => return Ok(()),
    };
    info!(what, count = n, path = %out, "export written");
    println!("Exported {} {} to {}", n, what, out);
    Ok(())
}

/// Write records as CSV (header from field names) or pretty JSON. The format
/// is checked before the file is created.
pub fn write_records<T: Serialize>(rows: &[T], fmt: &str, out: &Path) -> Result<usize> {
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)
                .with_context(|| format!("Create {}", out.display()))?;
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(rows)?)
                .with_context(|| format!("Write {}", out.display()))?;
        }
        other => {
            return Err(ShopError::validation(
                "format",
                format!("unknown format '{}' (use csv|json)", other),
            )
            .into());
        }
    }
    Ok(rows.len())
}
