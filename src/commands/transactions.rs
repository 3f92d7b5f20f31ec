// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::clients::find_client;
use crate::error::ShopError;
use crate::ledger::Period;
use crate::models::{Owner, Transaction, TxKind};
use crate::utils::{
    Settings, decimal_column, fmt_date_br, maybe_print_json, parse_date, parse_decimal,
    parse_month, pretty_table, require_amount_cap, require_min_chars, today,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct TxInput {
    pub kind: TxKind,
    pub description: String,
    pub amount: Decimal,
    pub owner: Owner,
    pub date: NaiveDate,
    pub client_id: Option<i64>,
    pub order_id: Option<i64>,
}

impl TxInput {
    pub fn validate(&self) -> Result<()> {
        require_min_chars("description", &self.description, 3)?;
        if self.amount <= Decimal::ZERO {
            return Err(ShopError::validation("amount", "must be greater than zero").into());
        }
        require_amount_cap("amount", &self.amount)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TxPatch {
    pub kind: Option<TxKind>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub owner: Option<Owner>,
    pub date: Option<NaiveDate>,
    pub client_id: Option<i64>,
    /// Drop the client reference; wins over `client_id`.
    pub clear_client: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TxFilter {
    pub period: Period,
    pub kind: Option<TxKind>,
    pub owner: Option<Owner>,
    pub client_id: Option<i64>,
    pub limit: Option<usize>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("update", sub)) => update(conn, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            delete_transaction(conn, id)?;
            println!("Removed entry {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let input = TxInput {
        kind: sub.get_one::<String>("kind").unwrap().parse()?,
        description: sub.get_one::<String>("description").unwrap().to_string(),
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        owner: sub
            .get_one::<String>("owner")
            .map(|s| s.parse::<Owner>())
            .transpose()?
            .unwrap_or_default(),
        date: match sub.get_one::<String>("date") {
            Some(d) => parse_date(d)?,
            None => today(),
        },
        client_id: sub.get_one::<i64>("client").copied(),
        order_id: None,
    };
    let id = add_transaction(conn, &input)?;
    let settings = Settings::load(conn)?;
    println!(
        "Recorded {} #{}: {} on {} ({})",
        input.kind,
        id,
        settings.money(&input.amount),
        input.date,
        settings.owner_name(input.owner)
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|t| {
                let signed = match t.kind {
                    TxKind::Income => t.amount,
                    TxKind::Expense => -t.amount,
                };
                vec![
                    t.id.to_string(),
                    fmt_date_br(&t.date),
                    t.kind.to_string(),
                    t.description.clone(),
                    settings.money(&signed),
                    settings.owner_name(t.owner),
                    t.client_name.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Kind", "Description", "Amount", "Owner", "Client"],
                rows
            )
        );
    }
    Ok(())
}

fn update(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let patch = TxPatch {
        kind: sub
            .get_one::<String>("kind")
            .map(|s| s.parse::<TxKind>())
            .transpose()?,
        description: sub.get_one::<String>("description").cloned(),
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s))
            .transpose()?,
        owner: sub
            .get_one::<String>("owner")
            .map(|s| s.parse::<Owner>())
            .transpose()?,
        date: sub
            .get_one::<String>("date")
            .map(|s| parse_date(s))
            .transpose()?,
        client_id: sub.get_one::<i64>("client").copied(),
        clear_client: sub.get_flag("no-client"),
    };
    let t = update_transaction(conn, id, &patch)?;
    println!("Updated entry #{} '{}'", t.id, t.description);
    Ok(())
}

/// Period from `--month` or `--from/--to`; both absent means everything.
pub fn period_from_args(sub: &clap::ArgMatches) -> Result<Period> {
    if let Some(month) = sub.get_one::<String>("month") {
        return Period::month(&parse_month(month)?);
    }
    let from = sub
        .get_one::<String>("from")
        .map(|s| parse_date(s))
        .transpose()?;
    let to = sub
        .get_one::<String>("to")
        .map(|s| parse_date(s))
        .transpose()?;
    Period::checked(from, to)
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<Transaction>> {
    let filter = TxFilter {
        period: period_from_args(sub)?,
        kind: sub
            .get_one::<String>("kind")
            .map(|s| s.parse::<TxKind>())
            .transpose()?,
        owner: sub
            .get_one::<String>("owner")
            .map(|s| s.parse::<Owner>())
            .transpose()?,
        client_id: sub.get_one::<i64>("client").copied(),
        limit: sub.get_one::<usize>("limit").copied(),
    };
    list_transactions(conn, &filter)
}

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn tx_from_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    let kind: String = r.get(1)?;
    let owner: Option<String> = r.get(4)?;
    let date: String = r.get(5)?;
    Ok(Transaction {
        id: r.get(0)?,
        kind: kind
            .parse()
            .map_err(|e: ShopError| conversion_err(1, e.to_string()))?,
        description: r.get(2)?,
        amount: decimal_column(r, 3)?,
        owner: Owner::from_stored(owner.as_deref())
            .map_err(|e| conversion_err(4, e.to_string()))?,
        // stored dates may carry a time part
        date: NaiveDate::parse_from_str(date.get(..10).unwrap_or(&date), "%Y-%m-%d")
            .map_err(|e| conversion_err(5, e.to_string()))?,
        client_id: r.get(6)?,
        client_name: r.get(7)?,
        order_id: r.get(8)?,
    })
}

const SELECT_TX: &str = "SELECT id, kind, description, amount, owner, date, client_id, client_name, order_id FROM transactions";

/// Client name to copy next to the id. A dangling id is kept as-is.
fn client_name_for(conn: &Connection, client_id: Option<i64>) -> Result<Option<String>> {
    let Some(id) = client_id else {
        return Ok(None);
    };
    match find_client(conn, id)? {
        Some(c) => Ok(Some(c.name)),
        None => {
            warn!(client_id = id, "ledger entry references an unknown client");
            Ok(None)
        }
    }
}

pub fn add_transaction(conn: &Connection, input: &TxInput) -> Result<i64> {
    input.validate()?;
    let client_name = client_name_for(conn, input.client_id)?;
    conn.execute(
        "INSERT INTO transactions(kind, description, amount, owner, date, client_id, client_name, order_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            input.kind.as_str(),
            input.description.trim(),
            input.amount.to_string(),
            input.owner.as_str(),
            input.date.to_string(),
            input.client_id,
            client_name,
            input.order_id
        ],
    )
    .context("Failed to save ledger entry")?;
    let id = conn.last_insert_rowid();
    info!(tx_id = id, kind = %input.kind, amount = %input.amount, "ledger entry recorded");
    Ok(id)
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    conn.query_row(&format!("{} WHERE id=?1", SELECT_TX), params![id], tx_from_row)
        .optional()?
        .ok_or_else(|| ShopError::not_found("transaction", id).into())
}

/// Newest first; ties broken by insertion order.
pub fn list_transactions(conn: &Connection, filter: &TxFilter) -> Result<Vec<Transaction>> {
    let mut sql = format!("{} WHERE 1=1", SELECT_TX);
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(from) = filter.period.from {
        sql.push_str(" AND substr(date,1,10) >= ?");
        params_vec.push(from.to_string());
    }
    if let Some(to) = filter.period.to {
        sql.push_str(" AND substr(date,1,10) <= ?");
        params_vec.push(to.to_string());
    }
    if let Some(kind) = filter.kind {
        sql.push_str(" AND kind = ?");
        params_vec.push(kind.as_str().into());
    }
    if let Some(client) = filter.client_id {
        sql.push_str(" AND client_id = ?");
        params_vec.push(client.to_string());
    }
    sql.push_str(" ORDER BY date DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params_vec.iter()), tx_from_row)?;
    let mut data = Vec::new();
    for row in rows {
        let t = row?;
        // owner is filtered here so legacy empty tags count as admin
        if filter.owner.is_none_or(|o| o == t.owner) {
            data.push(t);
        }
        if filter.limit.is_some_and(|l| data.len() >= l) {
            break;
        }
    }
    Ok(data)
}

pub fn update_transaction(conn: &Connection, id: i64, patch: &TxPatch) -> Result<Transaction> {
    let current = get_transaction(conn, id)?;
    let merged = TxInput {
        kind: patch.kind.unwrap_or(current.kind),
        description: patch
            .description
            .clone()
            .unwrap_or(current.description),
        amount: patch.amount.unwrap_or(current.amount),
        owner: patch.owner.unwrap_or(current.owner),
        date: patch.date.unwrap_or(current.date),
        client_id: if patch.clear_client {
            None
        } else {
            patch.client_id.or(current.client_id)
        },
        order_id: current.order_id,
    };
    merged.validate()?;
    let client_name = if patch.clear_client || patch.client_id.is_some() {
        client_name_for(conn, merged.client_id)?
    } else {
        current.client_name
    };
    conn.execute(
        "UPDATE transactions SET kind=?1, description=?2, amount=?3, owner=?4, date=?5,
         client_id=?6, client_name=?7 WHERE id=?8",
        params![
            merged.kind.as_str(),
            merged.description.trim(),
            merged.amount.to_string(),
            merged.owner.as_str(),
            merged.date.to_string(),
            merged.client_id,
            client_name,
            id
        ],
    )
    .context("Failed to update ledger entry")?;
    info!(tx_id = id, "ledger entry updated");
    get_transaction(conn, id)
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(ShopError::not_found("transaction", id).into());
    }
    info!(tx_id = id, "ledger entry removed");
    Ok(())
}
