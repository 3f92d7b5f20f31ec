// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::ShopError;
use crate::models::Client;
use crate::utils::{
    digits_only, format_cpf, format_phone, maybe_print_json, non_blank, pretty_table,
    require_min_chars,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ClientInput {
    pub name: String,
    pub cpf: String,
    pub phone: String,
    pub address: String,
    pub notes: Option<String>,
}

impl ClientInput {
    /// Check the form rules and return the record as it will be stored:
    /// trimmed text, CPF and phone reduced to digits.
    pub fn normalized(&self) -> Result<ClientInput> {
        require_min_chars("name", &self.name, 3)?;
        let cpf = digits_only(&self.cpf);
        if cpf.len() != 11 {
            return Err(ShopError::validation("cpf", "must have exactly 11 digits").into());
        }
        let phone: String = digits_only(&self.phone).chars().take(11).collect();
        if phone.len() < 10 {
            return Err(ShopError::validation("phone", "must have at least 10 digits").into());
        }
        require_min_chars("address", &self.address, 5)?;
        Ok(ClientInput {
            name: self.name.trim().to_string(),
            cpf,
            phone,
            address: self.address.trim().to_string(),
            notes: non_blank(self.notes.as_ref()),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("update", sub)) => update(conn, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            delete_client(conn, id)?;
            println!("Removed client {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let input = ClientInput {
        name: sub.get_one::<String>("name").unwrap().to_string(),
        cpf: sub.get_one::<String>("cpf").unwrap().to_string(),
        phone: sub.get_one::<String>("phone").unwrap().to_string(),
        address: sub.get_one::<String>("address").unwrap().to_string(),
        notes: sub.get_one::<String>("notes").cloned(),
    };
    let id = add_client(conn, &input)?;
    println!("Added client #{} '{}'", id, input.name.trim());
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let query = sub.get_one::<String>("query").map(|s| s.as_str());
    let data = list_clients(conn, query)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|c| {
                vec![
                    c.id.to_string(),
                    c.name.clone(),
                    format_cpf(&c.cpf),
                    format_phone(&c.phone),
                    c.address.clone(),
                    c.created_at.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Name", "CPF", "Phone", "Address", "Created"], rows)
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let c = get_client(conn, *sub.get_one::<i64>("id").unwrap())?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &c)? {
        let rows = vec![
            vec!["ID".into(), c.id.to_string()],
            vec!["Name".into(), c.name.clone()],
            vec!["CPF".into(), format_cpf(&c.cpf)],
            vec!["Phone".into(), format_phone(&c.phone)],
            vec!["Address".into(), c.address.clone()],
            vec!["Notes".into(), c.notes.clone().unwrap_or_default()],
            vec!["Created".into(), c.created_at.clone()],
        ];
        println!("{}", pretty_table(&["Field", "Value"], rows));
    }
    Ok(())
}

fn update(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let patch = ClientPatch {
        name: sub.get_one::<String>("name").cloned(),
        cpf: sub.get_one::<String>("cpf").cloned(),
        phone: sub.get_one::<String>("phone").cloned(),
        address: sub.get_one::<String>("address").cloned(),
        notes: sub.get_one::<String>("notes").cloned(),
    };
    let c = update_client(conn, id, &patch)?;
    println!("Updated client #{} '{}'", c.id, c.name);
    Ok(())
}

fn client_from_row(r: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: r.get(0)?,
        name: r.get(1)?,
        cpf: r.get(2)?,
        phone: r.get(3)?,
        address: r.get(4)?,
        notes: r.get(5)?,
        created_at: r.get(6)?,
    })
}

const SELECT_CLIENT: &str =
    "SELECT id, name, cpf, phone, address, notes, created_at FROM clients";

pub fn add_client(conn: &Connection, input: &ClientInput) -> Result<i64> {
    let c = input.normalized()?;
    conn.execute(
        "INSERT INTO clients(name, cpf, phone, address, notes) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![c.name, c.cpf, c.phone, c.address, c.notes],
    )
    .context("Failed to save client")?;
    let id = conn.last_insert_rowid();
    info!(client_id = id, "client added");
    Ok(id)
}

pub fn find_client(conn: &Connection, id: i64) -> Result<Option<Client>> {
    let c = conn
        .query_row(
            &format!("{} WHERE id=?1", SELECT_CLIENT),
            params![id],
            client_from_row,
        )
        .optional()?;
    Ok(c)
}

pub fn get_client(conn: &Connection, id: i64) -> Result<Client> {
    find_client(conn, id)?.ok_or_else(|| ShopError::not_found("client", id).into())
}

/// Case-insensitive match on name; digit match on CPF or phone.
pub fn matches_query(c: &Client, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    if c.name.to_lowercase().contains(&q) {
        return true;
    }
    let digits = digits_only(&q);
    !digits.is_empty() && (c.cpf.contains(&digits) || c.phone.contains(&digits))
}

pub fn list_clients(conn: &Connection, query: Option<&str>) -> Result<Vec<Client>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY created_at DESC, id DESC",
        SELECT_CLIENT
    ))?;
    let rows = stmt.query_map([], client_from_row)?;
    let mut data = Vec::new();
    for row in rows {
        let c = row?;
        if query.is_none_or(|q| matches_query(&c, q)) {
            data.push(c);
        }
    }
    Ok(data)
}

pub fn update_client(conn: &Connection, id: i64, patch: &ClientPatch) -> Result<Client> {
    let current = get_client(conn, id)?;
    let merged = ClientInput {
        name: patch.name.clone().unwrap_or(current.name),
        cpf: patch.cpf.clone().unwrap_or(current.cpf),
        phone: patch.phone.clone().unwrap_or(current.phone),
        address: patch.address.clone().unwrap_or(current.address),
        notes: patch.notes.clone().or(current.notes),
    }
    .normalized()?;
    conn.execute(
        "UPDATE clients SET name=?1, cpf=?2, phone=?3, address=?4, notes=?5 WHERE id=?6",
        params![
            merged.name,
            merged.cpf,
            merged.phone,
            merged.address,
            merged.notes,
            id
        ],
    )
    .context("Failed to update client")?;
    info!(client_id = id, "client updated");
    get_client(conn, id)
}

/// Removes only the client row; orders and ledger entries keep their copy of
/// the id and name.
pub fn delete_client(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM clients WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(ShopError::not_found("client", id).into());
    }
    info!(client_id = id, "client removed");
    Ok(())
}

/// Clients registered between the two dates, both inclusive.
pub fn count_created_between(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<i64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM clients WHERE substr(created_at,1,10) BETWEEN ?1 AND ?2",
        params![from.to_string(), to.to_string()],
        |r| r.get(0),
    )?;
    Ok(n)
}
