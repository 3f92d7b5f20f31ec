// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::clients::find_client;
use crate::commands::transactions::{TxInput, add_transaction};
use crate::error::ShopError;
use crate::ledger::order_total;
use crate::models::{OrderItem, OrderStatus, Owner, ServiceOrder, TxKind, order_code};
use crate::utils::{
    MAX_AMOUNT, Settings, decimal_column, fmt_date_br, format_cpf, format_phone, maybe_print_json,
    non_blank, parse_date, parse_decimal, pretty_table, require_amount_cap, require_min_chars,
    today,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct OrderInput {
    pub client_id: i64,
    pub equipment: String,
    pub problem_description: Option<String>,
    pub notes: Option<String>,
    pub entry_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub equipment: Option<String>,
    pub problem_description: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ItemInput {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl ItemInput {
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(ShopError::validation("description", "is required").into());
        }
        if self.quantity <= 0 {
            return Err(ShopError::validation("quantity", "must be at least 1").into());
        }
        if self.unit_price.is_sign_negative() {
            return Err(ShopError::validation("unit_price", "cannot be negative").into());
        }
        require_amount_cap("unit_price", &self.unit_price)
    }
}

/// An order together with its items and computed total.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub code: String,
    #[serde(flatten)]
    pub order: ServiceOrder,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("update", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let patch = OrderPatch {
                equipment: sub.get_one::<String>("equipment").cloned(),
                problem_description: sub.get_one::<String>("problem").cloned(),
                notes: sub.get_one::<String>("notes").cloned(),
            };
            let o = update_order(conn, id, &patch)?;
            println!("Updated {}", o.code());
        }
        Some(("item", sub)) => item(conn, sub)?,
        Some(("advance", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let o = advance_status(conn, id)?;
            println!("{} is now '{}'", o.code(), o.status);
        }
        Some(("status", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let target: OrderStatus = sub.get_one::<String>("status").unwrap().parse()?;
            let o = set_status(conn, id, target)?;
            println!("{} is now '{}'", o.code(), o.status);
        }
        Some(("post", sub)) => post(conn, sub)?,
        Some(("print", sub)) => print(conn, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            delete_order(conn, id)?;
            println!("Removed {}", order_code(id));
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let input = OrderInput {
        client_id: *sub.get_one::<i64>("client").unwrap(),
        equipment: sub.get_one::<String>("equipment").unwrap().to_string(),
        problem_description: sub.get_one::<String>("problem").cloned(),
        notes: sub.get_one::<String>("notes").cloned(),
        entry_date: match sub.get_one::<String>("date") {
            Some(d) => parse_date(d)?,
            None => today(),
        },
    };
    let id = add_order(conn, &input)?;
    println!("Opened {} for client #{}", order_code(id), input.client_id);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let query = sub.get_one::<String>("query").map(|s| s.as_str());
    let status = sub
        .get_one::<String>("status")
        .map(|s| s.parse::<OrderStatus>())
        .transpose()?;
    let data = list_orders(conn, query, status)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|d| {
                vec![
                    d.code.clone(),
                    fmt_date_br(&d.order.entry_date),
                    d.order.client_name.clone(),
                    d.order.equipment.clone(),
                    d.order.status.to_string(),
                    settings.money(&d.total),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["OS", "Entry", "Client", "Equipment", "Status", "Total"],
                rows
            )
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let d = get_order_detail(conn, *sub.get_one::<i64>("id").unwrap())?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &d)? {
        return Ok(());
    }
    let o = &d.order;
    let header = vec![
        vec!["OS".into(), d.code.clone()],
        vec!["Entry".into(), fmt_date_br(&o.entry_date)],
        vec![
            "Client".into(),
            format!("{} (#{})", o.client_name, o.client_id),
        ],
        vec!["Equipment".into(), o.equipment.clone()],
        vec![
            "Problem".into(),
            o.problem_description.clone().unwrap_or_default(),
        ],
        vec!["Status".into(), o.status.to_string()],
        vec!["Notes".into(), o.notes.clone().unwrap_or_default()],
    ];
    println!("{}", pretty_table(&["Field", "Value"], header));
    let items = d
        .items
        .iter()
        .map(|i| -> Result<Vec<String>> {
            Ok(vec![
                i.id.to_string(),
                i.description.clone(),
                i.quantity.to_string(),
                settings.money(&i.unit_price),
                settings.money(&i.subtotal()?),
            ])
        })
        .collect::<Result<Vec<_>>>()?;
    println!(
        "{}",
        pretty_table(&["Item", "Description", "Qty", "Unit", "Subtotal"], items)
    );
    println!("Total: {}", settings.money(&d.total));
    Ok(())
}

fn item(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let order_id = *sub.get_one::<i64>("order").unwrap();
            let input = ItemInput {
                description: sub.get_one::<String>("description").unwrap().to_string(),
                quantity: *sub.get_one::<i64>("quantity").unwrap_or(&1),
                unit_price: parse_decimal(sub.get_one::<String>("unit-price").unwrap())?,
            };
            let item_id = add_item(conn, order_id, &input)?;
            let total = order_total(&list_items(conn, order_id)?)?;
            println!(
                "Added item #{} to {}; total is now {}",
                item_id,
                order_code(order_id),
                Settings::load(conn)?.money(&total)
            );
        }
        Some(("rm", sub)) => {
            let order_id = *sub.get_one::<i64>("order").unwrap();
            let item_id = *sub.get_one::<i64>("item").unwrap();
            remove_item(conn, order_id, item_id)?;
            println!("Removed item #{} from {}", item_id, order_code(order_id));
        }
        _ => {}
    }
    Ok(())
}

fn post(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let owner: Owner = sub
        .get_one::<String>("owner")
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(Owner::Split);
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => today(),
    };
    let (tx_id, total) = post_to_ledger(conn, id, owner, date)?;
    println!(
        "Posted {} of {} to the ledger as entry #{}",
        Settings::load(conn)?.money(&total),
        order_code(id),
        tx_id
    );
    Ok(())
}

fn print(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let doc = render_printable(conn, id, sub.get_flag("quote"))?;
    match sub.get_one::<String>("out") {
        Some(path) => {
            std::fs::write(path, &doc).with_context(|| format!("Write {}", path))?;
            println!("Wrote {} to {}", order_code(id), path);
        }
        None => print!("{}", doc),
    }
    Ok(())
}

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn order_from_row(r: &Row<'_>) -> rusqlite::Result<ServiceOrder> {
    let status: String = r.get(5)?;
    let entry: String = r.get(7)?;
    Ok(ServiceOrder {
        id: r.get(0)?,
        client_id: r.get(1)?,
        client_name: r.get(2)?,
        equipment: r.get(3)?,
        problem_description: r.get(4)?,
        status: status
            .parse()
            .map_err(|e: ShopError| conversion_err(5, e.to_string()))?,
        notes: r.get(6)?,
        entry_date: NaiveDate::parse_from_str(&entry, "%Y-%m-%d")
            .map_err(|e| conversion_err(7, e.to_string()))?,
    })
}

fn item_from_row(r: &Row<'_>) -> rusqlite::Result<OrderItem> {
    Ok(OrderItem {
        id: r.get(0)?,
        order_id: r.get(1)?,
        description: r.get(2)?,
        quantity: r.get(3)?,
        unit_price: decimal_column(r, 4)?,
    })
}

const SELECT_ORDER: &str = "SELECT id, client_id, client_name, equipment, problem_description, status, notes, entry_date FROM service_orders";

/// The client must exist when the order is opened; its name is copied so
/// the order stays readable if the client is removed later.
pub fn add_order(conn: &Connection, input: &OrderInput) -> Result<i64> {
    require_min_chars("equipment", &input.equipment, 3)?;
    let client = find_client(conn, input.client_id)?.ok_or_else(|| {
        ShopError::validation("client", format!("client {} does not exist", input.client_id))
    })?;
    conn.execute(
        "INSERT INTO service_orders(client_id, client_name, equipment, problem_description, status, notes, entry_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            client.id,
            client.name,
            input.equipment.trim(),
            non_blank(input.problem_description.as_ref()),
            OrderStatus::UnderAnalysis.slug(),
            non_blank(input.notes.as_ref()),
            input.entry_date.to_string()
        ],
    )
    .context("Failed to save service order")?;
    let id = conn.last_insert_rowid();
    info!(order = %order_code(id), client_id = client.id, "service order opened");
    Ok(id)
}

pub fn get_order(conn: &Connection, id: i64) -> Result<ServiceOrder> {
    conn.query_row(
        &format!("{} WHERE id=?1", SELECT_ORDER),
        params![id],
        order_from_row,
    )
    .optional()?
    .ok_or_else(|| ShopError::not_found("service order", order_code(id)).into())
}

pub fn list_items(conn: &Connection, order_id: i64) -> Result<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, order_id, description, quantity, unit_price
         FROM service_order_items WHERE order_id=?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![order_id], item_from_row)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn detail(conn: &Connection, order: ServiceOrder) -> Result<OrderDetail> {
    let items = list_items(conn, order.id)?;
    Ok(OrderDetail {
        code: order.code(),
        total: order_total(&items)?,
        order,
        items,
    })
}

pub fn get_order_detail(conn: &Connection, id: i64) -> Result<OrderDetail> {
    let order = get_order(conn, id)?;
    detail(conn, order)
}

pub fn matches_query(o: &ServiceOrder, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    q.is_empty()
        || o.client_name.to_lowercase().contains(&q)
        || o.equipment.to_lowercase().contains(&q)
        || o.code().to_lowercase().contains(&q)
}

/// Newest entry first.
pub fn list_orders(
    conn: &Connection,
    query: Option<&str>,
    status: Option<OrderStatus>,
) -> Result<Vec<OrderDetail>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY entry_date DESC, id DESC",
        SELECT_ORDER
    ))?;
    let rows = stmt.query_map([], order_from_row)?;
    let mut orders = Vec::new();
    for row in rows {
        let o = row?;
        if status.is_some_and(|s| s != o.status) {
            continue;
        }
        if query.is_none_or(|q| matches_query(&o, q)) {
            orders.push(o);
        }
    }
    orders.into_iter().map(|o| detail(conn, o)).collect()
}

pub fn update_order(conn: &Connection, id: i64, patch: &OrderPatch) -> Result<ServiceOrder> {
    let current = get_order(conn, id)?;
    let equipment = patch.equipment.clone().unwrap_or(current.equipment);
    require_min_chars("equipment", &equipment, 3)?;
    let problem = match &patch.problem_description {
        Some(p) => non_blank(Some(p)),
        None => current.problem_description,
    };
    let notes = match &patch.notes {
        Some(n) => non_blank(Some(n)),
        None => current.notes,
    };
    conn.execute(
        "UPDATE service_orders SET equipment=?1, problem_description=?2, notes=?3 WHERE id=?4",
        params![equipment.trim(), problem, notes, id],
    )
    .context("Failed to update service order")?;
    info!(order = %order_code(id), "service order updated");
    get_order(conn, id)
}

pub fn add_item(conn: &Connection, order_id: i64, input: &ItemInput) -> Result<i64> {
    input.validate()?;
    let current = get_order_detail(conn, order_id)?;
    let new_total = Decimal::from(input.quantity)
        .checked_mul(input.unit_price)
        .and_then(|sub| sub.checked_add(current.total))
        .filter(|t| *t <= Decimal::from(MAX_AMOUNT));
    if new_total.is_none() {
        return Err(ShopError::validation(
            "unit_price",
            format!(
                "{} would push the total of {} above {}",
                input.description.trim(),
                current.code,
                MAX_AMOUNT
            ),
        )
        .into());
    }
    conn.execute(
        "INSERT INTO service_order_items(order_id, description, quantity, unit_price)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            order_id,
            input.description.trim(),
            input.quantity,
            input.unit_price.to_string()
        ],
    )
    .context("Failed to save line item")?;
    let id = conn.last_insert_rowid();
    debug!(order = %order_code(order_id), item_id = id, "line item added");
    Ok(id)
}

pub fn remove_item(conn: &Connection, order_id: i64, item_id: i64) -> Result<()> {
    let n = conn.execute(
        "DELETE FROM service_order_items WHERE id=?1 AND order_id=?2",
        params![item_id, order_id],
    )?;
    if n == 0 {
        return Err(ShopError::not_found(
            "line item",
            format!("{} on {}", item_id, order_code(order_id)),
        )
        .into());
    }
    Ok(())
}

fn write_status(conn: &Connection, id: i64, status: OrderStatus) -> Result<()> {
    conn.execute(
        "UPDATE service_orders SET status=?1 WHERE id=?2",
        params![status.slug(), id],
    )?;
    Ok(())
}

pub fn advance_status(conn: &Connection, id: i64) -> Result<ServiceOrder> {
    let current = get_order(conn, id)?;
    let next = current
        .status
        .next()
        .ok_or_else(|| ShopError::InvalidTransition {
            from: current.status.to_string(),
            to: "(none)".into(),
        })?;
    write_status(conn, id, next)?;
    info!(order = %order_code(id), from = %current.status, to = %next, "status advanced");
    get_order(conn, id)
}

/// Only the current status (a no-op) or the one right after it is accepted.
pub fn set_status(conn: &Connection, id: i64, target: OrderStatus) -> Result<ServiceOrder> {
    let current = get_order(conn, id)?;
    if target == current.status {
        return Ok(current);
    }
    if current.status.next() != Some(target) {
        return Err(ShopError::InvalidTransition {
            from: current.status.to_string(),
            to: target.to_string(),
        }
        .into());
    }
    write_status(conn, id, target)?;
    info!(order = %order_code(id), from = %current.status, to = %target, "status changed");
    get_order(conn, id)
}

/// Copy a delivered order's total into a new income entry. Nothing ties the
/// two records together afterwards besides `order_id`; posting twice records
/// twice.
pub fn post_to_ledger(
    conn: &Connection,
    id: i64,
    owner: Owner,
    date: NaiveDate,
) -> Result<(i64, Decimal)> {
    let d = get_order_detail(conn, id)?;
    if d.order.status != OrderStatus::Delivered {
        return Err(ShopError::NotPostable {
            order: d.code,
            reason: format!("status is '{}', not delivered", d.order.status),
        }
        .into());
    }
    if d.total <= Decimal::ZERO {
        return Err(ShopError::NotPostable {
            order: d.code,
            reason: "total is zero".into(),
        }
        .into());
    }
    let input = TxInput {
        kind: TxKind::Income,
        description: format!("Service order {} - {}", d.code, d.order.equipment),
        amount: d.total,
        owner,
        date,
        client_id: Some(d.order.client_id),
        order_id: Some(id),
    };
    let tx_id = add_transaction(conn, &input)?;
    if find_client(conn, d.order.client_id)?.is_none() {
        // keep the name the order was opened with
        conn.execute(
            "UPDATE transactions SET client_name=?1 WHERE id=?2",
            params![d.order.client_name, tx_id],
        )?;
    }
    info!(order = %d.code, tx_id, total = %d.total, "service order posted to ledger");
    Ok((tx_id, d.total))
}

pub fn posted_count(conn: &Connection, order_id: i64) -> Result<i64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE order_id=?1",
        params![order_id],
        |r| r.get(0),
    )?;
    Ok(n)
}

/// Items and ledger entries posted from the order are handled differently:
/// items go with the order, ledger entries stay.
pub fn delete_order(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM service_order_items WHERE order_id=?1",
        params![id],
    )?;
    let n = conn.execute("DELETE FROM service_orders WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(ShopError::not_found("service order", order_code(id)).into());
    }
    info!(order = %order_code(id), "service order removed");
    Ok(())
}

/// Plain-text document for the counter printer.
pub fn render_printable(conn: &Connection, id: i64, quote: bool) -> Result<String> {
    let settings = Settings::load(conn)?;
    let d = get_order_detail(conn, id)?;
    let o = &d.order;
    let client = find_client(conn, o.client_id)?;
    let title = if quote { "QUOTE" } else { "SERVICE ORDER" };

    let mut out = String::new();
    writeln!(out, "{} {}", title, d.code)?;
    writeln!(out, "Entry date: {}", fmt_date_br(&o.entry_date))?;
    if !quote {
        writeln!(out, "Status: {}", o.status)?;
    }
    writeln!(out)?;
    writeln!(out, "Client: {}", o.client_name)?;
    if let Some(c) = &client {
        writeln!(out, "CPF: {}", format_cpf(&c.cpf))?;
        writeln!(out, "Phone: {}", format_phone(&c.phone))?;
        writeln!(out, "Address: {}", c.address)?;
    }
    writeln!(out)?;
    writeln!(out, "Equipment: {}", o.equipment)?;
    if let Some(p) = &o.problem_description {
        writeln!(out, "Reported problem: {}", p)?;
    }
    writeln!(out)?;

    let rows = d
        .items
        .iter()
        .map(|i| -> Result<Vec<String>> {
            Ok(vec![
                i.description.clone(),
                i.quantity.to_string(),
                settings.money(&i.unit_price),
                settings.money(&i.subtotal()?),
            ])
        })
        .collect::<Result<Vec<_>>>()?;
    writeln!(
        out,
        "{}",
        pretty_table(&["Description", "Qty", "Unit", "Subtotal"], rows)
    )?;
    writeln!(out, "TOTAL: {}", settings.money(&d.total))?;
    if let Some(n) = &o.notes {
        writeln!(out)?;
        writeln!(out, "Notes: {}", n)?;
    }
    writeln!(out)?;
    if quote {
        writeln!(out, "Approved by: ______________________________")?;
    } else {
        writeln!(out, "Client signature: ______________________________")?;
    }
    Ok(out)
}
