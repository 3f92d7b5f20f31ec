// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::ShopError;
use crate::models::Product;
use crate::utils::{
    Settings, decimal_column, digits_only, format_phone, maybe_print_json, non_blank, parse_decimal,
    pretty_table, require_min_chars,
};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub quantity: i64,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
}

impl ProductInput {
    pub fn normalized(&self) -> Result<ProductInput> {
        require_min_chars("name", &self.name, 3)?;
        if self.quantity < 0 {
            return Err(ShopError::validation("quantity", "cannot be negative").into());
        }
        if self.cost_price.is_sign_negative() {
            return Err(ShopError::validation("cost_price", "cannot be negative").into());
        }
        if self.selling_price.is_sign_negative() {
            return Err(ShopError::validation("selling_price", "cannot be negative").into());
        }
        Ok(ProductInput {
            name: self.name.trim().to_string(),
            quantity: self.quantity,
            cost_price: self.cost_price,
            selling_price: self.selling_price,
            supplier_name: non_blank(self.supplier_name.as_ref()),
            supplier_phone: non_blank(self.supplier_phone.as_ref())
                .map(|p| digits_only(&p))
                .filter(|p| !p.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("update", sub)) => update(conn, sub)?,
        Some(("adjust", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let delta = *sub.get_one::<i64>("delta").unwrap();
            let p = adjust_stock(conn, id, delta)?;
            println!("'{}' now has {} in stock", p.name, p.quantity);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            delete_product(conn, id)?;
            println!("Removed product {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let input = ProductInput {
        name: sub.get_one::<String>("name").unwrap().to_string(),
        quantity: *sub.get_one::<i64>("quantity").unwrap_or(&0),
        cost_price: parse_decimal(sub.get_one::<String>("cost").unwrap())?,
        selling_price: parse_decimal(sub.get_one::<String>("price").unwrap())?,
        supplier_name: sub.get_one::<String>("supplier").cloned(),
        supplier_phone: sub.get_one::<String>("supplier-phone").cloned(),
    };
    let id = add_product(conn, &input)?;
    println!("Added product #{} '{}'", id, input.name.trim());
    Ok(())
}

fn stock_flag(p: &Product, threshold: i64) -> &'static str {
    if p.is_out_of_stock() {
        "OUT"
    } else if p.is_low_stock(threshold) {
        "LOW"
    } else {
        ""
    }
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let query = sub.get_one::<String>("query").map(|s| s.as_str());
    let mut data = list_products(conn, query)?;
    if sub.get_flag("low") {
        data.retain(|p| p.is_low_stock(settings.low_stock_threshold));
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|p| {
                vec![
                    p.id.to_string(),
                    p.name.clone(),
                    p.quantity.to_string(),
                    stock_flag(p, settings.low_stock_threshold).to_string(),
                    settings.money(&p.cost_price),
                    settings.money(&p.selling_price),
                    p.supplier_name.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Name", "Qty", "Stock", "Cost", "Price", "Supplier"],
                rows
            )
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let p = get_product(conn, *sub.get_one::<i64>("id").unwrap())?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &p)? {
        let rows = vec![
            vec!["ID".into(), p.id.to_string()],
            vec!["Name".into(), p.name.clone()],
            vec![
                "Quantity".into(),
                format!(
                    "{} {}",
                    p.quantity,
                    stock_flag(&p, settings.low_stock_threshold)
                )
                .trim_end()
                .to_string(),
            ],
            vec!["Cost".into(), settings.money(&p.cost_price)],
            vec!["Price".into(), settings.money(&p.selling_price)],
            vec![
                "Supplier".into(),
                p.supplier_name.clone().unwrap_or_default(),
            ],
            vec![
                "Supplier phone".into(),
                p.supplier_phone
                    .as_deref()
                    .map(format_phone)
                    .unwrap_or_default(),
            ],
            vec!["Created".into(), p.created_at.clone()],
        ];
        println!("{}", pretty_table(&["Field", "Value"], rows));
    }
    Ok(())
}

fn update(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let patch = ProductPatch {
        name: sub.get_one::<String>("name").cloned(),
        quantity: sub.get_one::<i64>("quantity").copied(),
        cost_price: sub
            .get_one::<String>("cost")
            .map(|s| parse_decimal(s))
            .transpose()?,
        selling_price: sub
            .get_one::<String>("price")
            .map(|s| parse_decimal(s))
            .transpose()?,
        supplier_name: sub.get_one::<String>("supplier").cloned(),
        supplier_phone: sub.get_one::<String>("supplier-phone").cloned(),
    };
    let p = update_product(conn, id, &patch)?;
    println!("Updated product #{} '{}'", p.id, p.name);
    Ok(())
}

fn product_from_row(r: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: r.get(0)?,
        name: r.get(1)?,
        quantity: r.get(2)?,
        cost_price: decimal_column(r, 3)?,
        selling_price: decimal_column(r, 4)?,
        supplier_name: r.get(5)?,
        supplier_phone: r.get(6)?,
        created_at: r.get(7)?,
    })
}

const SELECT_PRODUCT: &str = "SELECT id, name, quantity, cost_price, selling_price, supplier_name, supplier_phone, created_at FROM products";

pub fn add_product(conn: &Connection, input: &ProductInput) -> Result<i64> {
    let p = input.normalized()?;
    conn.execute(
        "INSERT INTO products(name, quantity, cost_price, selling_price, supplier_name, supplier_phone)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            p.name,
            p.quantity,
            p.cost_price.to_string(),
            p.selling_price.to_string(),
            p.supplier_name,
            p.supplier_phone
        ],
    )
    .context("Failed to save product")?;
    let id = conn.last_insert_rowid();
    info!(product_id = id, "product added");
    Ok(id)
}

pub fn get_product(conn: &Connection, id: i64) -> Result<Product> {
    conn.query_row(
        &format!("{} WHERE id=?1", SELECT_PRODUCT),
        params![id],
        product_from_row,
    )
    .optional()?
    .ok_or_else(|| ShopError::not_found("product", id).into())
}

pub fn matches_query(p: &Product, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    q.is_empty()
        || p.name.to_lowercase().contains(&q)
        || p
            .supplier_name
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(&q))
}

pub fn list_products(conn: &Connection, query: Option<&str>) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY created_at DESC, id DESC",
        SELECT_PRODUCT
    ))?;
    let rows = stmt.query_map([], product_from_row)?;
    let mut data = Vec::new();
    for row in rows {
        let p = row?;
        if query.is_none_or(|q| matches_query(&p, q)) {
            data.push(p);
        }
    }
    Ok(data)
}

pub fn low_stock(conn: &Connection, threshold: i64) -> Result<Vec<Product>> {
    let mut data = list_products(conn, None)?;
    data.retain(|p| p.is_low_stock(threshold));
    data.sort_by_key(|p| (p.quantity, p.id));
    Ok(data)
}

pub fn update_product(conn: &Connection, id: i64, patch: &ProductPatch) -> Result<Product> {
    let current = get_product(conn, id)?;
    let merged = ProductInput {
        name: patch.name.clone().unwrap_or(current.name),
        quantity: patch.quantity.unwrap_or(current.quantity),
        cost_price: patch.cost_price.unwrap_or(current.cost_price),
        selling_price: patch.selling_price.unwrap_or(current.selling_price),
        supplier_name: patch.supplier_name.clone().or(current.supplier_name),
        supplier_phone: patch.supplier_phone.clone().or(current.supplier_phone),
    }
    .normalized()?;
    conn.execute(
        "UPDATE products SET name=?1, quantity=?2, cost_price=?3, selling_price=?4,
         supplier_name=?5, supplier_phone=?6 WHERE id=?7",
        params![
            merged.name,
            merged.quantity,
            merged.cost_price.to_string(),
            merged.selling_price.to_string(),
            merged.supplier_name,
            merged.supplier_phone,
            id
        ],
    )
    .context("Failed to update product")?;
    info!(product_id = id, "product updated");
    get_product(conn, id)
}

pub fn adjust_stock(conn: &Connection, id: i64, delta: i64) -> Result<Product> {
    let current = get_product(conn, id)?;
    let next = current.quantity.checked_add(delta).ok_or_else(|| {
        ShopError::validation("quantity", format!("adjustment {} is out of range", delta))
    })?;
    if next < 0 {
        return Err(ShopError::validation(
            "quantity",
            format!(
                "only {} of '{}' in stock, cannot remove {}",
                current.quantity,
                current.name,
                delta.unsigned_abs()
            ),
        )
        .into());
    }
    conn.execute(
        "UPDATE products SET quantity=?1 WHERE id=?2",
        params![next, id],
    )?;
    let threshold = Settings::load(conn)?.low_stock_threshold;
    if next <= threshold {
        warn!(product_id = id, quantity = next, "product is low on stock");
    }
    get_product(conn, id)
}

pub fn delete_product(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("DELETE FROM products WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(ShopError::not_found("product", id).into());
    }
    info!(product_id = id, "product removed");
    Ok(())
}
