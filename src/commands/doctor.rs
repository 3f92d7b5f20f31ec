// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::orders::{list_orders, posted_count};
use crate::commands::products::low_stock;
use crate::models::{OrderStatus, order_code};
use crate::utils::{Settings, pretty_table};
use anyhow::Result;
use rust_decimal::Decimal;
use rusqlite::Connection;

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = collect_issues(conn)?;
    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Report only. Removing a client leaves its orders and ledger entries in
/// place, so dangling references are listed, not repaired.
pub fn collect_issues(conn: &Connection) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();

    // 1) Orders pointing at removed clients
    let mut stmt = conn.prepare(
        "SELECT o.id, o.client_id, o.client_name FROM service_orders o
         WHERE NOT EXISTS (SELECT 1 FROM clients c WHERE c.id=o.client_id)
         ORDER BY o.id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let client_id: i64 = r.get(1)?;
        let name: String = r.get(2)?;
        rows.push(vec![
            "order_client_missing".into(),
            format!("{} -> client #{} ({})", order_code(id), client_id, name),
        ]);
    }

    // 2) Ledger entries pointing at removed clients
    let mut stmt2 = conn.prepare(
        "SELECT t.id, t.client_id, IFNULL(t.client_name,'') FROM transactions t
         WHERE t.client_id IS NOT NULL
           AND NOT EXISTS (SELECT 1 FROM clients c WHERE c.id=t.client_id)
         ORDER BY t.id",
    )?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let id: i64 = r.get(0)?;
        let client_id: i64 = r.get(1)?;
        let name: String = r.get(2)?;
        rows.push(vec![
            "tx_client_missing".into(),
            format!("entry #{} -> client #{} ({})", id, client_id, name),
        ]);
    }

    // 3) Delivered orders with a total that never reached the ledger
    for d in list_orders(conn, None, Some(OrderStatus::Delivered))? {
        if d.total > Decimal::ZERO && posted_count(conn, d.order.id)? == 0 {
            rows.push(vec!["order_not_posted".into(), format!("{} ({})", d.code, d.total)]);
        }
    }

    // 4) Stock
    let threshold = Settings::load(conn)?.low_stock_threshold;
    for p in low_stock(conn, threshold)? {
        rows.push(vec![
            "low_stock".into(),
            format!("#{} {} (qty {})", p.id, p.name, p.quantity),
        ]);
    }

    Ok(rows)
}
