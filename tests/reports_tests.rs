// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use shopdesk::commands::clients::{self, ClientInput};
use shopdesk::commands::orders::{self, OrderInput};
use shopdesk::commands::products::{self, ProductInput};
use shopdesk::commands::reports;
use shopdesk::commands::transactions::{self, TxInput};
use shopdesk::ledger::Period;
use shopdesk::models::{OrderStatus, Owner, TxKind};
use shopdesk::error::ShopError;
use shopdesk::{cli, db, utils};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn record(conn: &Connection, kind: TxKind, desc: &str, cents: i64, owner: Owner, date: &str) {
    transactions::add_transaction(
        conn,
        &TxInput {
            kind,
            description: desc.into(),
            amount: Decimal::new(cents, 2),
            owner,
            date: day(date),
            client_id: None,
            order_id: None,
        },
    )
    .unwrap();
}

fn march_ledger(conn: &Connection) {
    record(conn, TxKind::Income, "Screen swap", 40000, Owner::Split, "2025-03-03");
    record(conn, TxKind::Income, "Cable sale", 5000, Owner::Partner, "2025-03-03");
    record(conn, TxKind::Expense, "Parts order", 10000, Owner::Admin, "2025-03-10");
    record(conn, TxKind::Expense, "Split lunch", 3000, Owner::Split, "2025-03-20");
    record(conn, TxKind::Income, "April job", 99900, Owner::Admin, "2025-04-02");
}

#[test]
fn summary_splits_shared_entries() {
    let conn = setup();
    march_ledger(&conn);
    let s = reports::period_summary(&conn, &Period::month("2025-03").unwrap()).unwrap();
    assert_eq!(s.revenue, Decimal::new(45000, 2));
    assert_eq!(s.expenses, Decimal::new(13000, 2));
    assert_eq!(s.profit, Decimal::new(32000, 2));
    assert_eq!(s.income_count, 2);
    // 200 - 100 - 15
    assert_eq!(s.admin_share, Decimal::new(8500, 2));
    // 200 + 50 - 15
    assert_eq!(s.partner_share, Decimal::new(23500, 2));
    assert_eq!(s.admin_share + s.partner_share, s.profit);
}

#[test]
fn empty_period_is_all_zero() {
    let conn = setup();
    march_ledger(&conn);
    let s = reports::period_summary(&conn, &Period::month("2025-01").unwrap()).unwrap();
    assert_eq!(s.revenue, Decimal::ZERO);
    assert_eq!(s.profit, Decimal::ZERO);
    assert_eq!(s.income_count, 0);
}

#[test]
fn period_transactions_are_oldest_first() {
    let conn = setup();
    march_ledger(&conn);
    let txs = reports::period_transactions(
        &conn,
        &Period::between(Some(day("2025-03-03")), Some(day("2025-03-10"))),
    )
    .unwrap();
    let names: Vec<&str> = txs.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(names, ["Screen swap", "Cable sale", "Parts order"]);
}

#[test]
fn financial_report_lists_entries_and_shares() {
    let conn = setup();
    march_ledger(&conn);
    utils::set_setting(&conn, utils::KEY_ADMIN_NAME, "Admin").unwrap();
    utils::set_setting(&conn, utils::KEY_PARTNER_NAME, "Pedro").unwrap();

    let doc = reports::render_financial_report(
        &conn,
        &Period::month("2025-03").unwrap(),
        day("2025-04-05"),
    )
    .unwrap();
    assert!(doc.starts_with("FINANCIAL REPORT"));
    assert!(doc.contains("Period: 01/03/2025 - 31/03/2025"));
    assert!(doc.contains("Generated on: 05/04/2025"));
    assert!(doc.contains("Screen swap"));
    assert!(!doc.contains("April job"));
    assert!(doc.contains("R$ -100.00"));
    assert!(doc.contains("Admin: R$ 85.00"));
    assert!(doc.contains("Pedro: R$ 235.00"));
}

#[test]
fn financial_report_empty_and_open_labels() {
    let conn = setup();
    let doc = reports::render_financial_report(&conn, &Period::all(), day("2025-04-05")).unwrap();
    assert!(doc.contains("Period: All time"));
    assert!(doc.contains("No entries found in this period."));

    let from = Period::between(Some(day("2025-03-01")), None);
    let doc = reports::render_financial_report(&conn, &from, day("2025-04-05")).unwrap();
    assert!(doc.contains("Period: From 01/03/2025"));
    let until = Period::between(None, Some(day("2025-03-31")));
    let doc = reports::render_financial_report(&conn, &until, day("2025-04-05")).unwrap();
    assert!(doc.contains("Period: Until 31/03/2025"));
}

#[test]
fn dashboard_counts_month_and_current_state() {
    let conn = setup();
    march_ledger(&conn);
    let client = clients::add_client(
        &conn,
        &ClientInput {
            name: "Beatriz Lima".into(),
            cpf: "55566677788".into(),
            phone: "21988887777".into(),
            address: "Rua das Flores, 12".into(),
            notes: None,
        },
    )
    .unwrap();
    conn.execute(
        "UPDATE clients SET created_at='2025-03-05 10:00:00' WHERE id=?1",
        [client],
    )
    .unwrap();

    for equipment in ["Notebook", "Tablet", "Console"] {
        orders::add_order(
            &conn,
            &OrderInput {
                client_id: client,
                equipment: equipment.into(),
                problem_description: None,
                notes: None,
                entry_date: day("2025-03-06"),
            },
        )
        .unwrap();
    }
    orders::advance_status(&conn, 3).unwrap();

    for (name, qty) in [("Mouse USB", 2), ("Teclado ABNT2", 40)] {
        products::add_product(
            &conn,
            &ProductInput {
                name: name.into(),
                quantity: qty,
                cost_price: Decimal::new(1000, 2),
                selling_price: Decimal::new(2500, 2),
                supplier_name: None,
                supplier_phone: None,
            },
        )
        .unwrap();
    }

    let d = reports::build_dashboard(&conn, "2025-03").unwrap();
    assert_eq!(d.month, "2025-03");
    assert_eq!(d.summary.revenue, Decimal::new(45000, 2));
    assert_eq!(d.new_clients, 1);
    assert_eq!(d.low_stock, 1);
    assert_eq!(d.open_orders.len(), 4);
    assert_eq!(d.open_orders[0], (OrderStatus::UnderAnalysis, 2));
    assert_eq!(d.open_orders[1], (OrderStatus::AwaitingApproval, 1));

    let feb = reports::build_dashboard(&conn, "2025-02").unwrap();
    assert_eq!(feb.new_clients, 0);
    assert_eq!(feb.summary.income_count, 0);
}

fn run_report(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["shopdesk", "report"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    let (_, report) = matches.subcommand().unwrap();
    reports::handle(conn, report)
}

#[test]
fn daily_report_for_a_month() {
    let conn = setup();
    march_ledger(&conn);
    run_report(&conn, &["daily", "--month", "2025-03", "--json"]).unwrap();

    let points = reports::daily_points(&conn, "2025-03").unwrap();
    let days: Vec<String> = points.iter().map(|p| p.day.to_string()).collect();
    assert_eq!(days, ["2025-03-03", "2025-03-10", "2025-03-20"]);
    assert_eq!(points[0].income, Decimal::new(45000, 2));
    assert_eq!(points[1].balance, Decimal::new(-10000, 2));
    assert!(reports::daily_points(&conn, "2025-05").unwrap().is_empty());
}

#[test]
fn print_rejects_reversed_range() {
    let conn = setup();
    march_ledger(&conn);
    let err = run_report(&conn, &["print", "--from", "2025-03-10", "--to", "2025-03-01"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShopError>(),
        Some(ShopError::Validation { field: "from", .. })
    ));
}

#[test]
fn oversized_stored_amounts_fail_cleanly() {
    let conn = setup();
    for _ in 0..2 {
        conn.execute(
            "INSERT INTO transactions(kind, description, amount, owner, date) VALUES ('income', 'Imported', ?1, 'admin', '2025-03-05')",
            [Decimal::MAX.to_string()],
        )
        .unwrap();
    }
    let month = Period::month("2025-03").unwrap();
    let err = reports::period_summary(&conn, &month).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShopError>(),
        Some(ShopError::Overflow { .. })
    ));
    assert!(reports::render_financial_report(&conn, &month, day("2025-04-01")).is_err());
    assert!(reports::build_dashboard(&conn, "2025-03").is_err());
    assert!(reports::daily_points(&conn, "2025-03").is_err());
}
