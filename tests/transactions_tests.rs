// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use shopdesk::commands::clients::{self, ClientInput};
use shopdesk::commands::transactions::{self, TxFilter, TxInput, TxPatch};
use shopdesk::ledger::Period;
use shopdesk::models::{Owner, TxKind};
use shopdesk::utils::MAX_AMOUNT;
use shopdesk::{cli, db};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn entry(kind: TxKind, desc: &str, cents: i64, owner: Owner, date: &str) -> TxInput {
    TxInput {
        kind,
        description: desc.into(),
        amount: Decimal::new(cents, 2),
        owner,
        date: day(date),
        client_id: None,
        order_id: None,
    }
}

fn seed(conn: &Connection) {
    for (kind, desc, cents, owner, date) in [
        (TxKind::Income, "Screen swap", 35000, Owner::Split, "2025-02-27"),
        (TxKind::Expense, "Shop rent", 120000, Owner::Admin, "2025-03-01"),
        (TxKind::Income, "Cable sale", 4500, Owner::Partner, "2025-03-02"),
        (TxKind::Income, "Formatting", 10000, Owner::Admin, "2025-03-15"),
        (TxKind::Expense, "Solder", 2000, Owner::Partner, "2025-04-01"),
    ] {
        transactions::add_transaction(conn, &entry(kind, desc, cents, owner, date)).unwrap();
    }
}

fn tx_list(conn: &Connection, args: &[&str]) -> Vec<shopdesk::models::Transaction> {
    let mut argv = vec!["shopdesk", "tx", "list"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    let (_, tx) = matches.subcommand().unwrap();
    let (_, list) = tx.subcommand().unwrap();
    transactions::query_rows(conn, list).unwrap()
}

#[test]
fn list_limit_respected() {
    let conn = setup();
    seed(&conn);
    let rows = tx_list(&conn, &["--limit", "2"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].description, "Solder");
    assert_eq!(rows[1].description, "Formatting");
}

#[test]
fn month_filter_is_inclusive() {
    let conn = setup();
    seed(&conn);
    let rows = tx_list(&conn, &["--month", "2025-03"]);
    let names: Vec<&str> = rows.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(names, ["Formatting", "Cable sale", "Shop rent"]);

    let rows = tx_list(&conn, &["--from", "2025-03-02", "--to", "2025-04-01"]);
    assert_eq!(rows.len(), 3);
}

#[test]
fn reversed_range_is_rejected() {
    let conn = setup();
    let matches = cli::build_cli().get_matches_from([
        "shopdesk", "tx", "list", "--from", "2025-03-10", "--to", "2025-03-01",
    ]);
    let (_, tx) = matches.subcommand().unwrap();
    let (_, list) = tx.subcommand().unwrap();
    assert!(transactions::query_rows(&conn, list).is_err());
}

#[test]
fn kind_and_owner_filters() {
    let conn = setup();
    seed(&conn);
    assert_eq!(tx_list(&conn, &["--kind", "expense"]).len(), 2);
    let partner = tx_list(&conn, &["--owner", "partner"]);
    assert_eq!(partner.len(), 2);
    assert!(partner.iter().all(|t| t.owner == Owner::Partner));
}

#[test]
fn missing_owner_reads_as_admin() {
    let conn = setup();
    conn.execute(
        "INSERT INTO transactions(kind, description, amount, owner, date) VALUES ('income', 'Old sale', '80.00', NULL, '2024-12-10')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO transactions(kind, description, amount, owner, date) VALUES ('income', 'Older sale', '20.00', '', '2024-12-09T14:30:00')",
        [],
    )
    .unwrap();
    let filter = TxFilter {
        owner: Some(Owner::Admin),
        ..TxFilter::default()
    };
    let rows = transactions::list_transactions(&conn, &filter).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].date, day("2024-12-09"));
}

#[test]
fn validation_rules() {
    let conn = setup();
    let zero = entry(TxKind::Income, "Sale", 0, Owner::Admin, "2025-03-01");
    assert!(transactions::add_transaction(&conn, &zero).is_err());
    let negative = entry(TxKind::Expense, "Parts", -100, Owner::Admin, "2025-03-01");
    assert!(transactions::add_transaction(&conn, &negative).is_err());
    let short = entry(TxKind::Income, "ok", 100, Owner::Admin, "2025-03-01");
    assert!(transactions::add_transaction(&conn, &short).is_err());
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn client_name_is_copied_when_known() {
    let conn = setup();
    let client = clients::add_client(
        &conn,
        &ClientInput {
            name: "Ana Souza".into(),
            cpf: "98765432100".into(),
            phone: "1133334444".into(),
            address: "Av. Brasil, 1000".into(),
            notes: None,
        },
    )
    .unwrap();

    let mut known = entry(TxKind::Income, "Repair", 5000, Owner::Admin, "2025-03-01");
    known.client_id = Some(client);
    let id = transactions::add_transaction(&conn, &known).unwrap();
    let t = transactions::get_transaction(&conn, id).unwrap();
    assert_eq!(t.client_name.as_deref(), Some("Ana Souza"));

    let mut dangling = known.clone();
    dangling.client_id = Some(client + 50);
    let id = transactions::add_transaction(&conn, &dangling).unwrap();
    let t = transactions::get_transaction(&conn, id).unwrap();
    assert_eq!(t.client_id, Some(client + 50));
    assert_eq!(t.client_name, None);

    let by_client = transactions::list_transactions(
        &conn,
        &TxFilter {
            client_id: Some(client),
            ..TxFilter::default()
        },
    )
    .unwrap();
    assert_eq!(by_client.len(), 1);
}

#[test]
fn update_revalidates_and_delete_removes() {
    let conn = setup();
    let id = transactions::add_transaction(
        &conn,
        &entry(TxKind::Expense, "Toner", 9000, Owner::Admin, "2025-03-03"),
    )
    .unwrap();

    let bad = TxPatch {
        amount: Some(Decimal::ZERO),
        ..TxPatch::default()
    };
    assert!(transactions::update_transaction(&conn, id, &bad).is_err());

    let t = transactions::update_transaction(
        &conn,
        id,
        &TxPatch {
            owner: Some(Owner::Split),
            date: Some(day("2025-03-04")),
            ..TxPatch::default()
        },
    )
    .unwrap();
    assert_eq!(t.owner, Owner::Split);
    assert_eq!(t.description, "Toner");
    assert_eq!(t.amount, Decimal::new(9000, 2));

    transactions::delete_transaction(&conn, id).unwrap();
    assert!(transactions::get_transaction(&conn, id).is_err());
    assert!(transactions::delete_transaction(&conn, id).is_err());
}

#[test]
fn period_filter_on_struct() {
    let conn = setup();
    seed(&conn);
    conn.execute(
        "UPDATE transactions SET date=?1 WHERE description='Shop rent'",
        params!["2025-03-01 09:00:00"],
    )
    .unwrap();
    let filter = TxFilter {
        period: Period::between(Some(day("2025-03-01")), Some(day("2025-03-01"))),
        ..TxFilter::default()
    };
    let rows = transactions::list_transactions(&conn, &filter).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, TxKind::Expense);
}

#[test]
fn amount_is_capped() {
    let conn = setup();
    let mut at_cap = entry(TxKind::Income, "Building sale", 0, Owner::Admin, "2025-03-01");
    at_cap.amount = Decimal::from(MAX_AMOUNT);
    transactions::add_transaction(&conn, &at_cap).unwrap();

    let mut over = at_cap.clone();
    over.amount = Decimal::from(MAX_AMOUNT) + Decimal::new(1, 2);
    assert!(transactions::add_transaction(&conn, &over).is_err());
    let mut max = at_cap.clone();
    max.amount = Decimal::MAX;
    assert!(transactions::add_transaction(&conn, &max).is_err());
}

#[test]
fn no_client_flag_clears_reference() {
    let conn = setup();
    let client = clients::add_client(
        &conn,
        &ClientInput {
            name: "Ana Souza".into(),
            cpf: "98765432100".into(),
            phone: "1133334444".into(),
            address: "Av. Brasil, 1000".into(),
            notes: None,
        },
    )
    .unwrap();
    let mut input = entry(TxKind::Income, "Repair", 5000, Owner::Admin, "2025-03-01");
    input.client_id = Some(client);
    let id = transactions::add_transaction(&conn, &input).unwrap();

    let id_s = id.to_string();
    let matches =
        cli::build_cli().get_matches_from(["shopdesk", "tx", "update", id_s.as_str(), "--no-client"]);
    let (_, tx) = matches.subcommand().unwrap();
    transactions::handle(&conn, tx).unwrap();

    let t = transactions::get_transaction(&conn, id).unwrap();
    assert_eq!(t.client_id, None);
    assert_eq!(t.client_name, None);
    assert_eq!(t.description, "Repair");
}
