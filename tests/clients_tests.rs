// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use shopdesk::commands::clients::{self, ClientInput, ClientPatch};
use shopdesk::commands::orders::{self, OrderInput};
use shopdesk::commands::transactions::{self, TxFilter, TxInput};
use shopdesk::db;
use shopdesk::error::ShopError;
use shopdesk::models::{Owner, TxKind};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn joao() -> ClientInput {
    ClientInput {
        name: "João da Silva".into(),
        cpf: "123.456.789-00".into(),
        phone: "(31) 99999-1234".into(),
        address: "Rua das Flores, 123".into(),
        notes: Some("prefers WhatsApp".into()),
    }
}

fn maria() -> ClientInput {
    ClientInput {
        name: "Maria Oliveira".into(),
        cpf: "98765432101".into(),
        phone: "3188885678".into(),
        address: "Avenida Principal, 456".into(),
        notes: None,
    }
}

fn field_of(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<ShopError>() {
        Some(ShopError::Validation { field, .. }) => *field,
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn add_stores_digits_only() {
    let conn = setup();
    let id = clients::add_client(&conn, &joao()).unwrap();
    let c = clients::get_client(&conn, id).unwrap();
    assert_eq!(c.cpf, "12345678900");
    assert_eq!(c.phone, "31999991234");
    assert_eq!(c.notes.as_deref(), Some("prefers WhatsApp"));
}

#[test]
fn validation_rejects_bad_fields() {
    let conn = setup();
    let mut input = joao();
    input.name = "Jo".into();
    assert_eq!(field_of(&clients::add_client(&conn, &input).unwrap_err()), "name");

    let mut input = joao();
    input.cpf = "123.456.789".into();
    assert_eq!(field_of(&clients::add_client(&conn, &input).unwrap_err()), "cpf");

    let mut input = joao();
    input.phone = "3199999".into();
    assert_eq!(field_of(&clients::add_client(&conn, &input).unwrap_err()), "phone");

    let mut input = joao();
    input.address = "Rua".into();
    assert_eq!(field_of(&clients::add_client(&conn, &input).unwrap_err()), "address");

    assert!(clients::list_clients(&conn, None).unwrap().is_empty());
}

#[test]
fn search_by_name_cpf_and_phone() {
    let conn = setup();
    let j = clients::add_client(&conn, &joao()).unwrap();
    let m = clients::add_client(&conn, &maria()).unwrap();

    let by_name = clients::list_clients(&conn, Some("OLIVEIRA")).unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, m);

    let by_cpf = clients::list_clients(&conn, Some("456.789")).unwrap();
    assert_eq!(by_cpf.len(), 1);
    assert_eq!(by_cpf[0].id, j);

    let by_phone = clients::list_clients(&conn, Some("8888")).unwrap();
    assert_eq!(by_phone.len(), 1);
    assert_eq!(by_phone[0].id, m);

    let all = clients::list_clients(&conn, Some("  ")).unwrap();
    assert_eq!(all.len(), 2);
    // newest first
    assert_eq!(all[0].id, m);
}

#[test]
fn update_merges_and_keeps_creation_time() {
    let conn = setup();
    let id = clients::add_client(&conn, &joao()).unwrap();
    conn.execute(
        "UPDATE clients SET created_at='2023-10-26 10:00:00' WHERE id=?1",
        [id],
    )
    .unwrap();

    let patch = ClientPatch {
        phone: Some("31 3333-4444".into()),
        notes: Some("".into()),
        ..ClientPatch::default()
    };
    let c = clients::update_client(&conn, id, &patch).unwrap();
    assert_eq!(c.name, "João da Silva");
    assert_eq!(c.phone, "3133334444");
    assert_eq!(c.notes, None);
    assert_eq!(c.created_at, "2023-10-26 10:00:00");

    let bad = ClientPatch {
        cpf: Some("1".into()),
        ..ClientPatch::default()
    };
    assert!(clients::update_client(&conn, id, &bad).is_err());
    assert_eq!(clients::get_client(&conn, id).unwrap().cpf, "12345678900");
}

#[test]
fn delete_keeps_orders_and_ledger_entries() {
    let conn = setup();
    let id = clients::add_client(&conn, &joao()).unwrap();
    let order = orders::add_order(
        &conn,
        &OrderInput {
            client_id: id,
            equipment: "Notebook Dell".into(),
            problem_description: None,
            notes: None,
            entry_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        },
    )
    .unwrap();
    transactions::add_transaction(
        &conn,
        &TxInput {
            kind: TxKind::Income,
            description: "Formatting".into(),
            amount: Decimal::new(150, 0),
            owner: Owner::Admin,
            date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            client_id: Some(id),
            order_id: None,
        },
    )
    .unwrap();

    clients::delete_client(&conn, id).unwrap();

    assert!(clients::find_client(&conn, id).unwrap().is_none());
    let o = orders::get_order(&conn, order).unwrap();
    assert_eq!(o.client_id, id);
    assert_eq!(o.client_name, "João da Silva");
    let txs = transactions::list_transactions(
        &conn,
        &TxFilter {
            client_id: Some(id),
            ..TxFilter::default()
        },
    )
    .unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].client_name.as_deref(), Some("João da Silva"));
}

#[test]
fn delete_unknown_is_not_found() {
    let conn = setup();
    let err = clients::delete_client(&conn, 42).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShopError>(),
        Some(ShopError::NotFound { .. })
    ));
}

#[test]
fn count_created_between_uses_date_part() {
    let conn = setup();
    clients::add_client(&conn, &joao()).unwrap();
    clients::add_client(&conn, &maria()).unwrap();
    conn.execute(
        "UPDATE clients SET created_at='2025-02-27 18:00:00' WHERE id=1",
        [],
    )
    .unwrap();
    conn.execute(
        "UPDATE clients SET created_at='2025-03-01 00:00:01' WHERE id=2",
        [],
    )
    .unwrap();
    let from = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
    assert_eq!(clients::count_created_between(&conn, from, to).unwrap(), 1);
    let feb = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    let feb_end = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
    assert_eq!(clients::count_created_between(&conn, feb, feb_end).unwrap(), 1);
}
