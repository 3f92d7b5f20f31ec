// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use rust_decimal::Decimal;
use shopdesk::models::Owner;
use shopdesk::commands::config;
use shopdesk::utils::{self, KEY_CURRENCY, KEY_LOW_STOCK, KEY_PARTNER_NAME, Settings};
use shopdesk::{cli, db};
use tempfile::tempdir;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

#[test]
fn defaults_apply_until_set() {
    let conn = setup();
    let s = Settings::load(&conn).unwrap();
    assert_eq!(s.low_stock_threshold, 5);
    assert_eq!(s.currency_symbol, "R$");
    assert_eq!(s.owner_name(Owner::Split), "Split");

    utils::set_setting(&conn, KEY_PARTNER_NAME, "  Pedro ").unwrap();
    utils::set_setting(&conn, KEY_CURRENCY, "US$").unwrap();
    let s = Settings::load(&conn).unwrap();
    assert_eq!(s.owner_name(Owner::Partner), "Pedro");
    assert_eq!(s.money(&Decimal::new(150, 1)), "US$ 15.00");
}

#[test]
fn bad_values_and_unknown_keys_rejected() {
    let conn = setup();
    assert!(utils::set_setting(&conn, KEY_LOW_STOCK, "-1").is_err());
    assert!(utils::set_setting(&conn, KEY_LOW_STOCK, "many").is_err());
    assert!(utils::set_setting(&conn, KEY_CURRENCY, "   ").is_err());
    assert!(utils::set_setting(&conn, "theme.color", "blue").is_err());
    assert!(utils::get_setting(&conn, "theme.color").is_err());
    assert_eq!(utils::get_setting(&conn, KEY_LOW_STOCK).unwrap(), "5");
}

#[test]
fn config_set_via_cli() {
    let conn = setup();
    let matches = cli::build_cli().get_matches_from([
        "shopdesk",
        "config",
        "set",
        "stock.low_threshold",
        "2",
    ]);
    let (_, m) = matches.subcommand().unwrap();
    config::handle(&conn, m).unwrap();
    assert_eq!(Settings::load(&conn).unwrap().low_stock_threshold, 2);
}

#[test]
fn open_or_init_creates_file_at_override() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("shop.sqlite");
    let conn = db::open_or_init(Some(&path)).unwrap();
    assert!(path.exists());
    assert_eq!(db::db_path(Some(&path)).unwrap(), path);
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM clients", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 0);
}
