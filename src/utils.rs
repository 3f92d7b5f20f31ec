// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ShopError;
use crate::models::Owner;

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("static regex"));
static CPF_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{3})(\d{3})(\d{3})(\d{2})$").expect("static regex"));
static MOBILE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})(\d{5})(\d{4})$").expect("static regex"));
static LANDLINE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})(\d{4})(\d{4})$").expect("static regex"));

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_month(s: &str) -> Result<String> {
    chrono::NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
    Ok(s.to_string())
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Read a decimal stored as TEXT, surfacing bad values as conversion errors.
pub fn decimal_column(r: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = r.get(idx)?;
    raw.trim().parse::<Decimal>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Largest amount accepted for a ledger entry, a unit price or an order total.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

pub fn require_amount_cap(field: &'static str, value: &Decimal) -> Result<()> {
    if *value > Decimal::from(MAX_AMOUNT) {
        return Err(ShopError::validation(
            field,
            format!("must not exceed {}", MAX_AMOUNT),
        )
        .into());
    }
    Ok(())
}

/// `a + b` or an overflow error naming what was being summed.
pub fn checked_sum(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, ShopError> {
    a.checked_add(b).ok_or(ShopError::Overflow { what })
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn current_month() -> String {
    today().format("%Y-%m").to_string()
}

pub fn month_start(month: &str) -> Result<NaiveDate> {
    parse_date(&format!("{}-01", month))
        .with_context(|| format!("Invalid month '{}'", month))
}

pub fn month_end(month: &str) -> Result<NaiveDate> {
    let start = month_start(month)?;
    let (y, m) = if start.month() == 12 {
        (start.year() + 1, 1)
    } else {
        (start.year(), start.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| anyhow::anyhow!("Invalid month '{}'", month))
}

pub fn fmt_money(d: &Decimal, symbol: &str) -> String {
    format!("{} {:.2}", symbol, d.round_dp(2))
}

pub fn fmt_date_br(d: &NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

pub fn digits_only(s: &str) -> String {
    NON_DIGIT.replace_all(s, "").into_owned()
}

/// `12345678900` -> `123.456.789-00`; anything that is not 11 digits is
/// returned as its digits.
pub fn format_cpf(raw: &str) -> String {
    let digits = digits_only(raw);
    CPF_SHAPE.replace(&digits, "$1.$2.$3-$4").into_owned()
}

pub fn format_phone(raw: &str) -> String {
    let digits: String = digits_only(raw).chars().take(11).collect();
    if MOBILE_SHAPE.is_match(&digits) {
        MOBILE_SHAPE.replace(&digits, "($1) $2-$3").into_owned()
    } else {
        LANDLINE_SHAPE.replace(&digits, "($1) $2-$3").into_owned()
    }
}

/// Treat blank optional input as absent.
pub fn non_blank(s: Option<&String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn require_min_chars(field: &'static str, value: &str, min: usize) -> Result<()> {
    if value.trim().chars().count() < min {
        return Err(ShopError::validation(
            field,
            format!("must have at least {} characters", min),
        )
        .into());
    }
    Ok(())
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: Serialize>(json_flag: bool, jsonl_flag: bool, v: &T) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

// Settings

pub const KEY_ADMIN_NAME: &str = "owner.admin.name";
pub const KEY_PARTNER_NAME: &str = "owner.partner.name";
pub const KEY_LOW_STOCK: &str = "stock.low_threshold";
pub const KEY_CURRENCY: &str = "currency.symbol";

pub const SETTING_DEFAULTS: [(&str, &str); 4] = [
    (KEY_ADMIN_NAME, "Admin"),
    (KEY_PARTNER_NAME, "Partner"),
    (KEY_LOW_STOCK, "5"),
    (KEY_CURRENCY, "R$"),
];

pub fn setting_default(key: &str) -> Option<&'static str> {
    SETTING_DEFAULTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<String> {
    let default = setting_default(key)
        .ok_or_else(|| ShopError::validation("key", format!("unknown setting '{}'", key)))?;
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.unwrap_or_else(|| default.to_string()))
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    if setting_default(key).is_none() {
        return Err(ShopError::validation("key", format!("unknown setting '{}'", key)).into());
    }
    let value = value.trim();
    if key == KEY_LOW_STOCK {
        let n: i64 = value
            .parse()
            .map_err(|_| ShopError::validation("value", "threshold must be a whole number"))?;
        if n < 0 {
            return Err(ShopError::validation("value", "threshold cannot be negative").into());
        }
    } else if value.is_empty() {
        return Err(ShopError::validation("value", "must not be empty").into());
    }
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Resolved settings with defaults applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub admin_name: String,
    pub partner_name: String,
    pub low_stock_threshold: i64,
    pub currency_symbol: String,
}

impl Settings {
    pub fn load(conn: &Connection) -> Result<Self> {
        let raw = get_setting(conn, KEY_LOW_STOCK)?;
        let low_stock_threshold = raw
            .parse::<i64>()
            .with_context(|| format!("Invalid stored threshold '{}'", raw))?;
        Ok(Settings {
            admin_name: get_setting(conn, KEY_ADMIN_NAME)?,
            partner_name: get_setting(conn, KEY_PARTNER_NAME)?,
            low_stock_threshold,
            currency_symbol: get_setting(conn, KEY_CURRENCY)?,
        })
    }

    pub fn owner_name(&self, owner: Owner) -> String {
        match owner {
            Owner::Admin => self.admin_name.clone(),
            Owner::Partner => self.partner_name.clone(),
            Owner::Split => "Split".to_string(),
        }
    }

    pub fn money(&self, d: &Decimal) -> String {
        fmt_money(d, &self.currency_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpf_is_masked_only_when_complete() {
        assert_eq!(format_cpf("12345678900"), "123.456.789-00");
        assert_eq!(format_cpf("123.456.789-00"), "123.456.789-00");
        assert_eq!(format_cpf("1234"), "1234");
    }

    #[test]
    fn phone_masks_mobile_and_landline() {
        assert_eq!(format_phone("31999991234"), "(31) 99999-1234");
        assert_eq!(format_phone("3133334444"), "(31) 3333-4444");
        assert_eq!(format_phone("(31) 9"), "319");
    }

    #[test]
    fn month_end_handles_december_and_leap_years() {
        assert_eq!(
            month_end("2024-02").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            month_end("2025-12").unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
        assert!(month_end("2025-13").is_err());
    }

    #[test]
    fn money_uses_two_places() {
        assert_eq!(fmt_money(&Decimal::new(15, 0), "R$"), "R$ 15.00");
        assert_eq!(fmt_money(&Decimal::new(12346, 3), "$"), "$ 12.35");
    }
}
