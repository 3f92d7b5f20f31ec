// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::clients::count_created_between;
use crate::commands::orders::list_orders;
use crate::commands::products::low_stock;
use crate::commands::transactions::{TxFilter, list_transactions, period_from_args};
use crate::ledger::{DayPoint, Period, Summary, daily_series, summarize};
use crate::models::{OrderStatus, Transaction, TxKind};
use crate::utils::{
    Settings, current_month, fmt_date_br, maybe_print_json, parse_date, parse_month,
    pretty_table, today,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;

pub fn handle(conn: &rusqlite::Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("summary", sub)) => summary(conn, sub)?,
        Some(("daily", sub)) => daily(conn, sub)?,
        Some(("dashboard", sub)) => dashboard(conn, sub)?,
        Some(("print", sub)) => print_report(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Entries inside the period, oldest first.
pub fn period_transactions(
    conn: &rusqlite::Connection,
    period: &Period,
) -> Result<Vec<Transaction>> {
    let filter = TxFilter {
        period: *period,
        ..TxFilter::default()
    };
    let mut txs = list_transactions(conn, &filter)?;
    // SQL compares the text prefix; the parsed date has the final say
    txs.retain(|t| period.contains(t.date));
    txs.reverse();
    Ok(txs)
}

pub fn period_summary(conn: &rusqlite::Connection, period: &Period) -> Result<Summary> {
    summarize(&period_transactions(conn, period)?)
}

fn summary(conn: &rusqlite::Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let explicit = ["month", "from", "to"]
        .iter()
        .any(|k| sub.get_one::<String>(k).is_some());
    let period = if explicit {
        period_from_args(sub)?
    } else {
        Period::month(&current_month())?
    };
    let s = period_summary(conn, &period)?;

    #[derive(Serialize)]
    struct Out<'a> {
        period: String,
        #[serde(flatten)]
        summary: &'a Summary,
    }
    let out = Out {
        period: period.label(),
        summary: &s,
    };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &out)? {
        println!("Period: {}", out.period);
        println!("{}", summary_table(&settings, &s));
    }
    Ok(())
}

fn summary_table(settings: &Settings, s: &Summary) -> comfy_table::Table {
    let rows = vec![
        vec!["Revenue".into(), settings.money(&s.revenue)],
        vec!["Expenses".into(), settings.money(&s.expenses)],
        vec!["Profit".into(), settings.money(&s.profit)],
        vec!["Sales".into(), s.income_count.to_string()],
        vec![
            format!("{} share", settings.admin_name),
            settings.money(&s.admin_share),
        ],
        vec![
            format!("{} share", settings.partner_name),
            settings.money(&s.partner_share),
        ],
    ];
    pretty_table(&["Metric", "Value"], rows)
}

/// Income, expense and balance for each day of `month` (YYYY-MM) that has
/// entries.
pub fn daily_points(conn: &rusqlite::Connection, month: &str) -> Result<Vec<DayPoint>> {
    daily_series(&period_transactions(conn, &Period::month(month)?)?)
}

fn daily(conn: &rusqlite::Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let month = match sub.get_one::<String>("month") {
        Some(m) => parse_month(m)?,
        None => current_month(),
    };
    let series = daily_points(conn, &month)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &series)? {
        let rows = series
            .iter()
            .map(|p| {
                vec![
                    p.day.format("%d/%m").to_string(),
                    settings.money(&p.income),
                    settings.money(&p.expense),
                    settings.money(&p.balance),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Day", "Income", "Expense", "Balance"], rows)
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub month: String,
    pub summary: Summary,
    pub new_clients: i64,
    pub open_orders: Vec<(OrderStatus, usize)>,
    pub low_stock: usize,
}

pub fn build_dashboard(conn: &rusqlite::Connection, month: &str) -> Result<Dashboard> {
    let settings = Settings::load(conn)?;
    let period = Period::month(month)?;
    let summary = period_summary(conn, &period)?;
    let from = period.from.context("month period has a start")?;
    let to = period.to.context("month period has an end")?;
    let new_clients = count_created_between(conn, from, to)?;
    let orders = list_orders(conn, None, None)?;
    let open_orders = OrderStatus::ALL
        .into_iter()
        .filter(|s| s.is_open())
        .map(|s| (s, orders.iter().filter(|o| o.order.status == s).count()))
        .collect();
    let low = low_stock(conn, settings.low_stock_threshold)?;
    Ok(Dashboard {
        month: month.to_string(),
        summary,
        new_clients,
        open_orders,
        low_stock: low.len(),
    })
}

fn dashboard(conn: &rusqlite::Connection, sub: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(conn)?;
    let d = build_dashboard(conn, &current_month())?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &d)? {
        return Ok(());
    }
    println!("Month: {}", d.month);
    println!("{}", summary_table(&settings, &d.summary));
    let mut rows: Vec<Vec<String>> = d
        .open_orders
        .iter()
        .map(|(s, n)| vec![s.to_string(), n.to_string()])
        .collect();
    rows.push(vec!["New clients this month".into(), d.new_clients.to_string()]);
    rows.push(vec!["Low-stock products".into(), d.low_stock.to_string()]);
    println!("{}", pretty_table(&["Item", "Count"], rows));
    Ok(())
}

/// Text rendition of the financial report: header, totals, entry table,
/// partner shares.
pub fn render_financial_report(
    conn: &rusqlite::Connection,
    period: &Period,
    generated_on: NaiveDate,
) -> Result<String> {
    let settings = Settings::load(conn)?;
    let txs = period_transactions(conn, period)?;
    let s = summarize(&txs)?;

    let mut out = String::new();
    writeln!(out, "FINANCIAL REPORT")?;
    writeln!(out, "Period: {}", period.label())?;
    writeln!(out, "Generated on: {}", fmt_date_br(&generated_on))?;
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        pretty_table(
            &["Total income", "Total expense", "Net balance"],
            vec![vec![
                settings.money(&s.revenue),
                settings.money(&s.expenses),
                settings.money(&s.profit),
            ]],
        )
    )?;
    writeln!(out)?;
    if txs.is_empty() {
        writeln!(out, "No entries found in this period.")?;
    } else {
        let rows = txs
            .iter()
            .map(|t| {
                let description = match &t.client_name {
                    Some(c) if !c.is_empty() => format!("{}\n{}", t.description, c),
                    _ => t.description.clone(),
                };
                let (kind, signed) = match t.kind {
                    TxKind::Income => ("In", t.amount),
                    TxKind::Expense => ("Out", -t.amount),
                };
                vec![
                    fmt_date_br(&t.date),
                    description,
                    settings.owner_name(t.owner),
                    kind.to_string(),
                    settings.money(&signed),
                ]
            })
            .collect();
        writeln!(
            out,
            "{}",
            pretty_table(&["Date", "Description", "Owner", "Type", "Amount"], rows)
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{}: {}",
        settings.admin_name,
        settings.money(&s.admin_share)
    )?;
    writeln!(
        out,
        "{}: {}",
        settings.partner_name,
        settings.money(&s.partner_share)
    )?;
    Ok(out)
}

fn print_report(conn: &rusqlite::Connection, sub: &clap::ArgMatches) -> Result<()> {
    let from = sub
        .get_one::<String>("from")
        .map(|s| parse_date(s))
        .transpose()?;
    let to = sub
        .get_one::<String>("to")
        .map(|s| parse_date(s))
        .transpose()?;
    let doc = render_financial_report(conn, &Period::checked(from, to)?, today())?;
    match sub.get_one::<String>("out") {
        Some(path) => {
            std::fs::write(path, &doc).with_context(|| format!("Write {}", path))?;
            println!("Wrote financial report to {}", path);
        }
        None => print!("{}", doc),
    }
    Ok(())
}
