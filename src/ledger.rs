// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure reductions over ledger entries and service-order items. Nothing in
//! here touches the database; the report commands load rows and fold them
//! through these functions.

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ShopError;
use crate::models::{OrderItem, Owner, Transaction, TxKind};
use crate::utils::{checked_sum, fmt_date_br, month_end, month_start};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub profit: Decimal,
    pub income_count: usize,
    pub admin_share: Decimal,
    pub partner_share: Decimal,
}

/// Fold entries into totals. Income credits its owner, expense debits it;
/// a split entry moves half to each partner.
pub fn summarize<'a, I>(txs: I) -> Result<Summary>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    const WHAT: &str = "ledger total";
    let half = Decimal::new(5, 1);
    let mut s = Summary::default();
    for t in txs {
        let signed = match t.kind {
            TxKind::Income => {
                s.revenue = checked_sum(s.revenue, t.amount, WHAT)?;
                s.income_count += 1;
                t.amount
            }
            TxKind::Expense => {
                s.expenses = checked_sum(s.expenses, t.amount, WHAT)?;
                -t.amount
            }
        };
        match t.owner {
            Owner::Admin => s.admin_share = checked_sum(s.admin_share, signed, WHAT)?,
            Owner::Partner => s.partner_share = checked_sum(s.partner_share, signed, WHAT)?,
            Owner::Split => {
                let part = signed * half;
                s.admin_share = checked_sum(s.admin_share, part, WHAT)?;
                s.partner_share = checked_sum(s.partner_share, part, WHAT)?;
            }
        }
    }
    s.profit = s
        .revenue
        .checked_sub(s.expenses)
        .ok_or(ShopError::Overflow { what: WHAT })?;
    Ok(s)
}

/// Inclusive date window; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Period {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Period {
    pub fn all() -> Self {
        Period::default()
    }

    pub fn between(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Period { from, to }
    }

    pub fn month(month: &str) -> Result<Self> {
        Ok(Period {
            from: Some(month_start(month)?),
            to: Some(month_end(month)?),
        })
    }

    /// Like `between`, but a start after the end is rejected.
    pub fn checked(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(ShopError::validation("from", "must not be after --to").into());
            }
        }
        Ok(Period::between(from, to))
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        self.from.is_none_or(|f| d >= f) && self.to.is_none_or(|t| d <= t)
    }

    pub fn label(&self) -> String {
        match (self.from, self.to) {
            (None, None) => "All time".to_string(),
            (Some(f), None) => format!("From {}", fmt_date_br(&f)),
            (None, Some(t)) => format!("Until {}", fmt_date_br(&t)),
            (Some(f), Some(t)) => format!("{} - {}", fmt_date_br(&f), fmt_date_br(&t)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayPoint {
    pub day: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

/// Per-day income/expense, ascending by day. Days without entries are skipped.
pub fn daily_series<'a, I>(txs: I) -> Result<Vec<DayPoint>>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    const WHAT: &str = "daily total";
    let mut grouped: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    for t in txs {
        let entry = grouped
            .entry(t.date)
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        match t.kind {
            TxKind::Income => entry.0 = checked_sum(entry.0, t.amount, WHAT)?,
            TxKind::Expense => entry.1 = checked_sum(entry.1, t.amount, WHAT)?,
        }
    }
    grouped
        .into_iter()
        .map(|(day, (income, expense))| -> Result<DayPoint> {
            Ok(DayPoint {
                day,
                income,
                expense,
                balance: income
                    .checked_sub(expense)
                    .ok_or(ShopError::Overflow { what: WHAT })?,
            })
        })
        .collect()
}

pub fn order_total<'a, I>(items: I) -> Result<Decimal>
where
    I: IntoIterator<Item = &'a OrderItem>,
{
    let mut total = Decimal::ZERO;
    for item in items {
        total = checked_sum(total, item.subtotal()?, "order total")?;
    }
    Ok(total)
}
