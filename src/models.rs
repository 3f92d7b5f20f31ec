// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ShopError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub cpf: String,   // digits only
    pub phone: String, // digits only
    pub address: String,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
    pub created_at: String,
}

impl Product {
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.quantity <= threshold
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity <= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    UnderAnalysis,
    AwaitingApproval,
    InRepair,
    ReadyForPickup,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::UnderAnalysis,
        OrderStatus::AwaitingApproval,
        OrderStatus::InRepair,
        OrderStatus::ReadyForPickup,
        OrderStatus::Delivered,
    ];

    pub fn position(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// `None` once the order is delivered; the sequence never wraps.
    pub fn next(self) -> Option<OrderStatus> {
        Self::ALL.get(self.position() + 1).copied()
    }

    pub fn slug(self) -> &'static str {
        match self {
            OrderStatus::UnderAnalysis => "under-analysis",
            OrderStatus::AwaitingApproval => "awaiting-approval",
            OrderStatus::InRepair => "in-repair",
            OrderStatus::ReadyForPickup => "ready-for-pickup",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::UnderAnalysis => "Under Analysis",
            OrderStatus::AwaitingApproval => "Awaiting Approval",
            OrderStatus::InRepair => "In Repair",
            OrderStatus::ReadyForPickup => "Ready for Pickup",
            OrderStatus::Delivered => "Delivered/Closed",
        }
    }

    pub fn is_open(self) -> bool {
        self != OrderStatus::Delivered
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.slug() == wanted || st.label().to_lowercase() == wanted)
            .or(match wanted.as_str() {
                "closed" => Some(OrderStatus::Delivered),
                _ => None,
            })
            .ok_or_else(|| {
                ShopError::validation(
                    "status",
                    format!(
                        "'{}' is not one of {}",
                        s,
                        OrderStatus::ALL.map(|st| st.slug()).join(", ")
                    ),
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: i64,
    pub client_id: i64,
    pub client_name: String,
    pub equipment: String,
    pub problem_description: Option<String>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub entry_date: NaiveDate,
}

impl ServiceOrder {
    pub fn code(&self) -> String {
        order_code(self.id)
    }
}

pub fn order_code(id: i64) -> String {
    format!("OS-{}", id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn subtotal(&self) -> Result<Decimal, ShopError> {
        Decimal::from(self.quantity)
            .checked_mul(self.unit_price)
            .ok_or(ShopError::Overflow { what: "item subtotal" })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Income,
    Expense,
}

impl TxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TxKind::Income => "income",
            TxKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "in" => Ok(TxKind::Income),
            "expense" | "out" => Ok(TxKind::Expense),
            other => Err(ShopError::validation(
                "kind",
                format!("'{}' is not income or expense", other),
            )),
        }
    }
}

/// Who a ledger entry belongs to. `Split` is shared half-and-half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    #[default]
    Admin,
    Partner,
    Split,
}

impl Owner {
    pub fn as_str(self) -> &'static str {
        match self {
            Owner::Admin => "admin",
            Owner::Partner => "partner",
            Owner::Split => "split",
        }
    }

    /// Stored tags predating the owner column are empty; they belong to admin.
    pub fn from_stored(tag: Option<&str>) -> Result<Owner, ShopError> {
        match tag.map(str::trim) {
            None | Some("") => Ok(Owner::Admin),
            Some(t) => t.parse(),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Owner {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Owner::Admin),
            "partner" => Ok(Owner::Partner),
            "split" => Ok(Owner::Split),
            other => Err(ShopError::validation(
                "owner",
                format!("'{}' is not admin, partner or split", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub kind: TxKind,
    pub description: String,
    pub amount: Decimal,
    pub owner: Owner,
    pub date: NaiveDate,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub order_id: Option<i64>,
}
