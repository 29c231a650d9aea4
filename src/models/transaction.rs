use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{cell, format_timestamp, optional, parse_count, parse_money, parse_timestamp};
use crate::sheets::Row;

pub const SHEET: &str = "Transactions";
pub const RANGE: &str = "Transactions!A2:P";
pub const HEADER: &[&str] = &[
    "ID",
    "Item ID",
    "Item Name",
    "Quantity",
    "Cost Price",
    "Selling Price",
    "Total Cost",
    "Total Revenue",
    "Profit",
    "Timestamp",
    "Type",
    "Status",
    "Customer",
    "Department",
    "Payment Method",
    "Note",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Sale,
    Restock,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Restock => "restock",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sale" => Some(TransactionKind::Sale),
            "restock" => Some(TransactionKind::Restock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Completed,
    Pending,
    Packed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Packed => "packed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    /// Blank cells predate the status column and count as completed.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "completed" => Some(TransactionStatus::Completed),
            "pending" => Some(TransactionStatus::Pending),
            "packed" => Some(TransactionStatus::Packed),
            "cancelled" | "canceled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub total_cost: Decimal,
    pub total_revenue: Decimal,
    pub profit: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub customer: Option<String>,
    pub department: Option<String>,
    pub payment_method: Option<String>,
    pub note: Option<String>,
}

/// `price * quantity`, or `None` when the product does not fit a `Decimal`.
pub fn line_total(price: Decimal, quantity: i64) -> Option<Decimal> {
    price.checked_mul(Decimal::from(quantity))
}

impl Transaction {
    /// Returns `None` when the line totals overflow.
    pub fn sale(
        id: String,
        item_id: &str,
        item_name: &str,
        quantity: i64,
        cost_price: Decimal,
        selling_price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        let total_cost = line_total(cost_price, quantity)?;
        let total_revenue = line_total(selling_price, quantity)?;
        Some(Self {
            id,
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            quantity,
            cost_price,
            selling_price,
            total_cost,
            total_revenue,
            profit: total_revenue.checked_sub(total_cost)?,
            timestamp,
            kind: TransactionKind::Sale,
            status: TransactionStatus::Completed,
            customer: None,
            department: None,
            payment_method: None,
            note: None,
        })
    }

    pub fn restock(
        id: String,
        item_id: &str,
        item_name: &str,
        quantity: i64,
        cost_price: Decimal,
        selling_price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        Some(Self {
            id,
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            quantity,
            cost_price,
            selling_price,
            total_cost: line_total(cost_price, quantity)?,
            total_revenue: Decimal::ZERO,
            profit: Decimal::ZERO,
            timestamp,
            kind: TransactionKind::Restock,
            status: TransactionStatus::Completed,
            customer: None,
            department: None,
            payment_method: None,
            note: None,
        })
    }

    pub fn is_sale(&self) -> bool {
        self.kind == TransactionKind::Sale
    }

    /// Sales that count towards revenue figures.
    pub fn is_effective_sale(&self) -> bool {
        self.is_sale() && self.status != TransactionStatus::Cancelled
    }

    pub fn from_row(row: &[String]) -> Option<Self> {
        let id = cell(row, 0);
        if id.is_empty() {
            return None;
        }

        Some(Self {
            id: id.to_string(),
            item_id: cell(row, 1).to_string(),
            item_name: cell(row, 2).to_string(),
            quantity: parse_count(cell(row, 3))?,
            cost_price: parse_money(cell(row, 4))?,
            selling_price: parse_money(cell(row, 5))?,
            total_cost: parse_money(cell(row, 6))?,
            total_revenue: parse_money(cell(row, 7))?,
            profit: parse_money(cell(row, 8))?,
            timestamp: parse_timestamp(cell(row, 9))?,
            kind: TransactionKind::parse(cell(row, 10))?,
            status: TransactionStatus::parse(cell(row, 11))?,
            customer: optional(row, 12),
            department: optional(row, 13),
            payment_method: optional(row, 14),
            note: optional(row, 15),
        })
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.id.clone(),
            self.item_id.clone(),
            self.item_name.clone(),
            self.quantity.to_string(),
            self.cost_price.to_string(),
            self.selling_price.to_string(),
            self.total_cost.to_string(),
            self.total_revenue.to_string(),
            self.profit.to_string(),
            format_timestamp(&self.timestamp),
            self.kind.as_str().to_string(),
            self.status.as_str().to_string(),
            self.customer.clone().unwrap_or_default(),
            self.department.clone().unwrap_or_default(),
            self.payment_method.clone().unwrap_or_default(),
            self.note.clone().unwrap_or_default(),
        ]
    }
}

/// One checkout line. `selling_price` overrides the item's list price.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub item_id: String,
    pub quantity: i64,
    pub selling_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetails {
    pub customer: Option<String>,
    pub department: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<TransactionStatus>,
    pub note: Option<String>,
}
