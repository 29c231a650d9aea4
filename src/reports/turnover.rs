use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{InventoryItem, Transaction, TransactionKind, TransactionStatus};

pub const FAST_TURNOVER: f64 = 4.0;
pub const NORMAL_TURNOVER: f64 = 1.0;
pub const DEFAULT_DEAD_STOCK_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnoverClass {
    Fast,
    Normal,
    Slow,
    Stagnant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnoverEntry {
    pub item_id: String,
    pub item_name: String,
    pub category: String,
    pub quantity_sold: i64,
    pub quantity_restocked: i64,
    pub opening_stock: i64,
    pub closing_stock: i64,
    pub average_inventory: f64,
    pub turnover_ratio: f64,
    pub days_of_supply: Option<f64>,
    pub classification: TurnoverClass,
}

#[derive(Debug, Default, Clone, Copy)]
struct Movement {
    sold: i64,
    restocked: i64,
}

fn movements(transactions: &[Transaction]) -> HashMap<&str, Movement> {
    let mut moved: HashMap<&str, Movement> = HashMap::new();
    for tx in transactions {
        let entry = moved.entry(tx.item_id.as_str()).or_default();
        match tx.kind {
            TransactionKind::Sale if tx.is_effective_sale() => entry.sold += tx.quantity,
            TransactionKind::Restock if tx.status != TransactionStatus::Cancelled => {
                entry.restocked += tx.quantity
            }
            _ => {}
        }
    }
    moved
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Turnover per item over a window of `period_days`. `transactions` must
/// already be restricted to that window; closing stock is the current
/// quantity and opening stock is reconstructed from the window's movements.
pub fn turnover(
    items: &[InventoryItem],
    transactions: &[Transaction],
    period_days: i64,
) -> Vec<TurnoverEntry> {
    let moved = movements(transactions);
    let period_days = period_days.max(1) as f64;

    let mut entries: Vec<TurnoverEntry> = items
        .iter()
        .map(|item| {
            let movement = moved.get(item.id.as_str()).copied().unwrap_or_default();
            let closing = item.quantity;
            let opening = (closing + movement.sold - movement.restocked).max(0);
            let average_inventory = (opening + closing) as f64 / 2.0;

            let turnover_ratio = if average_inventory > 0.0 {
                movement.sold as f64 / average_inventory
            } else if movement.sold > 0 {
                // Everything that came in went straight out
                movement.sold as f64
            } else {
                0.0
            };

            let daily_rate = movement.sold as f64 / period_days;
            let days_of_supply = if daily_rate > 0.0 {
                Some(round2(closing as f64 / daily_rate))
            } else {
                None
            };

            let classification = if turnover_ratio >= FAST_TURNOVER {
                TurnoverClass::Fast
            } else if turnover_ratio >= NORMAL_TURNOVER {
                TurnoverClass::Normal
            } else if turnover_ratio > 0.0 {
                TurnoverClass::Slow
            } else {
                TurnoverClass::Stagnant
            };

            TurnoverEntry {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                category: item.category.clone(),
                quantity_sold: movement.sold,
                quantity_restocked: movement.restocked,
                opening_stock: opening,
                closing_stock: closing,
                average_inventory: round2(average_inventory),
                turnover_ratio: round2(turnover_ratio),
                days_of_supply,
                classification,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.turnover_ratio
            .partial_cmp(&a.turnover_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    entries
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadStockEntry {
    pub item_id: String,
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    pub stock_value: Decimal,
    pub last_sale: Option<NaiveDate>,
    pub days_since_last_sale: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadStockReport {
    pub threshold_days: i64,
    pub total_value: Decimal,
    pub total_units: i64,
    pub items: Vec<DeadStockEntry>,
}

/// Stocked items with no sale in the `threshold_days` before `as_of`.
/// `transactions` is the full history, not a windowed slice.
pub fn dead_stock(
    items: &[InventoryItem],
    transactions: &[Transaction],
    as_of: DateTime<Utc>,
    threshold_days: i64,
) -> DeadStockReport {
    let mut last_sale: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_effective_sale()) {
        let slot = last_sale.entry(tx.item_id.as_str()).or_insert(tx.timestamp);
        if tx.timestamp > *slot {
            *slot = tx.timestamp;
        }
    }

    let mut entries: Vec<DeadStockEntry> = items
        .iter()
        .filter(|item| item.quantity > 0)
        .filter_map(|item| {
            let last = last_sale.get(item.id.as_str()).copied();
            let days_since = last.map(|ts| (as_of.date_naive() - ts.date_naive()).num_days());
            let dead = days_since.map_or(true, |days| days >= threshold_days);
            dead.then(|| DeadStockEntry {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                category: item.category.clone(),
                quantity: item.quantity,
                stock_value: item.stock_value(),
                last_sale: last.map(|ts| ts.date_naive()),
                days_since_last_sale: days_since,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.stock_value.cmp(&a.stock_value));

    DeadStockReport {
        threshold_days,
        total_value: entries.iter().map(|e| e.stock_value).sum(),
        total_units: entries.iter().map(|e| e.quantity).sum(),
        items: entries,
    }
}
