use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::{effective_sales, percentage};
use crate::models::{InventoryItem, Transaction};

pub const CLASS_A_LIMIT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);
pub const CLASS_B_LIMIT: Decimal = Decimal::from_parts(95, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbcEntry {
    pub item_id: String,
    pub item_name: String,
    pub category: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
    pub revenue_share: Decimal,
    pub cumulative_share: Decimal,
    pub class: AbcClass,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbcSummary {
    pub total_revenue: Decimal,
    pub class_a: usize,
    pub class_b: usize,
    pub class_c: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbcAnalysis {
    pub summary: AbcSummary,
    pub items: Vec<AbcEntry>,
}

/// Ranks every item by sales revenue and tiers them by cumulative share:
/// up to 80% is A, up to 95% is B, the tail is C.
pub fn classify(items: &[InventoryItem], transactions: &[Transaction]) -> AbcAnalysis {
    let mut sold: HashMap<&str, (i64, Decimal)> = HashMap::new();
    for tx in effective_sales(transactions) {
        let entry = sold.entry(tx.item_id.as_str()).or_insert((0, Decimal::ZERO));
        entry.0 += tx.quantity;
        entry.1 += tx.total_revenue;
    }

    let mut ranked: Vec<(&InventoryItem, i64, Decimal)> = items
        .iter()
        .map(|item| {
            let (qty, revenue) = sold.get(item.id.as_str()).copied().unwrap_or((0, Decimal::ZERO));
            (item, qty, revenue)
        })
        .collect();
    ranked.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.name.cmp(&b.0.name)));

    let total: Decimal = ranked.iter().map(|(_, _, revenue)| *revenue).sum();
    let mut summary = AbcSummary {
        total_revenue: total,
        ..Default::default()
    };

    let mut running = Decimal::ZERO;
    let entries = ranked
        .into_iter()
        .map(|(item, quantity_sold, revenue)| {
            running += revenue;
            let cumulative_share = percentage(running, total);
            let class = if total.is_zero() {
                AbcClass::C
            } else if cumulative_share <= CLASS_A_LIMIT {
                AbcClass::A
            } else if cumulative_share <= CLASS_B_LIMIT {
                AbcClass::B
            } else {
                AbcClass::C
            };
            match class {
                AbcClass::A => summary.class_a += 1,
                AbcClass::B => summary.class_b += 1,
                AbcClass::C => summary.class_c += 1,
            }

            AbcEntry {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                category: item.category.clone(),
                quantity_sold,
                revenue,
                revenue_share: percentage(revenue, total),
                cumulative_share,
                class,
            }
        })
        .collect();

    AbcAnalysis {
        summary,
        items: entries,
    }
}
