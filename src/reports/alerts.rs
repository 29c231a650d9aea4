use serde::Serialize;

use crate::models::InventoryItem;

/// Quantity at or below this share of the reorder level is critical.
pub const CRITICAL_PERCENT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    OutOfStock,
    Critical,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub item_id: String,
    pub item_name: String,
    pub sku: String,
    pub category: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub stock_percentage: f64,
    pub level: AlertLevel,
    pub suggested_order: i64,
}

pub fn stock_percentage(item: &InventoryItem) -> f64 {
    if item.reorder_level <= 0 {
        return if item.quantity > 0 { 100.0 } else { 0.0 };
    }
    let pct = item.quantity as f64 / item.reorder_level as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

pub fn alert_level(item: &InventoryItem) -> Option<AlertLevel> {
    if item.quantity <= 0 {
        return Some(AlertLevel::OutOfStock);
    }
    if item.reorder_level <= 0 {
        return None;
    }
    let pct = stock_percentage(item);
    if pct <= CRITICAL_PERCENT {
        Some(AlertLevel::Critical)
    } else if item.quantity <= item.reorder_level {
        Some(AlertLevel::Low)
    } else {
        None
    }
}

/// Items needing attention, worst first.
pub fn stock_alerts(items: &[InventoryItem]) -> Vec<StockAlert> {
    let mut alerts: Vec<StockAlert> = items
        .iter()
        .filter_map(|item| {
            let level = alert_level(item)?;
            Some(StockAlert {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                sku: item.sku.clone(),
                category: item.category.clone(),
                quantity: item.quantity,
                reorder_level: item.reorder_level,
                stock_percentage: stock_percentage(item),
                level,
                // Bring stock back to twice the reorder level
                suggested_order: (item.reorder_level * 2 - item.quantity).max(0),
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| {
                a.stock_percentage
                    .partial_cmp(&b.stock_percentage)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    alerts
}
