use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::{InventoryItem, Transaction};

pub const DEFAULT_HORIZON_DAYS: i64 = 30;
/// The trend splits the window in two, so it needs at least two days.
pub const MIN_PERIOD_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    pub item_id: String,
    pub item_name: String,
    pub current_stock: i64,
    pub reorder_level: i64,
    pub sold_in_period: i64,
    pub average_daily_sales: f64,
    pub trend: Trend,
    pub projected_demand: i64,
    pub days_until_stockout: Option<f64>,
    pub recommended_reorder: i64,
}

/// Naive demand projection from the `period_days` ending at `window_end`.
/// The trend compares units sold in the later half of the window with the
/// earlier half.
pub fn forecast(
    items: &[InventoryItem],
    transactions: &[Transaction],
    window_end: NaiveDate,
    period_days: i64,
    horizon_days: i64,
) -> Vec<ForecastEntry> {
    let period_days = period_days.max(MIN_PERIOD_DAYS);
    let horizon_days = horizon_days.max(0);
    let window_start = window_end - Duration::days(period_days - 1);
    let midpoint = window_start + Duration::days(period_days / 2);

    let mut halves: HashMap<&str, (i64, i64)> = HashMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_effective_sale()) {
        let date = tx.timestamp.date_naive();
        if date < window_start || date > window_end {
            continue;
        }
        let slot = halves.entry(tx.item_id.as_str()).or_insert((0, 0));
        if date < midpoint {
            slot.0 += tx.quantity;
        } else {
            slot.1 += tx.quantity;
        }
    }

    let mut entries: Vec<ForecastEntry> = items
        .iter()
        .map(|item| {
            let (prior, recent) = halves.get(item.id.as_str()).copied().unwrap_or((0, 0));
            let sold = prior + recent;
            let daily = sold as f64 / period_days as f64;

            let trend = match recent.cmp(&prior) {
                std::cmp::Ordering::Greater => Trend::Increasing,
                std::cmp::Ordering::Less => Trend::Decreasing,
                std::cmp::Ordering::Equal => Trend::Stable,
            };

            let projected = (sold * horizon_days + period_days - 1) / period_days;
            let days_until_stockout = if sold > 0 {
                let days = item.quantity as f64 * period_days as f64 / sold as f64;
                Some((days * 10.0).round() / 10.0)
            } else {
                None
            };

            ForecastEntry {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                current_stock: item.quantity,
                reorder_level: item.reorder_level,
                sold_in_period: sold,
                average_daily_sales: (daily * 100.0).round() / 100.0,
                trend,
                projected_demand: projected,
                days_until_stockout,
                recommended_reorder: (projected + item.reorder_level - item.quantity).max(0),
            }
        })
        .collect();

    // Soonest stock-outs first, items that never sell last
    entries.sort_by(|a, b| match (a.days_until_stockout, b.days_until_stockout) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.item_name.cmp(&b.item_name),
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures::{item, sale};

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 30).unwrap()
    }

    #[test]
    fn rising_sales_project_forward() {
        // Window 2024-01-01..=2024-01-30, midpoint 2024-01-16
        let items = vec![item("a", "X", 6, 4)];
        let txs = vec![
            sale("1", "a", (2024, 1, 5), 3, 60, 30),
            sale("2", "a", (2024, 1, 20), 9, 180, 90),
            sale("3", "a", (2023, 12, 1), 100, 2000, 1000),
        ];

        let entries = forecast(&items, &txs, end(), 30, 30);
        let entry = &entries[0];
        assert_eq!(entry.sold_in_period, 12);
        assert_eq!(entry.trend, Trend::Increasing);
        assert_eq!(entry.average_daily_sales, 0.4);
        assert_eq!(entry.projected_demand, 12);
        assert_eq!(entry.days_until_stockout, Some(15.0));
        assert_eq!(entry.recommended_reorder, 10);
    }

    #[test]
    fn falling_and_flat_trends() {
        let items = vec![item("down", "X", 100, 0), item("flat", "X", 100, 0)];
        let txs = vec![
            sale("1", "down", (2024, 1, 2), 5, 50, 20),
            sale("2", "down", (2024, 1, 25), 1, 10, 4),
        ];

        let entries = forecast(&items, &txs, end(), 30, 30);
        assert_eq!(entries[0].item_id, "down");
        assert_eq!(entries[0].trend, Trend::Decreasing);
        assert_eq!(entries[1].trend, Trend::Stable);
        assert_eq!(entries[1].days_until_stockout, None);
        assert_eq!(entries[1].recommended_reorder, 0);
    }
}
