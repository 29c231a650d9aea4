use axum::{extract::State, Json};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{InventoryItem, Transaction},
    reports::{
        self,
        alerts::{self, AlertLevel, StockAlert},
        Bucket, DateRange,
    },
    state::AppState,
};

const RECENT_TRANSACTIONS: usize = 10;
const DASHBOARD_ALERTS: usize = 5;
const WEEK_DAYS: i64 = 7;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub total_items: usize,
    pub total_units: i64,
    pub stock_value: Decimal,
    pub retail_value: Decimal,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
    pub today_revenue: Decimal,
    pub today_profit: Decimal,
    pub today_transactions: usize,
    pub month_revenue: Decimal,
    pub month_profit: Decimal,
    pub alerts: Vec<StockAlert>,
    pub weekly_sales: Vec<Bucket>,
    pub recent_transactions: Vec<Transaction>,
}

pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardData>> {
    let items = state.sheets.list_items().await?;
    let transactions = state.sheets.list_transactions().await?;
    Ok(Json(build(&items, transactions, Utc::now().date_naive())))
}

fn build(items: &[InventoryItem], mut transactions: Vec<Transaction>, today: NaiveDate) -> DashboardData {
    let today_sales = reports::summarize(&reports::filter_by_date(
        &transactions,
        &DateRange::new(Some(today), Some(today)),
    ));
    let month_start = today.with_day(1).unwrap_or(today);
    let month_sales = reports::summarize(&reports::filter_by_date(
        &transactions,
        &DateRange::new(Some(month_start), Some(today)),
    ));

    let week_start = today - Duration::days(WEEK_DAYS - 1);
    let week = reports::filter_by_date(&transactions, &DateRange::new(Some(week_start), Some(today)));
    let weekly_sales = fill_days(reports::group_by_day(&week), week_start, today);

    let all_alerts = alerts::stock_alerts(items);
    let out_of_stock_count = all_alerts
        .iter()
        .filter(|a| a.level == AlertLevel::OutOfStock)
        .count();

    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    transactions.truncate(RECENT_TRANSACTIONS);

    DashboardData {
        total_items: items.len(),
        total_units: items.iter().map(|i| i.quantity).sum(),
        stock_value: items.iter().map(InventoryItem::stock_value).sum(),
        retail_value: items.iter().map(InventoryItem::retail_value).sum(),
        low_stock_count: all_alerts.len() - out_of_stock_count,
        out_of_stock_count,
        today_revenue: today_sales.total_revenue,
        today_profit: today_sales.total_profit,
        today_transactions: today_sales.transaction_count,
        month_revenue: month_sales.total_revenue,
        month_profit: month_sales.total_profit,
        alerts: all_alerts.into_iter().take(DASHBOARD_ALERTS).collect(),
        weekly_sales,
        recent_transactions: transactions,
    }
}

/// One bucket per day in `start..=end`, zeroed where nothing sold.
fn fill_days(buckets: Vec<Bucket>, start: NaiveDate, end: NaiveDate) -> Vec<Bucket> {
    let mut buckets = buckets.into_iter().peekable();
    let mut filled = Vec::new();
    let mut day = start;
    while day <= end {
        let key = day.format("%Y-%m-%d").to_string();
        match buckets.peek() {
            Some(bucket) if bucket.key == key => filled.extend(buckets.next()),
            _ => filled.push(Bucket {
                key,
                ..Default::default()
            }),
        }
        day += Duration::days(1);
    }
    filled
}
