use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    handlers::DateQuery,
    models::{Transaction, TransactionStatus},
    reports::{self, Bucket, ItemSales, SalesSummary},
    state::AppState,
};

const RECENT_TRANSACTIONS: usize = 20;
const TOP_ITEMS: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub id: String,
    pub name: String,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub profit_margin: Decimal,
    pub items_sold: i64,
    pub transaction_count: usize,
    pub revenue_share: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDetail {
    pub id: String,
    pub name: String,
    pub summary: SalesSummary,
    pub daily_sales: Vec<Bucket>,
    pub top_items: Vec<ItemSales>,
    pub recent_transactions: Vec<Transaction>,
    pub cancelled_count: usize,
}

pub async fn list_departments(
    State(state): State<AppState>,
    Query(dates): Query<DateQuery>,
) -> AppResult<Json<Vec<DepartmentSummary>>> {
    let range = dates.range()?;
    let transactions = reports::filter_by_date(&state.sheets.list_transactions().await?, &range);
    Ok(Json(summaries(&transactions)))
}

pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(dates): Query<DateQuery>,
) -> AppResult<Json<DepartmentDetail>> {
    let range = dates.range()?;
    let transactions = reports::filter_by_date(&state.sheets.list_transactions().await?, &range);
    detail(&id, transactions)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("department {}", id)))
}

fn summaries(transactions: &[Transaction]) -> Vec<DepartmentSummary> {
    let total = reports::summarize(transactions).total_revenue;

    reports::group_by_channel(transactions)
        .into_iter()
        .map(|bucket| DepartmentSummary {
            id: reports::slug(&bucket.key),
            profit_margin: reports::percentage(bucket.profit, bucket.revenue),
            revenue_share: reports::percentage(bucket.revenue, total)
                .to_f64()
                .unwrap_or(0.0),
            name: bucket.key,
            revenue: bucket.revenue,
            cost: bucket.cost,
            profit: bucket.profit,
            items_sold: bucket.quantity,
            transaction_count: bucket.count,
        })
        .collect()
}

/// Everything sold through the channel whose slug is `id`, cancelled sales
/// included in the count but not in the figures.
fn detail(id: &str, transactions: Vec<Transaction>) -> Option<DepartmentDetail> {
    let mut own: Vec<Transaction> = transactions
        .into_iter()
        .filter(|tx| tx.is_sale() && reports::slug(&reports::channel_of(tx)) == id)
        .collect();
    let name = reports::channel_of(own.first()?);

    let cancelled_count = own
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Cancelled)
        .count();
    let summary = reports::summarize(&own);
    let daily_sales = reports::group_by_day(&own);
    let top_items = reports::top_items(&own, TOP_ITEMS);

    own.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    own.truncate(RECENT_TRANSACTIONS);

    Some(DepartmentDetail {
        id: id.to_string(),
        name,
        summary,
        daily_sales,
        top_items,
        recent_transactions: own,
        cancelled_count,
    })
}
