use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    export::{self, ExportFormat},
    handlers::DateQuery,
    reports::{
        self,
        calendar::{self, CalendarMonth},
        Bucket, DateRange, ItemSales, SalesSummary,
    },
    state::AppState,
};

const TOP_ITEMS: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    #[serde(flatten)]
    pub summary: SalesSummary,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub daily_sales: Vec<Bucket>,
    pub monthly_sales: Vec<Bucket>,
    pub category_breakdown: Vec<Bucket>,
    pub channel_breakdown: Vec<Bucket>,
    pub top_items: Vec<ItemSales>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn sales_report(
    State(state): State<AppState>,
    Query(dates): Query<DateQuery>,
) -> AppResult<Json<SalesReport>> {
    let range = dates.range()?;
    let transactions = reports::filter_by_date(&state.sheets.list_transactions().await?, &range);
    let items = state.sheets.list_items().await?;

    Ok(Json(SalesReport {
        summary: reports::summarize(&transactions),
        start_date: range.start,
        end_date: range.end,
        daily_sales: reports::group_by_day(&transactions),
        monthly_sales: reports::group_by_month(&transactions),
        category_breakdown: reports::group_by_category(&transactions, &items),
        channel_breakdown: reports::group_by_channel(&transactions),
        top_items: reports::top_items(&transactions, TOP_ITEMS),
    }))
}

/// Revenue per day laid out as a Sunday-first month grid.
pub async fn sales_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<CalendarMonth>> {
    let (year, month) = match query.month.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(raw) => calendar::parse_month(raw)
            .ok_or_else(|| AppError::validation("month must be YYYY-MM"))?,
        None => {
            let today = Utc::now().date_naive();
            (today.year(), today.month())
        }
    };

    let start = NaiveDate::from_ymd_opt(year, month, 1);
    let end = calendar::days_in_month(year, month)
        .and_then(|days| NaiveDate::from_ymd_opt(year, month, days));
    let range = DateRange::new(start, end);
    let transactions = reports::filter_by_date(&state.sheets.list_transactions().await?, &range);

    let revenue: HashMap<String, _> = reports::group_by_day(&transactions)
        .into_iter()
        .map(|bucket| (bucket.key, bucket.revenue))
        .collect();

    calendar::month_grid(year, month, &revenue)
        .map(Json)
        .ok_or_else(|| AppError::validation("month must be YYYY-MM"))
}

/// `format=xlsx|pdf`, `type=sales|inventory`; sales honour the date range.
pub async fn export_report(
    State(state): State<AppState>,
    Query(dates): Query<DateQuery>,
    Query(query): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    let format = match query.format.as_deref() {
        None => ExportFormat::Xlsx,
        Some(raw) => ExportFormat::parse(raw)
            .ok_or_else(|| AppError::validation("format must be xlsx or pdf"))?,
    };

    let kind = query.kind.as_deref().unwrap_or("sales").trim().to_ascii_lowercase();
    let table = match kind.as_str() {
        "sales" => {
            let range = dates.range()?;
            let transactions =
                reports::filter_by_date(&state.sheets.list_transactions().await?, &range);
            export::sales_table(&transactions, &reports::summarize(&transactions), &range)
        }
        "inventory" => export::inventory_table(&state.sheets.list_items().await?),
        other => {
            return Err(AppError::validation(format!(
                "unknown report type {}, expected sales or inventory",
                other
            )))
        }
    };

    let bytes = tokio::task::spawn_blocking(move || export::render(&table, format))
        .await
        .map_err(|err| AppError::Export(err.to_string()))?
        .map_err(AppError::Export)?;

    let filename = format!(
        "{}-report-{}.{}",
        kind,
        Utc::now().format("%Y-%m-%d"),
        format.extension()
    );
    log::info!("exported {} ({} bytes)", filename, bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}
