use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{InventoryItem, Transaction},
    reports::{
        self,
        abc::{self, AbcAnalysis},
        forecast::{self, ForecastEntry, DEFAULT_HORIZON_DAYS, MIN_PERIOD_DAYS},
        turnover::{self, DeadStockReport, TurnoverEntry, DEFAULT_DEAD_STOCK_DAYS},
        DateRange,
    },
    state::AppState,
};

const DEFAULT_PERIOD_DAYS: i64 = 30;
const MAX_PERIOD_DAYS: i64 = 3650;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub period: Option<i64>,
    pub threshold: Option<i64>,
    pub horizon: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsKind {
    Abc,
    Turnover,
    Deadstock,
    Forecast,
}

impl AnalyticsKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "abc" => Some(AnalyticsKind::Abc),
            "turnover" => Some(AnalyticsKind::Turnover),
            "deadstock" | "dead-stock" | "dead_stock" => Some(AnalyticsKind::Deadstock),
            "forecast" => Some(AnalyticsKind::Forecast),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalyticsData {
    Abc(AbcAnalysis),
    Turnover(Vec<TurnoverEntry>),
    DeadStock(DeadStockReport),
    Forecast(Vec<ForecastEntry>),
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    #[serde(rename = "type")]
    pub kind: AnalyticsKind,
    pub period: i64,
    pub data: AnalyticsData,
}

pub async fn analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<AnalyticsResponse>> {
    let kind = query
        .kind
        .as_deref()
        .map(|raw| {
            AnalyticsKind::parse(raw).ok_or_else(|| {
                AppError::validation("type must be one of abc, turnover, deadstock, forecast")
            })
        })
        .transpose()?
        .unwrap_or(AnalyticsKind::Abc);
    let period = positive(query.period, DEFAULT_PERIOD_DAYS, "period")?;

    let items = state.sheets.list_items().await?;
    let transactions = state.sheets.list_transactions().await?;
    let data = analyse(kind, period, &query, &items, &transactions, Utc::now())?;

    Ok(Json(AnalyticsResponse { kind, period, data }))
}

fn analyse(
    kind: AnalyticsKind,
    period: i64,
    query: &AnalyticsQuery,
    items: &[InventoryItem],
    transactions: &[Transaction],
    now: DateTime<Utc>,
) -> AppResult<AnalyticsData> {
    let today = now.date_naive();
    let window = DateRange::new(Some(today - Duration::days(period - 1)), Some(today));

    let data = match kind {
        AnalyticsKind::Abc => {
            AnalyticsData::Abc(abc::classify(items, &reports::filter_by_date(transactions, &window)))
        }
        AnalyticsKind::Turnover => AnalyticsData::Turnover(turnover::turnover(
            items,
            &reports::filter_by_date(transactions, &window),
            period,
        )),
        AnalyticsKind::Deadstock => {
            let threshold = positive(query.threshold, DEFAULT_DEAD_STOCK_DAYS, "threshold")?;
            AnalyticsData::DeadStock(turnover::dead_stock(items, transactions, now, threshold))
        }
        AnalyticsKind::Forecast => {
            if period < MIN_PERIOD_DAYS {
                return Err(AppError::validation(format!(
                    "forecast period must be at least {} days",
                    MIN_PERIOD_DAYS
                )));
            }
            let horizon = positive(query.horizon, DEFAULT_HORIZON_DAYS, "horizon")?;
            AnalyticsData::Forecast(forecast::forecast(items, transactions, today, period, horizon))
        }
    };
    Ok(data)
}

fn positive(value: Option<i64>, default: i64, name: &str) -> AppResult<i64> {
    match value {
        None => Ok(default),
        Some(days) if days > 0 && days <= MAX_PERIOD_DAYS => Ok(days),
        Some(_) => Err(AppError::validation(format!(
            "{} must be between 1 and {} days",
            name, MAX_PERIOD_DAYS
        ))),
    }
}
