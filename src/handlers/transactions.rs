use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    handlers::DateQuery,
    models::{Transaction, TransactionKind, TransactionStatus},
    reports::filter_by_date,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub item_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: TransactionStatus,
}

/// Newest first.
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(dates): Query<DateQuery>,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<Json<Vec<Transaction>>> {
    let range = dates.range()?;
    let kind = match filter.kind.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            TransactionKind::parse(raw)
                .ok_or_else(|| AppError::validation(format!("unknown transaction type {}", raw)))?,
        ),
    };
    let status = match filter.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            TransactionStatus::parse(raw)
                .ok_or_else(|| AppError::validation(format!("unknown status {}", raw)))?,
        ),
    };

    let mut transactions = filter_by_date(&state.sheets.list_transactions().await?, &range);
    transactions.retain(|tx| {
        kind.map_or(true, |k| tx.kind == k)
            && status.map_or(true, |s| tx.status == s)
            && filter.item_id.as_deref().map_or(true, |id| tx.item_id == id)
    });
    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = filter.limit {
        transactions.truncate(limit);
    }

    Ok(Json(transactions))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<Transaction>> {
    let transaction = state.sheets.set_transaction_status(&id, update.status).await?;
    Ok(Json(transaction))
}
