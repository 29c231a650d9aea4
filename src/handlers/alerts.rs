use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    error::AppResult,
    reports::alerts::{stock_alerts, AlertLevel, StockAlert},
    state::AppState,
};

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCounts {
    pub out_of_stock: usize,
    pub critical: usize,
    pub low: usize,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub counts: AlertCounts,
    pub alerts: Vec<StockAlert>,
}

pub async fn list_alerts(State(state): State<AppState>) -> AppResult<Json<AlertsResponse>> {
    let alerts = stock_alerts(&state.sheets.list_items().await?);

    let mut counts = AlertCounts::default();
    for alert in &alerts {
        match alert.level {
            AlertLevel::OutOfStock => counts.out_of_stock += 1,
            AlertLevel::Critical => counts.critical += 1,
            AlertLevel::Low => counts.low += 1,
        }
    }

    Ok(Json(AlertsResponse { counts, alerts }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::handlers::test_support::{get, TestApp};
    use crate::models::Role;
    use crate::reports::fixtures::item;

    #[tokio::test]
    async fn counts_each_level() {
        let app = TestApp::new();
        app.add_item(item("out", "X", 0, 10)).await;
        app.add_item(item("crit", "X", 3, 10)).await;
        app.add_item(item("low", "X", 8, 10)).await;
        app.add_item(item("fine", "X", 30, 10)).await;

        let (status, body) = app.send(get("/api/alerts", &app.token(Role::Operations))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["counts"]["outOfStock"], 1);
        assert_eq!(body["counts"]["critical"], 1);
        assert_eq!(body["counts"]["low"], 1);
        assert_eq!(body["alerts"][0]["itemId"], "out");
        assert_eq!(body["alerts"][0]["level"], "out_of_stock");
    }
}
