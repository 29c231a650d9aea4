use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{SaleDetails, SaleLine, Transaction},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SaleRequest {
    pub items: Vec<SaleLine>,
    #[serde(flatten)]
    pub details: SaleDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub transactions: Vec<Transaction>,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub items_sold: i64,
}

/// Checkout. Every line is checked against stock before anything is written.
pub async fn record_sale(
    State(state): State<AppState>,
    Json(request): Json<SaleRequest>,
) -> AppResult<(StatusCode, Json<SaleResponse>)> {
    let transactions = state.sheets.record_sale(request.items, request.details).await?;

    let total_revenue = transactions.iter().map(|tx| tx.total_revenue).sum();
    let total_profit = transactions.iter().map(|tx| tx.profit).sum();
    let items_sold = transactions.iter().map(|tx| tx.quantity).sum();

    Ok((
        StatusCode::CREATED,
        Json(SaleResponse {
            transactions,
            total_revenue,
            total_profit,
            items_sold,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::handlers::test_support::{get, send_json, TestApp};
    use crate::models::{inventory, transaction, Role};
    use crate::reports::fixtures::item;

    #[tokio::test]
    async fn sale_decrements_stock_and_records_each_line() {
        let app = TestApp::new();
        app.add_item(item("a", "Drinks", 10, 2)).await;
        app.add_item(item("b", "Snacks", 4, 2)).await;
        let token = app.token(Role::Operations);

        let (status, body) = app
            .send(send_json(
                Method::POST,
                "/api/sales",
                &token,
                json!({
                    "items": [
                        { "itemId": "a", "quantity": 3 },
                        { "itemId": "b", "quantity": 1, "sellingPrice": 25 }
                    ],
                    "department": "Shopee",
                    "paymentMethod": "QRIS"
                }),
            ))
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
        assert_eq!(body["totalRevenue"].as_f64(), Some(85.0));
        assert_eq!(body["itemsSold"], 4);
        assert_eq!(body["transactions"][0]["department"], "Shopee");
        assert_eq!(body["transactions"][1]["paymentMethod"], "QRIS");

        let (_, a) = app.send(get("/api/items/a", &token)).await;
        assert_eq!(a["quantity"], 7);
    }

    #[tokio::test]
    async fn insufficient_stock_writes_nothing() {
        let app = TestApp::new();
        app.add_item(item("a", "Drinks", 10, 2)).await;
        app.add_item(item("b", "Snacks", 1, 2)).await;
        let token = app.token(Role::Operations);
        let inventory_before = app.store.snapshot(inventory::SHEET);

        let (status, body) = app
            .send(send_json(
                Method::POST,
                "/api/sales",
                &token,
                json!({ "items": [
                    { "itemId": "a", "quantity": 2 },
                    { "itemId": "b", "quantity": 5 }
                ] }),
            ))
            .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("insufficient stock"));
        assert_eq!(app.store.snapshot(inventory::SHEET), inventory_before);
        assert_eq!(app.store.snapshot(transaction::SHEET).len(), 1);
    }

    #[tokio::test]
    async fn checkout_cannot_be_recorded_as_cancelled() {
        let app = TestApp::new();
        app.add_item(item("a", "Drinks", 5, 2)).await;
        let token = app.token(Role::Operations);
        let transactions_before = app.store.snapshot(transaction::SHEET);

        let (status, body) = app
            .send(send_json(
                Method::POST,
                "/api/sales",
                &token,
                json!({ "items": [{ "itemId": "a", "quantity": 3 }], "status": "cancelled" }),
            ))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("cancelled"));
        let (_, a) = app.send(get("/api/items/a", &token)).await;
        assert_eq!(a["quantity"], 5);
        assert_eq!(app.store.snapshot(transaction::SHEET), transactions_before);
    }

    #[tokio::test]
    async fn empty_checkout_is_a_validation_error() {
        let app = TestApp::new();
        let token = app.token(Role::Operations);
        let (status, _) = app
            .send(send_json(Method::POST, "/api/sales", &token, json!({ "items": [] })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
