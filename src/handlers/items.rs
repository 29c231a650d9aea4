use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{InventoryItem, ItemPatch, NewItem, Transaction},
    sheets::client::new_id,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockRequest {
    pub amount: i64,
    pub cost_price: Option<Decimal>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RestockResponse {
    pub item: InventoryItem,
    pub transaction: Transaction,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let mut items = state.sheets.list_items().await?;

    if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        items.retain(|item| item.category.eq_ignore_ascii_case(category.trim()));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        items.retain(|item| {
            item.name.to_lowercase().contains(&needle) || item.sku.to_lowercase().contains(&needle)
        });
    }

    Ok(Json(items))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(new_item): Json<NewItem>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    new_item.validate().map_err(AppError::Validation)?;
    let item = state
        .sheets
        .create_item(new_item.into_item(new_id(), Utc::now()))
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<InventoryItem>> {
    Ok(Json(state.sheets.get_item(&id).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ItemPatch>,
) -> AppResult<Json<InventoryItem>> {
    patch.validate().map_err(AppError::Validation)?;
    let item = state
        .sheets
        .update_item(&id, |item| {
            item.apply(patch);
            Ok(())
        })
        .await?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let item = state.sheets.delete_item(&id).await?;
    Ok(Json(json!({ "success": true, "id": item.id })))
}

pub async fn restock_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RestockRequest>,
) -> AppResult<Json<RestockResponse>> {
    if request.amount <= 0 {
        return Err(AppError::validation("amount must be positive"));
    }
    if request.cost_price.map_or(false, |p| p.is_sign_negative()) {
        return Err(AppError::validation("costPrice cannot be negative"));
    }

    let (item, transaction) = state
        .sheets
        .restock(&id, request.amount, request.cost_price, request.note)
        .await?;
    Ok(Json(RestockResponse { item, transaction }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::handlers::test_support::{get, send_json, TestApp};
    use crate::models::Role;
    use crate::reports::fixtures::item;

    #[tokio::test]
    async fn restock_adds_quantity_and_logs_one_transaction() {
        let app = TestApp::new();
        app.add_item(item("it-1", "Drinks", 5, 3)).await;
        let token = app.token(Role::Operations);

        let (status, body) = app
            .send(send_json(
                Method::POST,
                "/api/items/it-1/restock",
                &token,
                json!({ "amount": 10 }),
            ))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"]["quantity"], 15);
        assert_eq!(body["transaction"]["type"], "restock");

        let (_, txs) = app.send(get("/api/transactions", &token)).await;
        assert_eq!(txs.as_array().unwrap().len(), 1);
        assert_eq!(txs[0]["quantity"], 10);
    }

    #[tokio::test]
    async fn restock_rejects_non_positive_amounts() {
        let app = TestApp::new();
        app.add_item(item("it-1", "Drinks", 5, 3)).await;
        let token = app.token(Role::Admin);

        let (status, _) = app
            .send(send_json(Method::POST, "/api/items/it-1/restock", &token, json!({ "amount": 0 })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_validates_and_rejects_duplicate_sku() {
        let app = TestApp::new();
        let token = app.token(Role::Admin);
        let body = json!({ "name": "Kopi", "sku": "K-1", "quantity": 4, "sellingPrice": 12.5 });

        let (status, created) = app
            .send(send_json(Method::POST, "/api/items", &token, body.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["sellingPrice"], 12.5);
        assert!(created["id"].as_str().is_some());

        let (status, _) = app.send(send_json(Method::POST, "/api/items", &token, body)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, err) = app
            .send(send_json(
                Method::POST,
                "/api/items",
                &token,
                json!({ "name": "Bad", "sku": "B-1", "quantity": -1 }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"], "quantity cannot be negative");
    }

    #[tokio::test]
    async fn update_cannot_reuse_another_items_sku() {
        let app = TestApp::new();
        app.add_item(item("a", "Drinks", 5, 3)).await;
        app.add_item(item("b", "Drinks", 5, 3)).await;
        let token = app.token(Role::Admin);

        let (status, _) = app
            .send(send_json(Method::PUT, "/api/items/b", &token, json!({ "sku": "sku-a" })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, b) = app.send(get("/api/items/b", &token)).await;
        assert_eq!(b["sku"], "SKU-b");
    }

    #[tokio::test]
    async fn restock_that_would_overflow_is_refused() {
        let app = TestApp::new();
        app.add_item(item("it-1", "Drinks", 5, 3)).await;
        let token = app.token(Role::Admin);

        let (status, _) = app
            .send(send_json(
                Method::POST,
                "/api/items/it-1/restock",
                &token,
                json!({ "amount": i64::MAX }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, stored) = app.send(get("/api/items/it-1", &token)).await;
        assert_eq!(stored["quantity"], 5);
    }

    #[tokio::test]
    async fn list_filters_by_category_and_search() {
        let app = TestApp::new();
        app.add_item(item("a", "Drinks", 5, 3)).await;
        app.add_item(item("b", "Snacks", 5, 3)).await;
        app.add_item(item("c", "drinks", 5, 3)).await;
        let token = app.token(Role::Operations);

        let (_, drinks) = app.send(get("/api/items?category=Drinks", &token)).await;
        assert_eq!(drinks.as_array().unwrap().len(), 2);

        let (_, found) = app.send(get("/api/items?search=sku-b", &token)).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["id"], "b");
    }

    #[tokio::test]
    async fn update_and_delete_address_the_right_rows() {
        let app = TestApp::new();
        app.add_item(item("a", "Drinks", 1, 0)).await;
        app.add_item(item("b", "Drinks", 2, 0)).await;
        app.add_item(item("c", "Drinks", 3, 0)).await;
        let token = app.token(Role::Admin);

        let (status, _) = app
            .send(send_json(Method::DELETE, "/api/items/a", &token, json!({})))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, updated) = app
            .send(send_json(Method::PUT, "/api/items/c", &token, json!({ "quantity": 30 })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["quantity"], 30);

        let (_, b) = app.send(get("/api/items/b", &token)).await;
        assert_eq!(b["quantity"], 2);
        let (status, _) = app.send(get("/api/items/a", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn requests_without_a_session_are_refused() {
        let app = TestApp::new();
        let request = axum::http::Request::builder()
            .uri("/api/items")
            .body(axum::body::Body::empty())
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication required");
    }
}
