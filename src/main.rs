mod config;
mod error;
mod export;
mod handlers;
mod middleware;
mod models;
mod reports;
mod sheets;
mod state;
mod utils;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use dotenvy::dotenv;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env()?;
    let state = AppState::from_config(&config)?;

    // Build the application router
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    log::info!("stockroom listening on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    // Protected routes (session and role checked by the permission middleware)
    let api = Router::new()
        // Inventory
        .route(
            "/api/items",
            get(handlers::items::list_items).post(handlers::items::create_item),
        )
        .route(
            "/api/items/:id",
            get(handlers::items::get_item)
                .put(handlers::items::update_item)
                .delete(handlers::items::delete_item),
        )
        .route("/api/items/:id/restock", post(handlers::items::restock_item))
        // Point of sale
        .route("/api/sales", post(handlers::sales::record_sale))
        .route("/api/transactions", get(handlers::transactions::list_transactions))
        .route(
            "/api/transactions/:id/status",
            put(handlers::transactions::update_status),
        )
        // Reporting
        .route("/api/reports", get(handlers::reports::sales_report))
        .route("/api/reports/calendar", get(handlers::reports::sales_calendar))
        .route("/api/reports/export", get(handlers::reports::export_report))
        .route("/api/dashboard", get(handlers::dashboard::dashboard))
        .route("/api/alerts", get(handlers::alerts::list_alerts))
        .route("/api/departments", get(handlers::departments::list_departments))
        .route("/api/departments/:id", get(handlers::departments::get_department))
        .route("/api/analytics", get(handlers::analytics::analytics))
        // Accounts
        .route(
            "/api/accounts",
            get(handlers::accounts::list_accounts).put(handlers::accounts::update_account),
        )
        .route("/api/auth/me", get(handlers::auth::me))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_permission,
        ));

    Router::new()
        // Public routes
        .route("/health", get(handlers::health))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .merge(api)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
