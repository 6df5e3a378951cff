//! Lunchette back office.
//!
//! Order intake for a lunch counter: customers phone in pickup orders, the
//! staff tracks them through `notready -> ready -> payed`, and every content
//! mutation keeps a per-day income ledger in sync as a side effect.
//!
//! # General Infrastructure
//! - One axum server, JSON in and out, consumed by the front end
//! - Redis holds the documents; see [`database`] for the layout
//! - The ledger is adjusted with atomic increments, so concurrent mutations
//!   of the same (day, product) cell cannot lose each other's delta
//! - The order write and its ledger adjustment are two separate calls with
//!   no transaction around them; drift is logged, not repaired
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, patch, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod models;
pub mod orders;
pub mod state;
pub mod store;

use std::sync::Arc;

use catalog::{create_product_handler, list_products_handler};
use ledger::{daily_income_handler, daily_income_product_handler};
use orders::{
    create_many_orders_handler, create_order_handler, delete_order_handler, get_order_handler,
    get_orders_by_date_handler, get_orders_handler, update_order_handler,
    update_order_status_handler,
};
use state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route(
            "/api/orders",
            get(get_orders_handler).post(create_order_handler),
        )
        .route("/api/orders/by-date", get(get_orders_by_date_handler))
        .route("/api/orders/bulk", post(create_many_orders_handler))
        .route(
            "/api/orders/{id}",
            get(get_order_handler)
                .put(update_order_handler)
                .delete(delete_order_handler),
        )
        .route("/api/orders/{id}/status", patch(update_order_status_handler))
        .route("/api/stats/daily-income", get(daily_income_handler))
        .route(
            "/api/stats/daily-income/{product_id}",
            get(daily_income_product_handler),
        )
        .route(
            "/api/products",
            get(list_products_handler).post(create_product_handler),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = app(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
