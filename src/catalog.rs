//! Product catalog boundary.
//!
//! The order paths only need "find by id, give me price and name"; orders
//! snapshot the price at save time, so later catalog edits never touch
//! existing orders.

use std::{collections::HashMap, sync::Arc};

use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Product, ProductPayload},
    state::AppState,
    store::{Store, StoreError},
};

/// One lookup for a whole request, keyed by product id.
pub async fn product_map(store: &dyn Store) -> Result<HashMap<String, Product>, StoreError> {
    Ok(store
        .list_products()
        .await?
        .into_iter()
        .map(|product| (product.id.clone(), product))
        .collect())
}

pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Product>>, AppError> {
    let mut products = state.store.list_products().await?;
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(products))
}

pub async fn create_product_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let errors = payload.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: payload.name.trim().to_string(),
        price: payload.price.unwrap_or(0.0),
        category: payload.category,
        available: payload.available.unwrap_or(true),
    };
    state.store.put_product(&product).await?;

    Ok((StatusCode::CREATED, Json(product)))
}
