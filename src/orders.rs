//! Order lifecycle.
//!
//! The one invariant owned here: whenever an order's content is written, the
//! daily income ledger is adjusted to match. Create applies the content with
//! sign +1, delete reverses it with -1, and a full update reverses the old
//! content before applying the new one. Status-only writes never touch the
//! ledger.
//!
//! The order write and the ledger adjustment are two separate store calls.
//! Once the order write has succeeded the mutation is treated as committed:
//! a ledger failure after that point is logged as drift and the client still
//! gets the saved order back.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;
use uuid::Uuid;

use crate::{
    catalog::product_map,
    error::AppError,
    ledger::{apply_contribution, today},
    models::{LineItem, Order, OrderPayload, OrderStatus, Product},
    state::AppState,
    store::Store,
};

/// Turns a validated payload into a persistable order, snapshotting catalog
/// prices into the line items. Unknown product references come back as
/// field errors.
fn build_order(
    id: String,
    payload: &OrderPayload,
    products: &HashMap<String, Product>,
    status: OrderStatus,
) -> Result<Order, Vec<String>> {
    let mut errors = Vec::new();
    let mut content = Vec::with_capacity(payload.order_content.len());

    for (index, item) in payload.order_content.iter().enumerate() {
        let Some(product) = products.get(&item.product_id) else {
            errors.push(format!(
                "orderContent[{index}].product_id: unknown product {}",
                item.product_id
            ));
            continue;
        };
        content.push(LineItem {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            // Caller-supplied line subtotal wins; otherwise unit price x quantity.
            price: item
                .price
                .unwrap_or(product.price * item.quantity as f64),
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // An explicit totalPrice overrides the computed sum, discounts included.
    let total_price = payload
        .total_price
        .unwrap_or_else(|| content.iter().map(|item| item.price).sum());
    let advance = if payload.has_advance_payment {
        payload.advance_amount.unwrap_or(0.0)
    } else {
        0.0
    };

    Ok(Order {
        id,
        customer_name: payload.customer_name.trim().to_string(),
        customer_phone_number: payload.customer_phone_number.trim().to_string(),
        pickup_date: payload.pickup_date.unwrap_or_default(),
        pickup_time: payload.pickup_time.clone().unwrap_or_default(),
        status: payload
            .status
            .as_deref()
            .and_then(|s| OrderStatus::from_str(s).ok())
            .unwrap_or(status),
        order_content: content,
        total_price,
        has_advance_payment: payload.has_advance_payment,
        advance_amount: advance,
        remaining_amount: total_price - advance,
        description: payload.description.clone(),
    })
}

pub async fn create_order(
    store: &dyn Store,
    date: NaiveDate,
    payload: OrderPayload,
) -> Result<Order, AppError> {
    let errors = payload.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let products = product_map(store).await?;
    let order = build_order(
        Uuid::new_v4().to_string(),
        &payload,
        &products,
        OrderStatus::default(),
    )
    .map_err(AppError::Validation)?;

    store.put_order(&order).await?;

    if let Err(cause) = apply_contribution(store, date, &order.order_content, 1).await {
        error!(
            "ledger drift: order {} committed but its contribution was not fully applied: {cause}",
            order.id
        );
    }

    Ok(order)
}

/// Batch intake. Every order is validated up front and all field errors are
/// aggregated before anything is written; the catalog is read once for the
/// whole batch. Ledger contributions go through the same primitive as
/// single creation.
pub async fn create_many_orders(
    store: &dyn Store,
    date: NaiveDate,
    payloads: Vec<OrderPayload>,
) -> Result<Vec<Order>, AppError> {
    let mut errors = Vec::new();
    for (index, payload) in payloads.iter().enumerate() {
        for message in payload.validate() {
            errors.push(format!("orders[{index}].{message}"));
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let products = product_map(store).await?;
    let mut orders = Vec::with_capacity(payloads.len());
    for (index, payload) in payloads.iter().enumerate() {
        match build_order(
            Uuid::new_v4().to_string(),
            payload,
            &products,
            OrderStatus::default(),
        ) {
            Ok(order) => orders.push(order),
            Err(messages) => {
                errors.extend(messages.into_iter().map(|m| format!("orders[{index}].{m}")));
            }
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    store.put_orders(&orders).await?;

    for order in &orders {
        if let Err(cause) = apply_contribution(store, date, &order.order_content, 1).await {
            error!(
                "ledger drift: order {} committed but its contribution was not fully applied: {cause}",
                order.id
            );
        }
    }

    Ok(orders)
}

pub async fn update_order(
    store: &dyn Store,
    date: NaiveDate,
    id: &str,
    payload: OrderPayload,
) -> Result<Order, AppError> {
    let old = store
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::OrderNotFound(id.to_string()))?;

    let errors = payload.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let products = product_map(store).await?;
    // A full edit that omits status keeps the stored one.
    let order = build_order(old.id.clone(), &payload, &products, old.status)
        .map_err(AppError::Validation)?;

    store.put_order(&order).await?;

    if old.order_content != order.order_content {
        // Reverse the old contribution, then apply the new one. Both passes
        // land on today's ledger, whatever day the old content was applied.
        if let Err(cause) = apply_contribution(store, date, &old.order_content, -1).await {
            error!(
                "ledger drift: order {} updated but its old contribution was not fully reversed: {cause}",
                order.id
            );
        }
        if let Err(cause) = apply_contribution(store, date, &order.order_content, 1).await {
            error!(
                "ledger drift: order {} updated but its new contribution was not fully applied: {cause}",
                order.id
            );
        }
    }

    Ok(order)
}

pub async fn update_order_status(
    store: &dyn Store,
    id: &str,
    status: &str,
) -> Result<Order, AppError> {
    let status = OrderStatus::from_str(status).map_err(|e| AppError::Validation(vec![e]))?;

    let mut order = store
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::OrderNotFound(id.to_string()))?;

    order.status = status;
    store.put_order(&order).await?;

    Ok(order)
}

pub async fn delete_order(store: &dyn Store, date: NaiveDate, id: &str) -> Result<Order, AppError> {
    let order = store
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::OrderNotFound(id.to_string()))?;

    apply_contribution(store, date, &order.order_content, -1).await?;
    store.delete_order(id).await?;

    Ok(order)
}

#[derive(Debug, Serialize)]
pub struct LineItemView {
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: String,
    pub customer_name: String,
    pub customer_phone_number: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: String,
    pub status: OrderStatus,
    pub order_content: Vec<LineItemView>,
    pub total_price: f64,
    pub has_advance_payment: bool,
    pub advance_amount: f64,
    pub remaining_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn enrich(order: Order, products: &HashMap<String, Product>) -> OrderView {
    let order_content = order
        .order_content
        .into_iter()
        .map(|item| LineItemView {
            product_name: products.get(&item.product_id).map(|p| p.name.clone()),
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
        })
        .collect();

    OrderView {
        id: order.id,
        customer_name: order.customer_name,
        customer_phone_number: order.customer_phone_number,
        pickup_date: order.pickup_date,
        pickup_time: order.pickup_time,
        status: order.status,
        order_content,
        total_price: order.total_price,
        has_advance_payment: order.has_advance_payment,
        advance_amount: order.advance_amount,
        remaining_amount: order.remaining_amount,
        description: order.description,
    }
}

async fn list_orders_in_range(
    store: &dyn Store,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<OrderView>, AppError> {
    let mut orders = store.list_orders().await?;
    orders.retain(|order| {
        start.is_none_or(|s| order.pickup_date >= s) && end.is_none_or(|e| order.pickup_date <= e)
    });
    orders.sort_by(|a, b| {
        (a.pickup_date, a.pickup_time.as_str()).cmp(&(b.pickup_date, b.pickup_time.as_str()))
    });

    let products = product_map(store).await?;
    Ok(orders
        .into_iter()
        .map(|order| enrich(order, &products))
        .collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub status: String,
}

pub async fn get_orders_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    let orders = list_orders_in_range(state.store.as_ref(), None, None).await?;
    Ok(Json(orders))
}

pub async fn get_orders_by_date_handler(
    State(state): State<Arc<AppState>>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    let orders =
        list_orders_in_range(state.store.as_ref(), range.start_date, range.end_date).await?;
    Ok(Json(orders))
}

pub async fn get_order_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, AppError> {
    let order = state
        .store
        .get_order(&id)
        .await?
        .ok_or(AppError::OrderNotFound(id))?;

    let products = product_map(state.store.as_ref()).await?;
    Ok(Json(enrich(order, &products)))
}

pub async fn create_order_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OrderPayload>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = create_order(state.store.as_ref(), today(), payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn create_many_orders_handler(
    State(state): State<Arc<AppState>>,
    Json(payloads): Json<Vec<OrderPayload>>,
) -> Result<(StatusCode, Json<Vec<Order>>), AppError> {
    let orders = create_many_orders(state.store.as_ref(), today(), payloads).await?;
    Ok((StatusCode::CREATED, Json(orders)))
}

pub async fn update_order_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<OrderPayload>,
) -> Result<Json<Order>, AppError> {
    let order = update_order(state.store.as_ref(), today(), &id, payload).await?;
    Ok(Json(order))
}

pub async fn update_order_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<Order>, AppError> {
    let order = update_order_status(state.store.as_ref(), &id, &payload.status).await?;
    Ok(Json(order))
}

pub async fn delete_order_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let order = delete_order(state.store.as_ref(), today(), &id).await?;
    Ok(Json(json!({ "message": "Order deleted", "id": order.id })))
}
