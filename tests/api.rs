use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use lunchette::{app, state::AppState, store::MemoryStore};

fn test_app() -> Router {
    app(AppState::with_store(Arc::new(MemoryStore::new())))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

async fn seed_product(app: &Router, name: &str, price: f64) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/products",
        Some(json!({ "name": name, "price": price })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

fn order_body(product_id: &str, quantity: i64) -> Value {
    json!({
        "customerName": "Ana",
        "customerPhoneNumber": "0712345678",
        "pickupDate": "2026-09-01",
        "pickupTime": "12:30",
        "orderContent": [{ "product_id": product_id, "quantity": quantity }]
    })
}

#[tokio::test]
async fn create_then_list_resolves_product_names() {
    let app = test_app();
    let quiche = seed_product(&app, "Quiche", 10.0).await;

    let (status, created) =
        send(&app, "POST", "/api/orders", Some(order_body(&quiche, 2))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "notready");
    assert_eq!(created["totalPrice"], json!(20.0));
    assert_eq!(created["remainingAmount"], json!(20.0));
    assert_eq!(created["orderContent"][0]["price"], json!(20.0));

    let (status, listed) = send(&app, "GET", "/api/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["orderContent"][0]["product_name"], "Quiche");

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/api/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["customerName"], "Ana");
}

#[tokio::test]
async fn by_date_filter_is_inclusive() {
    let app = test_app();
    let quiche = seed_product(&app, "Quiche", 10.0).await;

    let mut early = order_body(&quiche, 1);
    early["pickupDate"] = json!("2026-09-01");
    let mut late = order_body(&quiche, 1);
    late["pickupDate"] = json!("2026-09-05");
    for body in [early, late] {
        let (status, _) = send(&app, "POST", "/api/orders", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, hits) = send(
        &app,
        "GET",
        "/api/orders/by-date?startDate=2026-09-01&endDate=2026-09-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let (_, all) = send(&app, "GET", "/api/orders/by-date", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn validation_errors_come_back_as_field_details() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({ "customerName": "Ana" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    let details = body["details"].as_array().unwrap();
    assert!(details.iter().any(|d| d.as_str().unwrap().starts_with("customerPhoneNumber")));
    assert!(details.iter().any(|d| d.as_str().unwrap().starts_with("orderContent")));
}

#[tokio::test]
async fn missing_order_is_a_404_with_json_body() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/api/orders/nope", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Order nope not found");
}

#[tokio::test]
async fn status_patch_accepts_known_values_only() {
    let app = test_app();
    let quiche = seed_product(&app, "Quiche", 10.0).await;

    let (_, created) = send(&app, "POST", "/api/orders", Some(order_body(&quiche, 1))).await;
    let id = created["id"].as_str().unwrap();

    let (status, patched) = send(
        &app,
        "PATCH",
        &format!("/api/orders/{id}/status"),
        Some(json!({ "status": "ready" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["status"], "ready");

    let (status, rejected) = send(
        &app,
        "PATCH",
        &format!("/api/orders/{id}/status"),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(rejected["details"][0]
        .as_str()
        .unwrap()
        .contains("notready, ready, payed"));
}

#[tokio::test]
async fn daily_income_tracks_the_order_lifecycle() {
    let app = test_app();
    let quiche = seed_product(&app, "Quiche", 10.0).await;
    let lemonade = seed_product(&app, "Lemonade", 5.0).await;

    let mut body = order_body(&quiche, 2);
    body["orderContent"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "product_id": lemonade, "quantity": 3 }));
    let (_, created) = send(&app, "POST", "/api/orders", Some(body)).await;
    let id = created["id"].as_str().unwrap();

    let (status, income) = send(&app, "GET", "/api/stats/daily-income", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(income["totalQuantity"], json!(5));
    assert_eq!(income["totalRevenue"], json!(35.0));
    let rows = income["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r["productName"] == "Quiche"
        && r["quantitySold"] == json!(2)
        && r["totalRevenue"] == json!(20.0)));

    let (status, deleted) = send(&app, "DELETE", &format!("/api/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Order deleted");

    let (_, income) = send(&app, "GET", "/api/stats/daily-income", None).await;
    assert_eq!(income["totalQuantity"], json!(0));
    assert_eq!(income["totalRevenue"], json!(0.0));
}

#[tokio::test]
async fn per_product_income_falls_back_to_a_zero_placeholder() {
    let app = test_app();

    let (status, row) = send(
        &app,
        "GET",
        "/api/stats/daily-income/ghost?date=2026-08-28",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        row,
        json!({ "productId": "ghost", "quantitySold": 0, "totalRevenue": 0.0 })
    );
}

#[tokio::test]
async fn bulk_create_persists_all_orders_and_their_income() {
    let app = test_app();
    let quiche = seed_product(&app, "Quiche", 10.0).await;

    let (status, created) = send(
        &app,
        "POST",
        "/api/orders/bulk",
        Some(json!([order_body(&quiche, 1), order_body(&quiche, 2)])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.as_array().unwrap().len(), 2);

    let (_, listed) = send(&app, "GET", "/api/orders", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let (_, income) = send(&app, "GET", "/api/stats/daily-income", None).await;
    assert_eq!(income["totalQuantity"], json!(3));
    assert_eq!(income["totalRevenue"], json!(30.0));
}

#[tokio::test]
async fn product_creation_validates_its_fields() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(json!({ "price": -1.0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_array().unwrap();
    assert!(details.iter().any(|d| d.as_str().unwrap().starts_with("name")));
    assert!(details.iter().any(|d| d.as_str().unwrap().starts_with("price")));
}
