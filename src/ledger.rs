//! Daily income ledger.
//!
//! One cumulative (day, product) counter pair per row, maintained purely as
//! a side effect of order mutations. Everything goes through
//! [`apply_contribution`]: create passes `+1`, delete passes `-1`, and a
//! full update reverses the old content before applying the new one.
//!
//! Rows are keyed by the day the mutating call runs on, not the order's
//! pickup date. A reversal against a row that never existed creates the row
//! with negative values; nothing clamps or repairs the counters.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::product_map,
    error::AppError,
    models::{LedgerRow, LineItem},
    state::AppState,
    store::{Store, StoreError},
};

/// The day a mutation lands on in the ledger.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Applies an order's content to the ledger with the given sign (+1 or -1).
///
/// Each line item is adjusted independently; a failure partway through
/// leaves the earlier items applied.
pub async fn apply_contribution(
    store: &dyn Store,
    date: NaiveDate,
    content: &[LineItem],
    sign: i64,
) -> Result<(), StoreError> {
    for item in content {
        store
            .ledger_adjust(
                date,
                &item.product_id,
                sign * item.quantity,
                sign as f64 * item.price,
            )
            .await?;
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyIncomeRow {
    pub product_id: String,
    pub product_name: Option<String>,
    pub quantity_sold: i64,
    pub total_revenue: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyIncomeResponse {
    pub date: NaiveDate,
    pub rows: Vec<DailyIncomeRow>,
    pub total_quantity: i64,
    pub total_revenue: f64,
}

pub async fn daily_income_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Result<Json<DailyIncomeResponse>, AppError> {
    let date = query.date.unwrap_or_else(today);

    let ledger = state.store.ledger_rows(date).await?;
    let products = product_map(state.store.as_ref()).await?;

    let mut rows: Vec<DailyIncomeRow> = ledger
        .into_iter()
        .map(|row| DailyIncomeRow {
            product_name: products.get(&row.product_id).map(|p| p.name.clone()),
            product_id: row.product_id,
            quantity_sold: row.quantity_sold,
            total_revenue: row.total_revenue,
        })
        .collect();
    rows.sort_by(|a, b| a.product_id.cmp(&b.product_id));

    let total_quantity = rows.iter().map(|row| row.quantity_sold).sum();
    let total_revenue = rows.iter().map(|row| row.total_revenue).sum();

    Ok(Json(DailyIncomeResponse {
        date,
        rows,
        total_quantity,
        total_revenue,
    }))
}

pub async fn daily_income_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Json<LedgerRow>, AppError> {
    let date = query.date.unwrap_or_else(today);

    let row = state
        .store
        .ledger_row(date, &product_id)
        .await?
        // Zero-valued placeholder when the product has not sold that day.
        .unwrap_or(LedgerRow {
            product_id,
            quantity_sold: 0,
            total_revenue: 0.0,
        });

    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn item(product_id: &str, quantity: i64, price: f64) -> LineItem {
        LineItem {
            product_id: product_id.to_string(),
            quantity,
            price,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 28).unwrap()
    }

    #[tokio::test]
    async fn positive_then_negative_contribution_cancels_out() {
        let store = MemoryStore::new();
        let content = vec![item("p1", 2, 20.0), item("p2", 1, 5.0)];

        apply_contribution(&store, day(), &content, 1).await.unwrap();
        apply_contribution(&store, day(), &content, -1)
            .await
            .unwrap();

        let p1 = store.ledger_row(day(), "p1").await.unwrap().unwrap();
        assert_eq!(p1.quantity_sold, 0);
        assert_eq!(p1.total_revenue, 0.0);
        let p2 = store.ledger_row(day(), "p2").await.unwrap().unwrap();
        assert_eq!(p2.quantity_sold, 0);
        assert_eq!(p2.total_revenue, 0.0);
    }

    #[tokio::test]
    async fn reversal_against_missing_row_creates_negative_row() {
        let store = MemoryStore::new();

        apply_contribution(&store, day(), &[item("ghost", 3, 12.0)], -1)
            .await
            .unwrap();

        let row = store.ledger_row(day(), "ghost").await.unwrap().unwrap();
        assert_eq!(row.quantity_sold, -3);
        assert_eq!(row.total_revenue, -12.0);
    }

    #[tokio::test]
    async fn repeated_line_items_for_one_product_accumulate() {
        let store = MemoryStore::new();
        let content = vec![item("p1", 2, 20.0), item("p1", 1, 10.0)];

        apply_contribution(&store, day(), &content, 1).await.unwrap();

        let row = store.ledger_row(day(), "p1").await.unwrap().unwrap();
        assert_eq!(row.quantity_sold, 3);
        assert_eq!(row.total_revenue, 30.0);
    }

    #[tokio::test]
    async fn failure_partway_leaves_earlier_items_applied() {
        let store = MemoryStore::new();
        store
            .fail_ledger_after
            .store(1, std::sync::atomic::Ordering::Relaxed);
        let content = vec![item("p1", 1, 10.0), item("p2", 1, 5.0)];

        let result = apply_contribution(&store, day(), &content, 1).await;

        assert!(result.is_err());
        let p1 = store.ledger_row(day(), "p1").await.unwrap().unwrap();
        assert_eq!(p1.quantity_sold, 1);
        assert!(store.ledger_row(day(), "p2").await.unwrap().is_none());
    }
}
