//! Storage seam for the order/ledger subsystem.
//!
//! Handlers talk to a [`Store`] trait object so the same logic runs against
//! Redis in production and [`MemoryStore`] in tests. The ledger operation is
//! a single atomic "increment by delta" per (date, product) cell, which is
//! what keeps concurrent mutations from losing each other's updates at the
//! cell level. The order write and its ledger adjustment are still two
//! separate calls with no transaction around them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{LedgerRow, Order, Product};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Backend(String),

    #[error("corrupt document: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn put_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Single-operation insert used by the bulk path.
    async fn put_orders(&self, orders: &[Order]) -> Result<(), StoreError>;

    async fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// Returns whether a record was actually removed.
    async fn delete_order(&self, id: &str) -> Result<bool, StoreError>;

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    async fn put_product(&self, product: &Product) -> Result<(), StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Atomically increments the (date, product) ledger cell by the given
    /// deltas, creating the row from zero if it does not exist yet.
    async fn ledger_adjust(
        &self,
        date: NaiveDate,
        product_id: &str,
        quantity_delta: i64,
        revenue_delta: f64,
    ) -> Result<(), StoreError>;

    async fn ledger_rows(&self, date: NaiveDate) -> Result<Vec<LedgerRow>, StoreError>;

    async fn ledger_row(
        &self,
        date: NaiveDate,
        product_id: &str,
    ) -> Result<Option<LedgerRow>, StoreError>;
}

/// In-memory backend for the test suite.
///
/// `fail_ledger_after` counts down on every `ledger_adjust` call and makes
/// the call fail once it reaches zero, so tests can exercise the
/// partial-adjustment path without a real backend outage.
#[derive(Default)]
pub struct MemoryStore {
    orders: Mutex<HashMap<String, Order>>,
    products: Mutex<HashMap<String, Product>>,
    ledger: Mutex<HashMap<(NaiveDate, String), (i64, f64)>>,
    pub fail_ledger_after: AtomicI64,
    pub ledger_calls: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            fail_ledger_after: AtomicI64::new(i64::MAX),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_order(&self, order: &Order) -> Result<(), StoreError> {
        self.orders
            .lock()
            .await
            .insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn put_orders(&self, orders: &[Order]) -> Result<(), StoreError> {
        let mut map = self.orders.lock().await;
        for order in orders {
            map.insert(order.id.clone(), order.clone());
        }
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.lock().await.get(id).cloned())
    }

    async fn delete_order(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.orders.lock().await.remove(id).is_some())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.orders.lock().await.values().cloned().collect())
    }

    async fn put_product(&self, product: &Product) -> Result<(), StoreError> {
        self.products
            .lock()
            .await
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.lock().await.values().cloned().collect())
    }

    async fn ledger_adjust(
        &self,
        date: NaiveDate,
        product_id: &str,
        quantity_delta: i64,
        revenue_delta: f64,
    ) -> Result<(), StoreError> {
        self.ledger_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_ledger_after.fetch_sub(1, Ordering::Relaxed) <= 0 {
            return Err(StoreError::Backend("ledger adjustment refused".to_string()));
        }

        let mut ledger = self.ledger.lock().await;
        let cell = ledger
            .entry((date, product_id.to_string()))
            .or_insert((0, 0.0));
        cell.0 += quantity_delta;
        cell.1 += revenue_delta;
        Ok(())
    }

    async fn ledger_rows(&self, date: NaiveDate) -> Result<Vec<LedgerRow>, StoreError> {
        Ok(self
            .ledger
            .lock()
            .await
            .iter()
            .filter(|((day, _), _)| *day == date)
            .map(|((_, product_id), (quantity, revenue))| LedgerRow {
                product_id: product_id.clone(),
                quantity_sold: *quantity,
                total_revenue: *revenue,
            })
            .collect())
    }

    async fn ledger_row(
        &self,
        date: NaiveDate,
        product_id: &str,
    ) -> Result<Option<LedgerRow>, StoreError> {
        Ok(self
            .ledger
            .lock()
            .await
            .get(&(date, product_id.to_string()))
            .map(|(quantity, revenue)| LedgerRow {
                product_id: product_id.to_string(),
                quantity_sold: *quantity,
                total_revenue: *revenue,
            }))
    }
}
