//! # Redis
//!
//! Document store for the back office.
//!
//! Core purpose is to hold order and product documents and to keep the
//! daily income counters adjustable with atomic increments.
//!
//! ## Layout
//!
//! - `orders` hash: order id to JSON document
//! - `products` hash: product id to JSON document
//! - `ledger:{YYYY-MM-DD}` hash, one per day:
//!   - `q:{product_id}` holds the cumulative quantity sold (**int**, `HINCRBY`)
//!   - `r:{product_id}` holds the cumulative revenue (**float**, `HINCRBYFLOAT`)
//!
//! Ledger cells are only ever touched through increments, so two concurrent
//! order mutations hitting the same (day, product) pair cannot lose each
//! other's delta. Rows appear lazily on first increment and are never
//! deleted.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use crate::{
    models::{LedgerRow, Order, Product},
    store::{Store, StoreError},
};

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

const ORDERS_KEY: &str = "orders";
const PRODUCTS_KEY: &str = "products";

fn ledger_key(date: NaiveDate) -> String {
    format!("ledger:{date}")
}

fn quantity_field(product_id: &str) -> String {
    format!("q:{product_id}")
}

fn revenue_field(product_id: &str) -> String {
    format!("r:{product_id}")
}

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).unwrap();

    client
        .get_connection_manager_with_config(config)
        .await
        .unwrap()
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn put_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        let document = serde_json::to_string(order)?;
        let _: () = con.hset(ORDERS_KEY, &order.id, document).await?;
        Ok(())
    }

    async fn put_orders(&self, orders: &[Order]) -> Result<(), StoreError> {
        let mut pairs = Vec::with_capacity(orders.len());
        for order in orders {
            pairs.push((order.id.clone(), serde_json::to_string(order)?));
        }

        let mut con = self.connection.clone();
        let _: () = con.hset_multiple(ORDERS_KEY, &pairs).await?;
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let mut con = self.connection.clone();
        let raw: Option<String> = con.hget(ORDERS_KEY, id).await?;

        raw.map(|document| serde_json::from_str(&document).map_err(StoreError::from))
            .transpose()
    }

    async fn delete_order(&self, id: &str) -> Result<bool, StoreError> {
        let mut con = self.connection.clone();
        let removed: i64 = con.hdel(ORDERS_KEY, id).await?;
        Ok(removed > 0)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut con = self.connection.clone();
        let documents: Vec<String> = con.hvals(ORDERS_KEY).await?;

        documents
            .iter()
            .map(|document| serde_json::from_str(document).map_err(StoreError::from))
            .collect()
    }

    async fn put_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        let document = serde_json::to_string(product)?;
        let _: () = con.hset(PRODUCTS_KEY, &product.id, document).await?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut con = self.connection.clone();
        let documents: Vec<String> = con.hvals(PRODUCTS_KEY).await?;

        documents
            .iter()
            .map(|document| serde_json::from_str(document).map_err(StoreError::from))
            .collect()
    }

    async fn ledger_adjust(
        &self,
        date: NaiveDate,
        product_id: &str,
        quantity_delta: i64,
        revenue_delta: f64,
    ) -> Result<(), StoreError> {
        let key = ledger_key(date);
        let mut con = self.connection.clone();

        // Two independent atomic increments; no transaction across them.
        let _: i64 = con
            .hincr(&key, quantity_field(product_id), quantity_delta)
            .await?;
        let _: f64 = con
            .hincr(&key, revenue_field(product_id), revenue_delta)
            .await?;
        Ok(())
    }

    async fn ledger_rows(&self, date: NaiveDate) -> Result<Vec<LedgerRow>, StoreError> {
        let mut con = self.connection.clone();
        let fields: HashMap<String, String> = con.hgetall(ledger_key(date)).await?;

        let mut rows: HashMap<String, LedgerRow> = HashMap::new();
        for (field, value) in &fields {
            let Some((kind, product_id)) = field.split_once(':') else {
                continue;
            };
            let row = rows
                .entry(product_id.to_string())
                .or_insert_with(|| LedgerRow {
                    product_id: product_id.to_string(),
                    quantity_sold: 0,
                    total_revenue: 0.0,
                });
            match kind {
                "q" => {
                    row.quantity_sold = value
                        .parse()
                        .map_err(|_| StoreError::Corrupt(format!("ledger field {field}")))?;
                }
                "r" => {
                    row.total_revenue = value
                        .parse()
                        .map_err(|_| StoreError::Corrupt(format!("ledger field {field}")))?;
                }
                _ => {}
            }
        }

        Ok(rows.into_values().collect())
    }

    async fn ledger_row(
        &self,
        date: NaiveDate,
        product_id: &str,
    ) -> Result<Option<LedgerRow>, StoreError> {
        let mut con = self.connection.clone();
        let (quantity, revenue): (Option<i64>, Option<f64>) = con
            .hget(
                ledger_key(date),
                &[quantity_field(product_id), revenue_field(product_id)],
            )
            .await?;

        if quantity.is_none() && revenue.is_none() {
            return Ok(None);
        }

        Ok(Some(LedgerRow {
            product_id: product_id.to_string(),
            quantity_sold: quantity.unwrap_or(0),
            total_revenue: revenue.unwrap_or(0.0),
        }))
    }
}
