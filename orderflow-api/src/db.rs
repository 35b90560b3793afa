//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling with deadpool-postgres and the durable
//! [`OrderStore`] built on it. An order is spread over four tables (`orders`,
//! `deliveries`, `payments`, `items`) and always written in one transaction.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use orderflow_core::{Delivery, Item, Order, OrderflowResult, Payment, StorageError};
use orderflow_storage::OrderStore;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full connection string. Takes precedence over the discrete fields.
    pub url: Option<String>,
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait, create and recycle timeout for pooled connections
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            dbname: "orders".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("ORDERFLOW_DB_URL").ok().filter(|s| !s.trim().is_empty()),
            host: std::env::var("ORDERFLOW_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("ORDERFLOW_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("ORDERFLOW_DB_NAME").unwrap_or_else(|_| "orders".to_string()),
            user: std::env::var("ORDERFLOW_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("ORDERFLOW_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("ORDERFLOW_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("ORDERFLOW_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened here; use [`PgOrderStore::ping`] to check reachability.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        match &self.url {
            Some(url) => cfg.url = Some(url.clone()),
            None => {
                cfg.host = Some(self.host.clone());
                cfg.port = Some(self.port);
                cfg.dbname = Some(self.dbname.clone());
                cfg.user = Some(self.user.clone());
                cfg.password = Some(self.password.clone());
            }
        }

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size.max(1));
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        pool_cfg.timeouts.recycle = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SQL
// ============================================================================

const UPSERT_ORDER: &str = "\
INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature, customer_id, \
                    delivery_service, shardkey, sm_id, date_created, oof_shard) \
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
ON CONFLICT (order_uid) DO UPDATE SET \
    track_number = EXCLUDED.track_number, entry = EXCLUDED.entry, locale = EXCLUDED.locale, \
    internal_signature = EXCLUDED.internal_signature, customer_id = EXCLUDED.customer_id, \
    delivery_service = EXCLUDED.delivery_service, shardkey = EXCLUDED.shardkey, \
    sm_id = EXCLUDED.sm_id, date_created = EXCLUDED.date_created, oof_shard = EXCLUDED.oof_shard";

const UPSERT_DELIVERY: &str = "\
INSERT INTO deliveries (order_uid, name, phone, zip, city, address, region, email) \
VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
ON CONFLICT (order_uid) DO UPDATE SET \
    name = EXCLUDED.name, phone = EXCLUDED.phone, zip = EXCLUDED.zip, city = EXCLUDED.city, \
    address = EXCLUDED.address, region = EXCLUDED.region, email = EXCLUDED.email";

const UPSERT_PAYMENT: &str = "\
INSERT INTO payments (order_uid, transaction, request_id, currency, provider, amount, payment_dt, \
                      bank, delivery_cost, goods_total, custom_fee) \
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
ON CONFLICT (order_uid) DO UPDATE SET \
    transaction = EXCLUDED.transaction, request_id = EXCLUDED.request_id, \
    currency = EXCLUDED.currency, provider = EXCLUDED.provider, amount = EXCLUDED.amount, \
    payment_dt = EXCLUDED.payment_dt, bank = EXCLUDED.bank, \
    delivery_cost = EXCLUDED.delivery_cost, goods_total = EXCLUDED.goods_total, \
    custom_fee = EXCLUDED.custom_fee";

const DELETE_ITEMS: &str = "DELETE FROM items WHERE order_uid = $1";

const INSERT_ITEM: &str = "\
INSERT INTO items (order_uid, chrt_id, track_number, price, rid, name, sale, size, total_price, \
                   nm_id, brand, status) \
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";

const SELECT_ORDER: &str = "\
SELECT order_uid, track_number, entry, locale, internal_signature, customer_id, delivery_service, \
       shardkey, sm_id, date_created, oof_shard \
FROM orders WHERE order_uid = $1";

const SELECT_DELIVERY: &str = "\
SELECT name, phone, zip, city, address, region, email FROM deliveries WHERE order_uid = $1";

const SELECT_PAYMENT: &str = "\
SELECT transaction, request_id, currency, provider, amount, payment_dt, bank, delivery_cost, \
       goods_total, custom_fee \
FROM payments WHERE order_uid = $1";

const SELECT_ITEMS: &str = "\
SELECT chrt_id, track_number, price, rid, name, sale, size, total_price, nm_id, brand, status \
FROM items WHERE order_uid = $1 ORDER BY id";

const SELECT_RECENT_KEYS: &str = "\
SELECT order_uid FROM orders ORDER BY date_created DESC, order_uid DESC LIMIT $1";

// ============================================================================
// ROW MAPPING
// ============================================================================

fn order_from_row(row: &Row) -> Result<Order, tokio_postgres::Error> {
    Ok(Order {
        order_uid: row.try_get("order_uid")?,
        track_number: row.try_get("track_number")?,
        entry: row.try_get("entry")?,
        locale: row.try_get("locale")?,
        internal_signature: row.try_get("internal_signature")?,
        customer_id: row.try_get("customer_id")?,
        delivery_service: row.try_get("delivery_service")?,
        shardkey: row.try_get("shardkey")?,
        sm_id: row.try_get("sm_id")?,
        date_created: row.try_get("date_created")?,
        oof_shard: row.try_get("oof_shard")?,
        ..Default::default()
    })
}

fn delivery_from_row(row: &Row) -> Result<Delivery, tokio_postgres::Error> {
    Ok(Delivery {
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        zip: row.try_get("zip")?,
        city: row.try_get("city")?,
        address: row.try_get("address")?,
        region: row.try_get("region")?,
        email: row.try_get("email")?,
    })
}

fn payment_from_row(row: &Row) -> Result<Payment, tokio_postgres::Error> {
    Ok(Payment {
        transaction: row.try_get("transaction")?,
        request_id: row.try_get("request_id")?,
        currency: row.try_get("currency")?,
        provider: row.try_get("provider")?,
        amount: row.try_get("amount")?,
        payment_dt: row.try_get("payment_dt")?,
        bank: row.try_get("bank")?,
        delivery_cost: row.try_get("delivery_cost")?,
        goods_total: row.try_get("goods_total")?,
        custom_fee: row.try_get("custom_fee")?,
    })
}

fn item_from_row(row: &Row) -> Result<Item, tokio_postgres::Error> {
    Ok(Item {
        chrt_id: row.try_get("chrt_id")?,
        track_number: row.try_get("track_number")?,
        price: row.try_get("price")?,
        rid: row.try_get("rid")?,
        name: row.try_get("name")?,
        sale: row.try_get("sale")?,
        size: row.try_get("size")?,
        total_price: row.try_get("total_price")?,
        nm_id: row.try_get("nm_id")?,
        brand: row.try_get("brand")?,
        status: row.try_get("status")?,
    })
}

// ============================================================================
// POSTGRES ORDER STORE
// ============================================================================

/// Durable order store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: Pool,
}

impl PgOrderStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Underlying pool, shared with migrations.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> OrderflowResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            StorageError::Unavailable {
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn write(
        conn: &mut deadpool_postgres::Object,
        order: &Order,
    ) -> Result<(), tokio_postgres::Error> {
        let tx = conn.transaction().await?;

        tx.execute(
            UPSERT_ORDER,
            &[
                &order.order_uid,
                &order.track_number,
                &order.entry,
                &order.locale,
                &order.internal_signature,
                &order.customer_id,
                &order.delivery_service,
                &order.shardkey,
                &order.sm_id,
                &order.date_created,
                &order.oof_shard,
            ],
        )
        .await?;

        let d = &order.delivery;
        tx.execute(
            UPSERT_DELIVERY,
            &[
                &order.order_uid,
                &d.name,
                &d.phone,
                &d.zip,
                &d.city,
                &d.address,
                &d.region,
                &d.email,
            ],
        )
        .await?;

        let p = &order.payment;
        tx.execute(
            UPSERT_PAYMENT,
            &[
                &order.order_uid,
                &p.transaction,
                &p.request_id,
                &p.currency,
                &p.provider,
                &p.amount,
                &p.payment_dt,
                &p.bank,
                &p.delivery_cost,
                &p.goods_total,
                &p.custom_fee,
            ],
        )
        .await?;

        tx.execute(DELETE_ITEMS, &[&order.order_uid]).await?;
        let insert_item = tx.prepare_cached(INSERT_ITEM).await?;
        for item in &order.items {
            tx.execute(
                &insert_item,
                &[
                    &order.order_uid,
                    &item.chrt_id,
                    &item.track_number,
                    &item.price,
                    &item.rid,
                    &item.name,
                    &item.sale,
                    &item.size,
                    &item.total_price,
                    &item.nm_id,
                    &item.brand,
                    &item.status,
                ],
            )
            .await?;
        }

        // Dropping `tx` without this rolls everything back.
        tx.commit().await
    }

    async fn read(
        conn: &deadpool_postgres::Object,
        order_uid: &str,
    ) -> Result<Option<Order>, tokio_postgres::Error> {
        let Some(row) = conn.query_opt(SELECT_ORDER, &[&order_uid]).await? else {
            return Ok(None);
        };
        let mut order = order_from_row(&row)?;

        if let Some(row) = conn.query_opt(SELECT_DELIVERY, &[&order_uid]).await? {
            order.delivery = delivery_from_row(&row)?;
        }
        if let Some(row) = conn.query_opt(SELECT_PAYMENT, &[&order_uid]).await? {
            order.payment = payment_from_row(&row)?;
        }
        order.items = conn
            .query(SELECT_ITEMS, &[&order_uid])
            .await?
            .iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(order))
    }
}

impl std::fmt::Debug for PgOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgOrderStore")
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn upsert(&self, order: &Order) -> OrderflowResult<()> {
        let mut conn = self.get_conn().await?;
        Self::write(&mut conn, order).await.map_err(|e| {
            StorageError::WriteFailed {
                order_uid: order.order_uid.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn fetch(&self, order_uid: &str) -> OrderflowResult<Option<Order>> {
        let conn = self.get_conn().await?;
        Self::read(&conn, order_uid).await.map_err(|e| {
            StorageError::ReadFailed {
                order_uid: order_uid.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn recent_keys(&self, limit: usize) -> OrderflowResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.get_conn().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = conn
            .query(SELECT_RECENT_KEYS, &[&limit])
            .await
            .map_err(|e| StorageError::QueryFailed {
                reason: e.to_string(),
            })?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                StorageError::QueryFailed {
                    reason: e.to_string(),
                }
                .into()
            })
    }

    async fn ping(&self) -> OrderflowResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(|e| {
            StorageError::Unavailable {
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }
}
