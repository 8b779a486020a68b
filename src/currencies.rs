// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Store gateway for the `currency` table.

use sqlx::sqlite::SqlitePool;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::{HomeCurrency, StoreConfig};
use crate::db;
use crate::models::CurrencyRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },
}

/// Destination of parsed rates.
#[async_trait::async_trait]
pub trait RateStore: Send + Sync {
    /// Ensures the schema exists and seeds the home currency. Safe to repeat.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Inserts a record, or updates its rate and timestamp if the id exists.
    async fn upsert(&self, record: &CurrencyRecord) -> Result<(), StoreError>;
}

/// Seed the home currency, resetting its rate to 1.0 if it already exists
pub async fn seed_home_currency(pool: &SqlitePool, home: &HomeCurrency) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO currency (id, name, char_code, rate)
        VALUES (?, ?, ?, 1.0)
        ON CONFLICT(id) DO UPDATE SET
            rate = excluded.rate,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        "#,
    )
    .bind(home.id.to_lowercase())
    .bind(&home.name)
    .bind(home.char_code.to_uppercase())
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a currency into the database, or refresh its rate
pub async fn upsert_currency(pool: &SqlitePool, record: &CurrencyRecord) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO currency (id, name, char_code, rate)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            rate = excluded.rate,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        "#,
    )
    .bind(&record.id)
    .bind(&record.name)
    .bind(&record.char_code)
    .bind(record.rate)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a currency from the database by its id
pub async fn get_currency(pool: &SqlitePool, id: &str) -> Result<Option<CurrencyRecord>, StoreError> {
    let record = sqlx::query_as::<_, CurrencyRecord>(
        r#"
        SELECT id, name, char_code, rate, updated_at
        FROM currency
        WHERE id = ?
        "#,
    )
    .bind(id.to_lowercase())
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// List all currencies in the database
pub async fn list_currencies(pool: &SqlitePool) -> Result<Vec<CurrencyRecord>, StoreError> {
    let records = sqlx::query_as::<_, CurrencyRecord>(
        r#"
        SELECT id, name, char_code, rate, updated_at
        FROM currency
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(records)
}

async fn with_timeout<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StoreError::Timeout { operation })?
}

/// SQLite-backed [`RateStore`]; every query runs under the configured timeout.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    home: HomeCurrency,
    query_timeout: Duration,
}

impl SqliteStore {
    /// Opens the pool once for the process lifetime.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = with_timeout(config.acquire_timeout(), "connect", db::create_db_pool(config)).await?;
        Ok(Self {
            pool,
            home: config.home_currency.clone(),
            query_timeout: config.query_timeout(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get(&self, id: &str) -> Result<Option<CurrencyRecord>, StoreError> {
        with_timeout(self.query_timeout, "get", get_currency(&self.pool, id)).await
    }

    pub async fn list(&self) -> Result<Vec<CurrencyRecord>, StoreError> {
        with_timeout(self.query_timeout, "list", list_currencies(&self.pool)).await
    }
}

#[async_trait::async_trait]
impl RateStore for SqliteStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        with_timeout(self.query_timeout, "migrate", db::migrate(&self.pool)).await?;
        with_timeout(
            self.query_timeout,
            "seed",
            seed_home_currency(&self.pool, &self.home),
        )
        .await?;
        tracing::info!(home = %self.home.char_code, "Currency store initialized");
        Ok(())
    }

    async fn upsert(&self, record: &CurrencyRecord) -> Result<(), StoreError> {
        with_timeout(self.query_timeout, "upsert", upsert_currency(&self.pool, record)).await?;
        tracing::debug!(id = %record.id, rate = record.rate, "Currency upserted");
        Ok(())
    }
}
