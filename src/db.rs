// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::StoreConfig;
use crate::currencies::StoreError;

pub async fn create_db_pool(config: &StoreConfig) -> Result<SqlitePool, StoreError> {
    // Create database if it doesn't exist
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    // Connect to the database
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Applies pending migrations; the store runs this once at initialization.
pub async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

#[cfg(test)]
pub async fn create_test_pool() -> Result<SqlitePool, StoreError> {
    let pool = create_db_pool(&StoreConfig::in_memory()).await?;
    migrate(&pool).await?;
    Ok(pool)
}
