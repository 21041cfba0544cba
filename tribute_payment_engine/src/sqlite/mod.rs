use std::{env, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;

use crate::traits::PaymentStoreError;

pub fn db_url() -> String {
    env::var("TRB_DATABASE_URL").unwrap_or_else(|_| "sqlite://data/tribute.db".to_string())
}

pub(crate) async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, PaymentStoreError> {
    let options = url
        .parse::<SqliteConnectOptions>()
        .map_err(|e| PaymentStoreError::DatabaseError(e.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
