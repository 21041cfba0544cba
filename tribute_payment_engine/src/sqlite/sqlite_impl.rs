use log::debug;
use sqlx::SqlitePool;
use trb_common::Tokens;

use crate::{
    db_types::{
        AuditEntry,
        BalanceChange,
        GenerationRecord,
        NewAuditEntry,
        NewGeneration,
        NewOrder,
        Order,
        OrderId,
        UserRow,
    },
    sqlite::{db, new_pool},
    traits::{PaymentStore, PaymentStoreError},
};

/// The Sqlite-backed row store. Clones share the underlying connection pool.
#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase").field("url", &self.url).finish()
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool for the database at `url` and returns a new instance of
    /// `SqliteDatabase`.
    pub async fn new(max_connections: u32) -> Result<Self, PaymentStoreError> {
        let url = super::db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentStoreError> {
        let pool = new_pool(url, max_connections).await?;
        debug!("🗃️ Connected to database {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates or updates the user row. Provisioning and test-fixture helper; not part of the
    /// [`PaymentStore`] contract because the payment flow never creates users.
    pub async fn upsert_user(&self, id: i64, chat_id: i64) -> Result<UserRow, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::users::upsert_user(id, chat_id, &mut conn).await
    }

    pub async fn insert_generation(&self, gen: NewGeneration) -> Result<GenerationRecord, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::generations::insert_generation(gen, &mut conn).await
    }

    /// Ledger rows for one user, newest first.
    pub async fn fetch_audit_entries_for_user(&self, user_id: i64) -> Result<Vec<AuditEntry>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::audit::fetch_entries_for_user(user_id, &mut conn).await
    }
}

impl PaymentStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::orders::idempotent_insert(order, &mut conn).await
    }

    async fn fetch_order_by_uuid(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = db::orders::fetch_order_by_uuid(uuid, &mut conn).await?;
        Ok(order)
    }

    async fn claim_pending_order(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::orders::claim_pending_order(uuid, &mut conn).await
    }

    async fn mark_order_failed(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::orders::mark_order_failed(uuid, &mut conn).await
    }

    async fn claim_paid_order(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::orders::claim_paid_order(uuid, &mut conn).await
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserRow>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = db::users::fetch_user_by_id(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn credit_balance(
        &self,
        user_id: i64,
        amount: Tokens,
    ) -> Result<Option<BalanceChange>, PaymentStoreError> {
        let mut tx = self.pool.begin().await?;
        let change = db::users::credit_balance(user_id, amount, &mut tx).await?;
        tx.commit().await?;
        Ok(change)
    }

    async fn debit_balance_clamped(
        &self,
        user_id: i64,
        amount: Tokens,
    ) -> Result<Option<BalanceChange>, PaymentStoreError> {
        let mut tx = self.pool.begin().await?;
        let change = db::users::debit_balance_clamped(user_id, amount, &mut tx).await?;
        tx.commit().await?;
        Ok(change)
    }

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditEntry, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::audit::insert_audit_entry(entry, &mut conn).await
    }

    async fn fetch_generation(&self, id: &str) -> Result<Option<GenerationRecord>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let record = db::generations::fetch_generation(id, &mut conn).await?;
        Ok(record)
    }

    async fn try_claim_refund_flag(
        &self,
        generation_id: &str,
    ) -> Result<Option<GenerationRecord>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::generations::try_claim_refund_flag(generation_id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), PaymentStoreError> {
        self.pool.close().await;
        Ok(())
    }
}
