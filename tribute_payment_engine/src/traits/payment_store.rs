use thiserror::Error;
use trb_common::Tokens;

use crate::db_types::{
    AuditEntry,
    BalanceChange,
    GenerationRecord,
    NewAuditEntry,
    NewOrder,
    Order,
    OrderId,
    UserRow,
};

/// The row-store contract for backends supporting the payment engine.
///
/// The store is only required to provide single-row atomic read-then-conditional-write semantics.
/// Every `claim_*` / `try_*` method is a compare-and-flip: a single conditional update whose
/// `None` result is the loser's signal that another caller already performed the transition.
/// The engine builds all of its idempotency guarantees out of these, so implementations must not
/// weaken them (e.g. by splitting a claim into a read followed by an unconditional write).
#[allow(async_fn_in_trait)]
pub trait PaymentStore {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores the shadow order row. This call is idempotent: if an order with the same uuid
    /// already exists, the existing row is returned and the second element is `false`.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentStoreError>;

    /// Returns the shadow order for the given processor uuid, if one was ever recorded.
    async fn fetch_order_by_uuid(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError>;

    /// Atomically transitions the order from `Pending` to `Paid`, setting `paid_at`.
    ///
    /// Returns the updated order if this caller won the claim, or `None` if the order was not in
    /// `Pending` state (already paid, failed, or refunded). This is the idempotency guard for the
    /// payment-success path: the check and the status flip are one conditional update.
    async fn claim_pending_order(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError>;

    /// Atomically transitions the order from `Pending` to `Failed`. Returns `None` if the order
    /// was no longer pending; terminal orders are never rewritten.
    async fn mark_order_failed(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError>;

    /// Atomically transitions the order from `Paid` to `Refunded`, setting `refunded_at`.
    /// Returns `None` if the order was not in `Paid` state, which also guards against duplicate
    /// refund deliveries.
    async fn claim_paid_order(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError>;

    /// Fetches the user row, or `None` if the user does not exist.
    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserRow>, PaymentStoreError>;

    /// Adds `amount` to the user's balance inside a single store transaction and reports the
    /// before/after pair. Returns `None` if the user row does not exist.
    async fn credit_balance(
        &self,
        user_id: i64,
        amount: Tokens,
    ) -> Result<Option<BalanceChange>, PaymentStoreError>;

    /// Subtracts `amount` from the user's balance, clamped so the result is never negative.
    /// Returns `None` if the user row does not exist.
    async fn debit_balance_clamped(
        &self,
        user_id: i64,
        amount: Tokens,
    ) -> Result<Option<BalanceChange>, PaymentStoreError>;

    /// Appends a row to the balance audit ledger. The ledger is append-only; there is no update
    /// or delete counterpart.
    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditEntry, PaymentStoreError>;

    /// Fetches a charged generation record, or `None` if it was never recorded.
    async fn fetch_generation(&self, id: &str) -> Result<Option<GenerationRecord>, PaymentStoreError>;

    /// Flips the one-shot `refunded` flag on a generation record via a conditional update
    /// (`... SET refunded = true WHERE id = ? AND refunded = false`).
    ///
    /// Returns the record if this caller won the flip, or `None` if another caller already
    /// refunded it. The `None` case must not be treated as an error; it is the signal to no-op.
    async fn try_claim_refund_flag(
        &self,
        generation_id: &str,
    ) -> Result<Option<GenerationRecord>, PaymentStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentStoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists: {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested user #{0} does not exist")]
    UserNotFound(i64),
    #[error("The requested generation record {0} does not exist")]
    GenerationNotFound(String),
}

impl From<sqlx::Error> for PaymentStoreError {
    fn from(e: sqlx::Error) -> Self {
        PaymentStoreError::DatabaseError(e.to_string())
    }
}
