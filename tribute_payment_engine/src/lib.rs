//! Tribute Payment Engine
//!
//! The core logic for accepting Tribute payments and keeping user token balances honest. The
//! library is divided into two main sections:
//! 1. Database management ([`mod@sqlite`]). Sqlite is the only supported backend. You should
//!    never need to access the database directly; use the public API instead. The exception is
//!    the data types stored in the database, which are defined in [`db_types`] and are public.
//! 2. The engine public API ([`mod@api`]). [`PaymentFlowApi`] drives the order lifecycle from
//!    creation through webhook or poll reconciliation; [`BalanceAuditApi`] owns the balance
//!    ledger and the guarded generation refund. Backends implement the traits in [`traits`] to
//!    serve these APIs.
//!
//! All idempotency in this engine reduces to single-row conditional updates: order status
//! transitions and the generation refund flag are compare-and-flip claims, and only the claim
//! winner performs the associated balance mutation.
pub mod api;
pub mod db_types;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use api::{BalanceAuditApi, PaymentFlowApi, PaymentFlowError, PaymentOutcome, SafeRefundOutcome, SideChannels};
