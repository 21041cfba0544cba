use log::*;
use serde_json::json;
use trb_common::Tokens;

use crate::{
    api::errors::PaymentFlowError,
    db_types::{AuditReason, NewAuditEntry},
    traits::{PaymentStore, PaymentStoreError},
};

/// The result of [`BalanceAuditApi::safe_refund`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeRefundOutcome {
    /// This call won the refund flag and the generation cost was credited back.
    Refunded { new_balance: Tokens },
    /// The generation was already refunded. No-op.
    AlreadyRefunded,
    /// The flag was won but the user row is gone, so there was nothing to credit.
    UserMissing,
}

/// `BalanceAuditApi` owns the two ledger entry points outside the order flow: recording balance
/// changes made by other subsystems, and the guarded refund of a failed generation.
pub struct BalanceAuditApi<B> {
    db: B,
}

impl<B> std::fmt::Debug for BalanceAuditApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BalanceAuditApi")
    }
}

impl<B> BalanceAuditApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> BalanceAuditApi<B>
where B: PaymentStore
{
    /// Appends a ledger row for a balance change some other flow has already applied.
    ///
    /// The ledger is forensic; a failed write is logged and swallowed so it can never abort the
    /// flow that performed the actual balance mutation.
    pub async fn log_balance_change(&self, entry: NewAuditEntry) {
        let user_id = entry.user_id;
        let reason = entry.reason;
        if let Err(e) = self.db.insert_audit_entry(entry).await {
            error!("🗃️ Could not write the {reason} audit entry for user #{user_id}: {e}");
        }
    }

    /// Credits the cost of a failed generation back to its user, at most once.
    ///
    /// The one-shot `refunded` flag is claimed first, so concurrent calls for the same
    /// generation produce exactly one credit. The flag does not revert if the subsequent credit
    /// finds the user missing; that case is logged and reported as [`SafeRefundOutcome::UserMissing`].
    pub async fn safe_refund(&self, generation_id: &str) -> Result<SafeRefundOutcome, PaymentFlowError> {
        let Some(generation) = self.db.try_claim_refund_flag(generation_id).await? else {
            return if self.db.fetch_generation(generation_id).await?.is_some() {
                debug!("🗃️ Generation {generation_id} was already refunded. Ignoring.");
                Ok(SafeRefundOutcome::AlreadyRefunded)
            } else {
                Err(PaymentStoreError::GenerationNotFound(generation_id.to_string()).into())
            };
        };
        let Some(change) = self.db.credit_balance(generation.user_id, generation.cost).await? else {
            error!(
                "🗃️ Generation {generation_id} was claimed for refund, but user #{} does not exist.",
                generation.user_id
            );
            return Ok(SafeRefundOutcome::UserMissing);
        };
        debug!(
            "🗃️ Refunded {} for generation {generation_id} to user #{} ({} -> {})",
            generation.cost, generation.user_id, change.old_balance, change.new_balance
        );
        let entry = NewAuditEntry::new(generation.user_id, change, AuditReason::Refund)
            .with_reference(generation_id)
            .with_metadata(json!({ "generation_id": generation_id, "cost": generation.cost }));
        self.log_balance_change(entry).await;
        Ok(SafeRefundOutcome::Refunded { new_balance: change.new_balance })
    }
}
