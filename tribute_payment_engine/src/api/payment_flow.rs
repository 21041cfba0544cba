use std::{fmt::Debug, sync::Arc};

use log::*;
use serde_json::json;
use trb_common::Tokens;

use crate::{
    api::errors::PaymentFlowError,
    db_types::{
        AuditReason,
        BalanceChange,
        NewAuditEntry,
        NewOrder,
        Order,
        OrderId,
        OrderStatusType,
        TokenPackage,
    },
    helpers::spawn_detached,
    traits::{
        NewProcessorOrder,
        NoPartner,
        NoPromo,
        Notifier,
        PartnerProgram,
        PaymentProcessor,
        PaymentStore,
        ProcessorOrderStatus,
        PromoRules,
        RedirectUrls,
    },
};

//--------------------------------------    SideChannels      ---------------------------------------------------------

/// The non-financial side effects attached to the payment flow. All of these are best-effort:
/// they run after the balance mutation has committed and their failures are logged, never
/// propagated.
#[derive(Clone)]
pub struct SideChannels {
    pub notifier: Option<Arc<dyn Notifier>>,
    pub promo: Arc<dyn PromoRules>,
    pub partner: Arc<dyn PartnerProgram>,
    /// Telegram chat that receives operator copies of purchase notifications
    pub operator_chat_id: Option<i64>,
}

impl Default for SideChannels {
    fn default() -> Self {
        Self { notifier: None, promo: Arc::new(NoPromo), partner: Arc::new(NoPartner), operator_chat_id: None }
    }
}

impl SideChannels {
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_promo(mut self, promo: Arc<dyn PromoRules>) -> Self {
        self.promo = promo;
        self
    }

    pub fn with_partner(mut self, partner: Arc<dyn PartnerProgram>) -> Self {
        self.partner = partner;
        self
    }

    pub fn with_operator_chat(mut self, chat_id: i64) -> Self {
        self.operator_chat_id = Some(chat_id);
        self
    }
}

//--------------------------------------    OrderCreated      ---------------------------------------------------------

/// The result of minting a new order. `order` is `None` when the processor order exists but the
/// local shadow row could not be stored.
#[derive(Debug, Clone)]
pub struct OrderCreated {
    pub uuid: OrderId,
    pub payment_url: String,
    pub order: Option<Order>,
}

//--------------------------------------   PaymentOutcome     ---------------------------------------------------------

/// The result of feeding one payment event (webhook delivery or poll observation) through the
/// flow. Duplicate deliveries surface as `AlreadyProcessed`, never as errors.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// This call won the `Pending -> Paid` claim and the balance was credited.
    Credited { order: Order, change: BalanceChange, bonus: Tokens },
    /// The order had already left the state this event targets. No-op.
    AlreadyProcessed,
    /// The order was marked failed. No balance effect.
    Failed(Order),
    /// This call won the `Paid -> Refunded` claim and the credited tokens were revoked.
    Refunded { order: Order, change: BalanceChange },
    /// The order is paid but the user row is gone. The money is recorded, the credit is not.
    UnreconciledPaid(Order),
    /// The order is refunded but the user row is gone, so there was no balance to revoke.
    UnreconciledRefund(Order),
}

//--------------------------------------   PaymentFlowApi     ---------------------------------------------------------

/// `PaymentFlowApi` drives the full order lifecycle: minting orders with the processor, applying
/// payment outcomes idempotently, and reconciling stale local state against processor polls.
///
/// Both the webhook path and the status-poll path funnel into the same `handle_*` methods, so an
/// event produces the same end state no matter which path observes it first, or how many times it
/// is delivered.
pub struct PaymentFlowApi<B> {
    db: B,
    channels: SideChannels,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, channels: SideChannels) -> Self {
        Self { db, channels }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> PaymentFlowApi<B>
where B: PaymentStore
{
    /// Mints a new order with the payment processor and stores the local shadow row.
    ///
    /// The processor order is created first. If the shadow persist then fails, the payment link
    /// is still returned (and `order` is `None`): the buyer can pay, and the webhook path will
    /// surface the missing row as an unknown order for manual follow-up. The shadow insert is
    /// idempotent on the processor uuid.
    pub async fn create_order<P: PaymentProcessor>(
        &self,
        processor: &P,
        user_id: i64,
        package: &TokenPackage,
        email: Option<String>,
        urls: &RedirectUrls,
    ) -> Result<OrderCreated, PaymentFlowError> {
        let request = NewProcessorOrder {
            amount: package.amount,
            currency: package.currency,
            title: package.title.clone(),
            description: format!("{} tokens", package.tokens.value()),
            success_url: urls.success_url.clone(),
            fail_url: urls.fail_url.clone(),
            customer_id: user_id.to_string(),
            email: email.clone(),
        };
        let minted = processor.create_order(request).await?;
        let order = NewOrder::new(minted.uuid.clone(), user_id, package.amount, package.currency, package.tokens)
            .with_payment_url(minted.payment_url.clone())
            .with_email(email);
        let order = match self.db.insert_order(order).await {
            Ok((order, true)) => {
                info!(
                    "🔄️📦️ Order {} created for user #{} ({} for {})",
                    order.uuid, user_id, package.tokens, package.amount
                );
                Some(order)
            },
            Ok((order, false)) => {
                warn!("🔄️📦️ Order {} already had a shadow row. Returning the existing one.", order.uuid);
                Some(order)
            },
            Err(e) => {
                error!(
                    "🔄️📦️ The processor order {} exists but the shadow row could not be stored: {e}. Returning the \
                     payment link anyway.",
                    minted.uuid
                );
                None
            },
        };
        Ok(OrderCreated { uuid: minted.uuid, payment_url: minted.payment_url, order })
    }

    /// Applies a successful payment to the order and the user's balance.
    ///
    /// The order claim runs first: only the caller that flips `Pending -> Paid` proceeds to the
    /// balance credit, so redelivered success events cannot double-credit. The promo bonus is
    /// computed before the credit and applied in the same mutation.
    pub async fn handle_payment_success(
        &self,
        uuid: &OrderId,
        skip_notifications: bool,
    ) -> Result<PaymentOutcome, PaymentFlowError> {
        let Some(order) = self.db.claim_pending_order(uuid).await? else {
            return self.lost_claim(uuid).await;
        };
        let bonus = self.channels.promo.bonus_for_purchase(order.user_id, order.tokens).await;
        let total = order.tokens + bonus;
        let Some(user) = self.db.fetch_user(order.user_id).await? else {
            error!(
                "🔄️💰️ Order {} is paid, but user #{} does not exist. The payment is recorded, the tokens are not \
                 credited. This needs manual reconciliation.",
                order.uuid, order.user_id
            );
            return Ok(PaymentOutcome::UnreconciledPaid(order));
        };
        let change = match self.db.credit_balance(order.user_id, total).await {
            Ok(Some(change)) => change,
            Ok(None) => {
                error!("🔄️💰️ User #{} vanished between fetch and credit for order {}", order.user_id, order.uuid);
                return Ok(PaymentOutcome::UnreconciledPaid(order));
            },
            Err(e) => {
                error!(
                    "🔄️💰️ Order {} was claimed as paid but the balance credit failed: {e}. The user has NOT \
                     received their tokens.",
                    order.uuid
                );
                return Err(PaymentFlowError::BalanceWriteFailed(order.uuid.clone(), e.to_string()));
            },
        };
        debug!(
            "🔄️💰️ Order {} paid. Credited {total} to user #{} ({} -> {})",
            order.uuid, order.user_id, change.old_balance, change.new_balance
        );
        let entry = NewAuditEntry::new(order.user_id, change, AuditReason::Payment)
            .with_reference(order.uuid.as_str())
            .with_metadata(json!({
                "amount": order.amount,
                "currency": order.currency,
                "package_tokens": order.tokens,
                "bonus_tokens": bonus,
            }));
        if let Err(e) = self.db.insert_audit_entry(entry).await {
            error!("🔄️💰️ Could not write the audit entry for order {}: {e}", order.uuid);
        }
        self.call_partner_hook(&order);
        self.notify_purchase(&order, user.chat_id, total, skip_notifications);
        Ok(PaymentOutcome::Credited { order, change, bonus })
    }

    /// Marks the order as failed. Pure status bookkeeping; balances are never touched, and orders
    /// that already reached a terminal state are left alone.
    pub async fn handle_payment_failure(&self, uuid: &OrderId) -> Result<PaymentOutcome, PaymentFlowError> {
        match self.db.mark_order_failed(uuid).await? {
            Some(order) => {
                debug!("🔄️❌️ Order {} marked as failed", order.uuid);
                Ok(PaymentOutcome::Failed(order))
            },
            None => self.lost_claim(uuid).await,
        }
    }

    /// Revokes the tokens credited for a paid order.
    ///
    /// Only the caller that flips `Paid -> Refunded` performs the debit, so redelivered refund
    /// events are no-ops. The debit is clamped at zero: if the user has spent some of the
    /// credited tokens, the balance goes to zero rather than negative.
    pub async fn handle_refund(
        &self,
        uuid: &OrderId,
        skip_notifications: bool,
    ) -> Result<PaymentOutcome, PaymentFlowError> {
        let Some(order) = self.db.claim_paid_order(uuid).await? else {
            return self.lost_claim(uuid).await;
        };
        let Some(user) = self.db.fetch_user(order.user_id).await? else {
            warn!(
                "🔄️↩️ Order {} is refunded, but user #{} does not exist. No balance to revoke.",
                order.uuid, order.user_id
            );
            return Ok(PaymentOutcome::UnreconciledRefund(order));
        };
        let change = match self.db.debit_balance_clamped(order.user_id, order.tokens).await {
            Ok(Some(change)) => change,
            Ok(None) => {
                warn!("🔄️↩️ User #{} vanished between fetch and debit for order {}", order.user_id, order.uuid);
                return Ok(PaymentOutcome::UnreconciledRefund(order));
            },
            Err(e) => {
                error!(
                    "🔄️↩️ Order {} was claimed as refunded but the balance debit failed: {e}. The user keeps \
                     their tokens.",
                    order.uuid
                );
                return Err(PaymentFlowError::BalanceWriteFailed(order.uuid.clone(), e.to_string()));
            },
        };
        let revoked = change.old_balance - change.new_balance;
        debug!(
            "🔄️↩️ Order {} refunded. Revoked {revoked} of {} from user #{} ({} -> {})",
            order.uuid, order.tokens, order.user_id, change.old_balance, change.new_balance
        );
        let entry = NewAuditEntry::new(order.user_id, change, AuditReason::Refund)
            .with_reference(order.uuid.as_str())
            .with_metadata(json!({
                "amount": order.amount,
                "currency": order.currency,
                "tokens_revoked": revoked,
            }));
        if let Err(e) = self.db.insert_audit_entry(entry).await {
            error!("🔄️↩️ Could not write the audit entry for order {}: {e}", order.uuid);
        }
        self.notify_refund(&order, user.chat_id, revoked, skip_notifications);
        Ok(PaymentOutcome::Refunded { order, change })
    }

    /// Answers a client status poll, reconciling the local shadow row against the processor on
    /// the way.
    ///
    /// If the local row is still pending, the processor is asked for the live status and any
    /// terminal answer is fed through the same `handle_*` path the webhook uses. A processor that
    /// cannot be reached degrades to "pending"; the webhook remains the source of truth.
    pub async fn check_order_status<P: PaymentProcessor>(
        &self,
        processor: &P,
        uuid: &OrderId,
    ) -> Result<(OrderStatusType, Option<Order>), PaymentFlowError> {
        let local = self.db.fetch_order_by_uuid(uuid).await?;
        if let Some(order) = &local {
            if order.status != OrderStatusType::Pending {
                return Ok((order.status, local));
            }
        }
        let live = match processor.get_order_status(uuid).await {
            Ok(status) => status,
            Err(e) => {
                warn!("🔄️📦️ Status poll for order {uuid} could not reach the processor: {e}");
                return Ok((OrderStatusType::Pending, local));
            },
        };
        if local.is_none() {
            // A poll for an order we never created. Answer with the processor's view, touch nothing.
            warn!("🔄️📦️ Status poll for unknown order {uuid}. Processor says {live}.");
            return Ok((order_status_from_processor(live), None));
        }
        match live {
            ProcessorOrderStatus::Pending => {},
            ProcessorOrderStatus::Paid => {
                self.handle_payment_success(uuid, false).await?;
            },
            ProcessorOrderStatus::Failed => {
                self.handle_payment_failure(uuid).await?;
            },
            ProcessorOrderStatus::Refunded => {
                // The poll can observe a refund for an order whose success event never arrived.
                // Apply the missed success first so the refund has a Paid order to claim.
                self.handle_payment_success(uuid, true).await?;
                self.handle_refund(uuid, false).await?;
            },
        }
        let order = self
            .db
            .fetch_order_by_uuid(uuid)
            .await?
            .ok_or_else(|| PaymentFlowError::OrderNotFound(uuid.clone()))?;
        Ok((order.status, Some(order)))
    }

    /// Resolves a lost claim: either the order never existed, or it already left the targeted
    /// state and this event is a duplicate.
    async fn lost_claim(&self, uuid: &OrderId) -> Result<PaymentOutcome, PaymentFlowError> {
        match self.db.fetch_order_by_uuid(uuid).await? {
            Some(order) => {
                info!("🔄️📦️ Order {} is already {}. Ignoring the duplicate event.", order.uuid, order.status);
                Ok(PaymentOutcome::AlreadyProcessed)
            },
            None => Err(PaymentFlowError::OrderNotFound(uuid.clone())),
        }
    }

    fn call_partner_hook(&self, order: &Order) {
        let partner = Arc::clone(&self.channels.partner);
        let (user_id, amount, currency) = (order.user_id, order.amount, order.currency);
        spawn_detached("partner purchase hook", async move {
            partner.record_purchase(user_id, amount, currency).await
        });
    }

    /// `skip_buyer` mutes the buyer message only (the originating bot talks to the buyer
    /// itself); the operator copy always goes out.
    fn notify_purchase(&self, order: &Order, chat_id: i64, total: Tokens, skip_buyer: bool) {
        let Some(notifier) = self.channels.notifier.clone() else {
            return;
        };
        if !skip_buyer {
            let buyer_text = format!("✅ Payment received! {total} have been added to your balance.");
            spawn_detached("buyer purchase notification", {
                let notifier = Arc::clone(&notifier);
                async move { notifier.notify(chat_id, &buyer_text).await }
            });
        }
        if let Some(operator) = self.channels.operator_chat_id {
            let operator_text = format!(
                "💰 Order {} paid: user #{} bought {} for {} {}",
                order.uuid, order.user_id, total, order.amount, order.currency
            );
            spawn_detached("operator purchase notification", async move {
                notifier.notify(operator, &operator_text).await
            });
        }
    }

    fn notify_refund(&self, order: &Order, chat_id: i64, revoked: Tokens, skip_buyer: bool) {
        let Some(notifier) = self.channels.notifier.clone() else {
            return;
        };
        if !skip_buyer {
            let text = format!(
                "↩️ Your payment for order {} was refunded. {revoked} were removed from your balance.",
                order.uuid
            );
            spawn_detached("buyer refund notification", {
                let notifier = Arc::clone(&notifier);
                async move { notifier.notify(chat_id, &text).await }
            });
        }
        if let Some(operator) = self.channels.operator_chat_id {
            let text = format!(
                "↩️ Order {} refunded: {revoked} revoked from user #{}",
                order.uuid, order.user_id
            );
            spawn_detached("operator refund notification", async move { notifier.notify(operator, &text).await });
        }
    }
}

fn order_status_from_processor(status: ProcessorOrderStatus) -> OrderStatusType {
    match status {
        ProcessorOrderStatus::Pending => OrderStatusType::Pending,
        ProcessorOrderStatus::Paid => OrderStatusType::Paid,
        ProcessorOrderStatus::Failed => OrderStatusType::Failed,
        ProcessorOrderStatus::Refunded => OrderStatusType::Refunded,
    }
}
