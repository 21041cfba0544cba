use async_trait::async_trait;
use thiserror::Error;
use trb_common::Tokens;

use crate::db_types::Currency;

/// Best-effort outbound messaging (buyer and operator notifications). Failures are logged and
/// discarded by callers; a broken notifier must never roll back a financial mutation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Error)]
#[error("Could not deliver notification: {0}")]
pub struct NotifyError(pub String);

/// Computes the active-promotion bonus for a purchase. The bonus is added on top of the package
/// tokens and recorded separately in the audit metadata.
#[async_trait]
pub trait PromoRules: Send + Sync {
    async fn bonus_for_purchase(&self, user_id: i64, base: Tokens) -> Tokens;
}

/// No promotion running.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPromo;

#[async_trait]
impl PromoRules for NoPromo {
    async fn bonus_for_purchase(&self, _user_id: i64, _base: Tokens) -> Tokens {
        Tokens::default()
    }
}

/// A flat percentage bonus on every purchase, rounded down.
#[derive(Debug, Clone, Copy)]
pub struct FlatRatePromo {
    pub percent: u32,
}

#[async_trait]
impl PromoRules for FlatRatePromo {
    async fn bonus_for_purchase(&self, _user_id: i64, base: Tokens) -> Tokens {
        Tokens::from(base.value() * i64::from(self.percent) / 100)
    }
}

/// The partner/affiliate bonus hook, keyed by user id, amount and currency. Invoked
/// fire-and-forget after a successful payout.
#[async_trait]
pub trait PartnerProgram: Send + Sync {
    async fn record_purchase(&self, user_id: i64, amount: i64, currency: Currency) -> Result<(), PartnerError>;
}

#[derive(Debug, Clone, Error)]
#[error("Partner program call failed: {0}")]
pub struct PartnerError(pub String);

/// No partner program configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPartner;

#[async_trait]
impl PartnerProgram for NoPartner {
    async fn record_purchase(&self, _user_id: i64, _amount: i64, _currency: Currency) -> Result<(), PartnerError> {
        Ok(())
    }
}
