use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use trb_common::Tokens;

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been created locally and with the processor, but no payment event has arrived.
    Pending,
    /// The processor reported a completed payment and the balance has been credited.
    Paid,
    /// The processor reported a failed payment. Terminal, no balance effect.
    Failed,
    /// A paid order has been refunded and the credited tokens revoked (clamped at zero).
    Refunded,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Failed => write!(f, "Failed"),
            OrderStatusType::Refunded => write!(f, "Refunded"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------      Currency        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Eur,
    Rub,
    Usd,
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Eur => write!(f, "eur"),
            Currency::Rub => write!(f, "rub"),
            Currency::Usd => write!(f, "usd"),
        }
    }
}

impl FromStr for Currency {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eur" => Ok(Self::Eur),
            "rub" => Ok(Self::Rub),
            "usd" => Ok(Self::Usd),
            s => Err(ConversionError(format!("Invalid currency: {s}"))),
        }
    }
}

impl Currency {
    /// Only euro and ruble packages are purchasable through the storefront. Usd exists for
    /// historical orders only.
    pub fn is_purchasable(&self) -> bool {
        matches!(self, Currency::Eur | Currency::Rub)
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The processor-assigned order uuid. It is the primary correlation key between webhook events,
/// client polls and the local shadow row.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// The local shadow copy of a processor order. Used for fast status answers and audit
/// correlation; the webhook path remains the source of truth for "did the user actually pay".
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub uuid: OrderId,
    pub user_id: i64,
    /// Price in minor currency units (cents / kopeks)
    pub amount: i64,
    pub currency: Currency,
    pub tokens: Tokens,
    pub status: OrderStatusType,
    pub payment_url: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

//--------------------------------------       NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The uuid as assigned by the payment processor
    pub uuid: OrderId,
    pub user_id: i64,
    pub amount: i64,
    pub currency: Currency,
    pub tokens: Tokens,
    pub payment_url: Option<String>,
    pub email: Option<String>,
}

impl NewOrder {
    pub fn new(uuid: OrderId, user_id: i64, amount: i64, currency: Currency, tokens: Tokens) -> Self {
        Self { uuid, user_id, amount, currency, tokens, payment_url: None, email: None }
    }

    pub fn with_payment_url(mut self, url: String) -> Self {
        self.payment_url = Some(url);
        self
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }
}

//--------------------------------------       UserRow        ---------------------------------------------------------
/// The slice of the user row this engine reads and writes. `balance` is shared with flows outside
/// this engine (generation spend, bonuses), so every mutation must be additive against a fresh
/// read, never a blind overwrite from a stale one.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    /// Telegram chat used for best-effort purchase/refund notifications
    pub chat_id: i64,
    pub balance: Tokens,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    BalanceChange     ---------------------------------------------------------
/// The before/after pair of a single balance mutation, as observed inside the store transaction
/// that performed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub old_balance: Tokens,
    pub new_balance: Tokens,
}

impl BalanceChange {
    pub fn delta(&self) -> Tokens {
        self.new_balance - self.old_balance
    }
}

//--------------------------------------     AuditReason      ---------------------------------------------------------
/// Tags for balance ledger entries. The ledger is forensic only; these tags answer "what kind of
/// flow moved this balance", they are never used to recompute a live balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditReason {
    Generation,
    Refund,
    Payment,
    Spin,
    Wheel,
    Admin,
    Watermark,
    Chat,
    Editor,
    ChannelReward,
    Referral,
    Promo,
}

impl Display for AuditReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            AuditReason::Generation => "generation",
            AuditReason::Refund => "refund",
            AuditReason::Payment => "payment",
            AuditReason::Spin => "spin",
            AuditReason::Wheel => "wheel",
            AuditReason::Admin => "admin",
            AuditReason::Watermark => "watermark",
            AuditReason::Chat => "chat",
            AuditReason::Editor => "editor",
            AuditReason::ChannelReward => "channel_reward",
            AuditReason::Referral => "referral",
            AuditReason::Promo => "promo",
        };
        write!(f, "{tag}")
    }
}

//--------------------------------------    NewAuditEntry     ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: i64,
    pub old_balance: Tokens,
    pub new_balance: Tokens,
    pub reason: AuditReason,
    pub reference_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewAuditEntry {
    pub fn new(user_id: i64, change: BalanceChange, reason: AuditReason) -> Self {
        Self {
            user_id,
            old_balance: change.old_balance,
            new_balance: change.new_balance,
            reason,
            reference_id: None,
            metadata: None,
        }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference_id: S) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

//--------------------------------------     AuditEntry       ---------------------------------------------------------
/// A persisted ledger row. Write-once; `change_amount` is always `new_balance - old_balance`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: i64,
    pub old_balance: Tokens,
    pub new_balance: Tokens,
    pub change_amount: Tokens,
    pub reason: AuditReason,
    pub reference_id: Option<String>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    TokenPackage      ---------------------------------------------------------
/// A purchasable bundle of tokens. The catalog is static server configuration; packages are
/// looked up by `(id, currency)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPackage {
    pub id: String,
    pub title: String,
    pub tokens: Tokens,
    /// Price in minor currency units
    pub amount: i64,
    pub currency: Currency,
}

//--------------------------------------  GenerationRecord    ---------------------------------------------------------
/// A charged generation job. The `refunded` flag is the one-shot refund guard: it flips true via
/// a conditional update and never reverts.
#[derive(Debug, Clone, FromRow)]
pub struct GenerationRecord {
    pub id: String,
    pub user_id: i64,
    pub cost: Tokens,
    pub refunded: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub id: String,
    pub user_id: i64,
    pub cost: Tokens,
}
