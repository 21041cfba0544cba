use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tribute_payment_engine::db_types::{Currency, OrderId, OrderStatusType};
use trb_common::Tokens;

/// Webhook acknowledgement body: `{ok, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub ok: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { ok: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { ok: false, message: message.to_string() }
    }
}

//--------------------------------------   Order requests     ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub package_id: String,
    pub currency: Currency,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResult {
    pub success: bool,
    pub payment_url: String,
    pub order_uuid: OrderId,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderStatusResponse {
    pub success: bool,
    pub status: OrderStatusType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Tokens>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

//--------------------------------------   Webhook events     ---------------------------------------------------------

/// The one concrete payload shape every Tribute delivery is normalized into. Tribute has sent
/// both snake_case and camelCase field names over time, so both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, alias = "orderUuid", alias = "order_uuid")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Origin tag attached by some senders. A recognized bot source suppresses buyer
    /// notifications (the bot delivers its own), never the balance mutation.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, alias = "transactionId")]
    pub transaction_id: Option<String>,
    #[serde(default, alias = "userEmail", alias = "user_email")]
    pub email: Option<String>,
    #[serde(default, alias = "customerId", alias = "telegram_user_id", alias = "telegramUserId")]
    pub customer_id: Option<i64>,
}

impl WebhookPayload {
    pub fn order_id(&self) -> Option<OrderId> {
        self.uuid.clone().map(OrderId)
    }

    /// True when the sender marked this delivery as bot-originated, in which case the bot talks
    /// to the buyer itself.
    pub fn suppress_notifications(&self) -> bool {
        matches!(self.source.as_deref(), Some("bot") | Some("telegram_bot"))
    }
}

/// Raw webhook body. Tribute wraps the payload in a `{name, payload}` envelope; legacy deliveries
/// send the bare payload with no event name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawWebhookBody {
    Envelope {
        name: String,
        #[serde(default)]
        payload: WebhookPayload,
    },
    Flat(WebhookPayload),
}

#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub name: Option<String>,
    pub payload: WebhookPayload,
}

impl WebhookEvent {
    /// Normalizes a raw webhook body into one event shape.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        let event = match serde_json::from_slice::<RawWebhookBody>(body)? {
            RawWebhookBody::Envelope { name, payload } => Self { name: Some(name), payload },
            RawWebhookBody::Flat(payload) => Self { name: None, payload },
        };
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self.name.as_deref() {
            Some("shopOrderSuccess") => EventKind::OrderSuccess,
            Some("shopOrderFailed") => EventKind::OrderFailed,
            Some("shopOrderRefunded") => EventKind::OrderRefunded,
            Some("recurringCancelled") => EventKind::RecurringCancelled,
            Some("tokenChargeSuccess") | Some("tokenChargeFailed") => EventKind::TokenCharge,
            _ => EventKind::Unknown,
        }
    }

    /// The legacy fallback for unnamed or unrecognized events: branch on the payload's own status
    /// field.
    pub fn legacy_kind(&self) -> EventKind {
        match self.payload.status.as_deref() {
            Some("paid") | Some("success") => EventKind::OrderSuccess,
            Some("failed") | Some("expired") => EventKind::OrderFailed,
            Some("refunded") => EventKind::OrderRefunded,
            _ => EventKind::Unknown,
        }
    }
}

/// What a webhook delivery asks the gateway to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    OrderSuccess,
    OrderFailed,
    OrderRefunded,
    /// Subscription cancellation. Logged only; there is no order to mutate.
    RecurringCancelled,
    /// Bot-side token charge events carry no order uuid and are acknowledged without action.
    TokenCharge,
    Unknown,
}
