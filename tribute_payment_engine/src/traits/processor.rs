use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{Currency, OrderId};

/// The request to mint a new order with the payment processor.
#[derive(Debug, Clone, Serialize)]
pub struct NewProcessorOrder {
    /// Price in minor currency units
    pub amount: i64,
    pub currency: Currency,
    pub title: String,
    pub description: String,
    pub success_url: String,
    pub fail_url: String,
    /// Opaque customer identity passed through to the processor
    pub customer_id: String,
    pub email: Option<String>,
}

/// A freshly minted processor order.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorOrder {
    pub uuid: OrderId,
    pub payment_url: String,
}

/// The live order status as reported by the processor's status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorOrderStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Display for ProcessorOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessorOrderStatus::Pending => write!(f, "pending"),
            ProcessorOrderStatus::Paid => write!(f, "paid"),
            ProcessorOrderStatus::Failed => write!(f, "failed"),
            ProcessorOrderStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// The success/fail pages the processor redirects the buyer to after checkout.
#[derive(Debug, Clone)]
pub struct RedirectUrls {
    pub success_url: String,
    pub fail_url: String,
}

/// The payment-processor contract: mint orders and answer live status queries.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    async fn create_order(&self, order: NewProcessorOrder) -> Result<ProcessorOrder, ProcessorError>;

    async fn get_order_status(&self, uuid: &OrderId) -> Result<ProcessorOrderStatus, ProcessorError>;
}

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("Could not reach the payment processor: {0}")]
    RequestError(String),
    #[error("The payment processor rejected the request ({status}): {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not decode the processor response: {0}")]
    JsonError(String),
    #[error("Could not initialize the processor client: {0}")]
    Initialization(String),
}
