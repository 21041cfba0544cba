use thiserror::Error;

use crate::{
    db_types::OrderId,
    traits::{PaymentStoreError, ProcessorError},
};

#[derive(Debug, Error)]
pub enum PaymentFlowError {
    #[error("Database error: {0}")]
    StoreError(#[from] PaymentStoreError),
    #[error("Payment processor error: {0}")]
    ProcessorError(#[from] ProcessorError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} was claimed but the balance write failed: {1}. Manual reconciliation required.")]
    BalanceWriteFailed(OrderId, String),
}
