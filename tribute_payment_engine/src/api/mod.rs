mod balance_audit;
mod errors;
mod payment_flow;

pub use balance_audit::{BalanceAuditApi, SafeRefundOutcome};
pub use errors::PaymentFlowError;
pub use payment_flow::{OrderCreated, PaymentFlowApi, PaymentOutcome, SideChannels};
