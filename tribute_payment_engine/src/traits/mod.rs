//! The seams between the reconciliation engine and the outside world.
//!
//! [`PaymentStore`] is the row-store contract; its conditional single-row updates are the only
//! concurrency primitive the engine relies on. [`PaymentProcessor`] is the upstream payment
//! provider. The remaining traits are best-effort side-effect collaborators whose failures must
//! never influence a financial outcome.
mod payment_store;
mod processor;
mod side_effects;

pub use payment_store::{PaymentStore, PaymentStoreError};
pub use processor::{
    NewProcessorOrder,
    PaymentProcessor,
    ProcessorError,
    ProcessorOrder,
    ProcessorOrderStatus,
    RedirectUrls,
};
pub use side_effects::{
    FlatRatePromo,
    NoPartner,
    NoPromo,
    Notifier,
    NotifyError,
    PartnerError,
    PartnerProgram,
    PromoRules,
};
