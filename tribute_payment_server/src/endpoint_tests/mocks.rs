use mockall::mock;
use tribute_payment_engine::{
    db_types::{
        AuditEntry,
        BalanceChange,
        GenerationRecord,
        NewAuditEntry,
        NewOrder,
        Order,
        OrderId,
        UserRow,
    },
    traits::{
        NewProcessorOrder,
        PaymentProcessor,
        PaymentStore,
        PaymentStoreError,
        ProcessorError,
        ProcessorOrder,
        ProcessorOrderStatus,
    },
};
use trb_common::Tokens;

mock! {
    pub PaymentStore {}
    impl PaymentStore for PaymentStore {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentStoreError>;
        async fn fetch_order_by_uuid(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError>;
        async fn claim_pending_order(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError>;
        async fn mark_order_failed(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError>;
        async fn claim_paid_order(&self, uuid: &OrderId) -> Result<Option<Order>, PaymentStoreError>;
        async fn fetch_user(&self, user_id: i64) -> Result<Option<UserRow>, PaymentStoreError>;
        async fn credit_balance(&self, user_id: i64, amount: Tokens) -> Result<Option<BalanceChange>, PaymentStoreError>;
        async fn debit_balance_clamped(&self, user_id: i64, amount: Tokens) -> Result<Option<BalanceChange>, PaymentStoreError>;
        async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditEntry, PaymentStoreError>;
        async fn fetch_generation(&self, id: &str) -> Result<Option<GenerationRecord>, PaymentStoreError>;
        async fn try_claim_refund_flag(&self, generation_id: &str) -> Result<Option<GenerationRecord>, PaymentStoreError>;
    }
}

mock! {
    pub Processor {}
    impl PaymentProcessor for Processor {
        async fn create_order(&self, order: NewProcessorOrder) -> Result<ProcessorOrder, ProcessorError>;
        async fn get_order_status(&self, uuid: &OrderId) -> Result<ProcessorOrderStatus, ProcessorError>;
    }
}
