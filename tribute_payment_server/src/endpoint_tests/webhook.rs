use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use tribute_payment_engine::{
    db_types::{AuditEntry, AuditReason, BalanceChange, OrderStatusType},
    traits::PaymentStoreError,
    PaymentFlowApi,
    SideChannels,
};
use trb_common::{Secret, Tokens};

use super::{
    helpers::{post_webhook, sign, test_order, test_user, TEST_API_KEY},
    mocks::MockPaymentStore,
};
use crate::{middleware::HmacMiddlewareFactory, server::SIGNATURE_HEADER, webhook_routes::tribute_webhook};

const SUCCESS_BODY: &str = r#"{"name":"shopOrderSuccess","payload":{"uuid":"ord-1"}}"#;
const REFUND_BODY: &str = r#"{"name":"shopOrderRefunded","payload":{"uuid":"ord-1"}}"#;

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let err = post_webhook(None, SUCCESS_BODY, untouched_store).await.expect_err("Expected error");
    assert_eq!(err, "No HMAC signature found.");
}

#[actix_web::test]
async fn invalid_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let err = post_webhook(Some("deadbeef"), SUCCESS_BODY, untouched_store).await.expect_err("Expected error");
    assert_eq!(err, "Invalid HMAC signature.");
}

#[actix_web::test]
async fn unconfigured_secret_rejects_everything() {
    let _ = env_logger::try_init().ok();
    let sig = sign(SUCCESS_BODY);
    let err = post_webhook(Some(&sig), SUCCESS_BODY, no_secret).await.expect_err("Expected error");
    assert_eq!(err, "Webhook signature verification is not configured.");
}

#[actix_web::test]
async fn unknown_event_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"name":"subscriptionRenewed","payload":{}}"#;
    let sig = sign(body);
    let (status, body) = post_webhook(Some(&sig), body, untouched_store).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true,"message":"Event acknowledged. No action taken."}"#);
}

#[actix_web::test]
async fn malformed_body_is_acknowledged_as_failure() {
    let _ = env_logger::try_init().ok();
    let body = "not json at all";
    let sig = sign(body);
    let (status, body) = post_webhook(Some(&sig), body, untouched_store).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":false,"message":"Could not parse webhook body."}"#);
}

#[actix_web::test]
async fn success_event_credits_the_buyer() {
    let _ = env_logger::try_init().ok();
    let sig = sign(SUCCESS_BODY);
    let (status, body) = post_webhook(Some(&sig), SUCCESS_BODY, success_flow).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true,"message":"Order processed successfully."}"#);
}

#[actix_web::test]
async fn duplicate_success_event_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let sig = sign(SUCCESS_BODY);
    let (status, body) = post_webhook(Some(&sig), SUCCESS_BODY, lost_claim).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true,"message":"Already processed."}"#);
}

#[actix_web::test]
async fn unknown_order_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let sig = sign(SUCCESS_BODY);
    let (status, body) = post_webhook(Some(&sig), SUCCESS_BODY, no_such_order).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true,"message":"Unknown order. No action taken."}"#);
}

#[actix_web::test]
async fn refund_event_revokes_the_tokens() {
    let _ = env_logger::try_init().ok();
    let sig = sign(REFUND_BODY);
    let (status, body) = post_webhook(Some(&sig), REFUND_BODY, refund_flow).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true,"message":"Refund processed."}"#);
}

#[actix_web::test]
async fn backend_failure_asks_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let sig = sign(SUCCESS_BODY);
    let (status, body) = post_webhook(Some(&sig), SUCCESS_BODY, broken_store).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"error":"Could not process event."}"#);
}

//--------------------------------------   Service configs    ---------------------------------------------------------

fn register(cfg: &mut ServiceConfig, store: MockPaymentStore, secret: Option<&str>) {
    let api = PaymentFlowApi::new(store, SideChannels::default());
    let key = secret.map(|s| Secret::new(s.to_string()));
    cfg.app_data(web::Data::new(api)).service(
        web::resource("/webhook")
            .route(web::post().to(tribute_webhook::<MockPaymentStore>))
            .wrap(HmacMiddlewareFactory::new(SIGNATURE_HEADER, key)),
    );
}

// A store that must not be called at all. Any call panics the test.
fn untouched_store(cfg: &mut ServiceConfig) {
    register(cfg, MockPaymentStore::new(), Some(TEST_API_KEY));
}

fn no_secret(cfg: &mut ServiceConfig) {
    register(cfg, MockPaymentStore::new(), None);
}

fn success_flow(cfg: &mut ServiceConfig) {
    let mut store = MockPaymentStore::new();
    store.expect_claim_pending_order().returning(|_| Ok(Some(test_order(OrderStatusType::Paid))));
    store.expect_fetch_user().returning(|_| Ok(Some(test_user(10))));
    store
        .expect_credit_balance()
        .withf(|&user_id, &amount| user_id == 42 && amount == Tokens::from(50))
        .returning(|_, _| {
            Ok(Some(BalanceChange { old_balance: Tokens::from(10), new_balance: Tokens::from(60) }))
        });
    store.expect_insert_audit_entry().returning(|entry| {
        assert_eq!(entry.reason, AuditReason::Payment);
        assert_eq!(entry.reference_id.as_deref(), Some("ord-1"));
        Ok(audit_entry(entry.reason, entry.old_balance, entry.new_balance))
    });
    register(cfg, store, Some(TEST_API_KEY));
}

fn lost_claim(cfg: &mut ServiceConfig) {
    let mut store = MockPaymentStore::new();
    store.expect_claim_pending_order().returning(|_| Ok(None));
    store.expect_fetch_order_by_uuid().returning(|_| Ok(Some(test_order(OrderStatusType::Paid))));
    register(cfg, store, Some(TEST_API_KEY));
}

fn no_such_order(cfg: &mut ServiceConfig) {
    let mut store = MockPaymentStore::new();
    store.expect_claim_pending_order().returning(|_| Ok(None));
    store.expect_fetch_order_by_uuid().returning(|_| Ok(None));
    register(cfg, store, Some(TEST_API_KEY));
}

fn refund_flow(cfg: &mut ServiceConfig) {
    let mut store = MockPaymentStore::new();
    store.expect_claim_paid_order().returning(|_| Ok(Some(test_order(OrderStatusType::Refunded))));
    store.expect_fetch_user().returning(|_| Ok(Some(test_user(60))));
    store
        .expect_debit_balance_clamped()
        .withf(|&user_id, &amount| user_id == 42 && amount == Tokens::from(50))
        .returning(|_, _| {
            Ok(Some(BalanceChange { old_balance: Tokens::from(60), new_balance: Tokens::from(10) }))
        });
    store.expect_insert_audit_entry().returning(|entry| {
        assert_eq!(entry.reason, AuditReason::Refund);
        Ok(audit_entry(entry.reason, entry.old_balance, entry.new_balance))
    });
    register(cfg, store, Some(TEST_API_KEY));
}

fn broken_store(cfg: &mut ServiceConfig) {
    let mut store = MockPaymentStore::new();
    store
        .expect_claim_pending_order()
        .returning(|_| Err(PaymentStoreError::DatabaseError("the database is on fire".into())));
    register(cfg, store, Some(TEST_API_KEY));
}

fn audit_entry(reason: AuditReason, old_balance: Tokens, new_balance: Tokens) -> AuditEntry {
    AuditEntry {
        id: 1,
        user_id: 42,
        old_balance,
        new_balance,
        change_amount: new_balance - old_balance,
        reason,
        reference_id: Some("ord-1".into()),
        metadata: None,
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 1).unwrap(),
    }
}
