use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::json;
use tribute_payment_engine::{
    db_types::{Currency, OrderId, OrderStatusType},
    traits::{ProcessorOrder, ProcessorOrderStatus},
    PaymentFlowApi,
    SideChannels,
};

use super::{
    helpers::{get_request, post_request, test_order},
    mocks::{MockPaymentStore, MockProcessor},
};
use crate::{
    config::ServerConfig,
    routes::{CreateOrderRoute, OrderStatusRoute},
};

const PAY_URL: &str = "https://t.me/tribute/app?startapp=ord-1";

#[actix_web::test]
async fn create_order_without_user_header() {
    let _ = env_logger::try_init().ok();
    let body = json!({"package_id": "starter", "currency": "eur"});
    let err = post_request("", "/create-order", body, no_calls).await.expect_err("Expected error");
    assert_eq!(err, "Acting user could not be identified. Missing or malformed x-user-id header");
}

#[actix_web::test]
async fn create_order_for_unknown_package() {
    let _ = env_logger::try_init().ok();
    let body = json!({"package_id": "galactic", "currency": "eur"});
    let err = post_request("42", "/create-order", body, no_calls).await.expect_err("Expected error");
    assert_eq!(err, "Unknown token package. galactic (eur)");
}

#[actix_web::test]
async fn create_order_in_usd_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = json!({"package_id": "starter", "currency": "usd"});
    let err = post_request("42", "/create-order", body, no_calls).await.expect_err("Expected error");
    assert_eq!(err, "Unknown token package. usd packages are not for sale");
}

#[actix_web::test]
async fn create_order_returns_the_payment_link() {
    let _ = env_logger::try_init().ok();
    let body = json!({"package_id": "starter", "currency": "eur"});
    let (status, body) = post_request("42", "/create-order", body, mint_order).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!(r#"{{"success":true,"payment_url":"{PAY_URL}","order_uuid":"ord-1"}}"#));
}

#[actix_web::test]
async fn order_status_answers_from_a_terminal_local_row() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/order/ord-1/status", paid_order).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"status":"paid","tokens":50,"paid_at":"2024-06-01T12:00:00Z"}"#);
}

#[actix_web::test]
async fn pending_order_status_polls_the_processor() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/order/ord-1/status", pending_order).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"status":"pending","tokens":50}"#);
}

//--------------------------------------   Service configs    ---------------------------------------------------------

fn register(cfg: &mut ServiceConfig, store: MockPaymentStore, processor: MockProcessor) {
    let api = PaymentFlowApi::new(store, SideChannels::default());
    cfg.service(CreateOrderRoute::<MockPaymentStore, MockProcessor>::new())
        .service(OrderStatusRoute::<MockPaymentStore, MockProcessor>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(processor))
        .app_data(web::Data::new(ServerConfig::default()));
}

// Requests that fail validation before touching the store or the processor.
fn no_calls(cfg: &mut ServiceConfig) {
    register(cfg, MockPaymentStore::new(), MockProcessor::new());
}

fn mint_order(cfg: &mut ServiceConfig) {
    let mut processor = MockProcessor::new();
    processor
        .expect_create_order()
        .withf(|order| order.amount == 499 && order.currency == Currency::Eur && order.customer_id == "42")
        .returning(|_| Ok(ProcessorOrder { uuid: OrderId("ord-1".into()), payment_url: PAY_URL.into() }));
    let mut store = MockPaymentStore::new();
    store.expect_insert_order().returning(|_| Ok((test_order(OrderStatusType::Pending), true)));
    register(cfg, store, processor);
}

fn paid_order(cfg: &mut ServiceConfig) {
    let mut store = MockPaymentStore::new();
    store.expect_fetch_order_by_uuid().returning(|_| Ok(Some(test_order(OrderStatusType::Paid))));
    register(cfg, store, MockProcessor::new());
}

fn pending_order(cfg: &mut ServiceConfig) {
    let mut store = MockPaymentStore::new();
    store.expect_fetch_order_by_uuid().times(2).returning(|_| Ok(Some(test_order(OrderStatusType::Pending))));
    let mut processor = MockProcessor::new();
    processor.expect_get_order_status().returning(|_| Ok(ProcessorOrderStatus::Pending));
    register(cfg, store, processor);
}
