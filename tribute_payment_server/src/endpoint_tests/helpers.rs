use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use tribute_payment_engine::db_types::{Currency, Order, OrderId, OrderStatusType, UserRow};
use trb_common::Tokens;

use crate::{helpers::calculate_hmac, server::SIGNATURE_HEADER};

// The signing secret every webhook test service is configured with. DO NOT use a real key here.
pub const TEST_API_KEY: &str = "test-tribute-api-key";

pub fn sign(body: &str) -> String {
    calculate_hmac(TEST_API_KEY, body.as_bytes())
}

pub async fn get_request(
    user_id: &str,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::get().uri(path);
    if !user_id.is_empty() {
        req = req.insert_header(("x-user-id", user_id));
    }
    send(req.to_request(), configure).await
}

pub async fn post_request(
    user_id: &str,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post().uri(path).set_json(&body);
    if !user_id.is_empty() {
        req = req.insert_header(("x-user-id", user_id));
    }
    send(req.to_request(), configure).await
}

pub async fn post_webhook(
    signature: Option<&str>,
    body: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post()
        .uri("/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    if let Some(signature) = signature {
        req = req.insert_header((SIGNATURE_HEADER, signature));
    }
    send(req.to_request(), configure).await
}

async fn send(
    req: actix_http::Request,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

//--------------------------------------      Fixtures        ---------------------------------------------------------

pub fn test_order(status: OrderStatusType) -> Order {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let terminal_paid = matches!(status, OrderStatusType::Paid | OrderStatusType::Refunded);
    Order {
        uuid: OrderId("ord-1".into()),
        user_id: 42,
        amount: 499,
        currency: Currency::Eur,
        tokens: Tokens::from(50),
        status,
        payment_url: Some("https://t.me/tribute/app?startapp=ord-1".into()),
        email: None,
        created_at: ts,
        updated_at: ts,
        paid_at: terminal_paid.then_some(ts),
        refunded_at: (status == OrderStatusType::Refunded).then_some(ts),
    }
}

pub fn test_user(balance: i64) -> UserRow {
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    UserRow { id: 42, chat_id: 424_242, balance: Tokens::from(balance), created_at: ts, updated_at: ts }
}
