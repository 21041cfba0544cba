//! HMAC middleware for Actix Web.
//!
//! Tribute signs the raw body of every webhook delivery with the shop's API key and sends the
//! hex HMAC-SHA256 digest in the `trbt-signature` header. This middleware verifies that digest
//! before any routing or payload parsing happens, and re-sets the consumed body so the wrapped
//! handler can read it again.
//!
//! A request with a missing or invalid signature is rejected with 401. When no signing secret is
//! configured at all, every request is rejected: an unverifiable financial webhook is never
//! processed.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ResponseError},
    http::{header::ContentType, StatusCode},
    web,
    Error,
    HttpResponse,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use thiserror::Error as ThisError;
use trb_common::Secret;

use crate::helpers::verify_hmac_hex;

/// A rejected webhook delivery. Rendered as `401 {"error": ...}` like every other error body
/// this server produces.
#[derive(Debug, ThisError)]
#[error("{0}")]
pub struct UnauthorizedWebhook(&'static str);

impl ResponseError for UnauthorizedWebhook {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.0 }).to_string())
    }
}

pub struct HmacMiddlewareFactory {
    hmac_header: String,
    key: Option<Secret<String>>,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Option<Secret<String>>) -> Self {
        HmacMiddlewareFactory { hmac_header: hmac_header.into(), key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService {
            hmac_header: self.hmac_header.clone(),
            key: self.key.clone(),
            service: Rc::new(service),
        }))
    }
}

pub struct HmacMiddlewareService<S> {
    hmac_header: String,
    key: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = self.key.clone();
        let hmac_header = self.hmac_header.clone();
        Box::pin(async move {
            trace!("🔐️ Checking HMAC for request");
            let Some(key) = key else {
                warn!("🔐️ No webhook signing secret is configured. Denying access.");
                return Err(UnauthorizedWebhook("Webhook signature verification is not configured.").into());
            };
            let signature = req
                .headers()
                .get(&hmac_header)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    warn!("🔐️ No HMAC signature found in request. Denying access.");
                    Error::from(UnauthorizedWebhook("No HMAC signature found."))
                })?;
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            if verify_hmac_hex(key.reveal(), data.as_ref(), &signature) {
                trace!("🔐️ HMAC check for request ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid HMAC signature found in request. Denying access.");
                Err(UnauthorizedWebhook("Invalid HMAC signature.").into())
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
