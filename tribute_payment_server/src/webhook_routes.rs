//----------------------------------------------   Webhook  ----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error, info, trace, warn};
use tribute_payment_engine::{
    db_types::OrderId,
    traits::PaymentStore,
    PaymentFlowApi,
    PaymentFlowError,
    PaymentOutcome,
};

use crate::data_objects::{EventKind, JsonResponse, WebhookEvent};

/// The Tribute webhook entry point. The HMAC middleware has already verified the body signature
/// by the time this handler runs.
///
/// Response policy: every outcome the gateway can classify is answered with 200, including
/// duplicates, unknown orders and events it cannot act on. Tribute retries on non-2xx, and a
/// retry only helps for transient failures, so only unhandled backend errors return 500.
pub async fn tribute_webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<B>>,
) -> HttpResponse
where
    B: PaymentStore,
{
    trace!("💸️ Received webhook request: {}", req.uri());
    let event = match WebhookEvent::from_body(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("💸️ Could not parse webhook body. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Could not parse webhook body."));
        },
    };
    let mut kind = event.kind();
    if kind == EventKind::Unknown {
        kind = event.legacy_kind();
        if kind != EventKind::Unknown {
            debug!("💸️ Unrecognized event name {:?}. Falling back to payload status.", event.name);
        }
    }
    let result = match kind {
        EventKind::TokenCharge => {
            info!("💸️ Token charge event received. No order to act on.");
            JsonResponse::success("Event acknowledged.")
        },
        EventKind::RecurringCancelled => {
            info!("💸️ Subscription cancellation received for customer {:?}.", event.payload.customer_id);
            JsonResponse::success("Event acknowledged.")
        },
        EventKind::Unknown => {
            info!("💸️ Unknown event {:?} received. No action taken.", event.name);
            JsonResponse::success("Event acknowledged. No action taken.")
        },
        EventKind::OrderSuccess | EventKind::OrderFailed | EventKind::OrderRefunded => {
            let Some(uuid) = event.payload.order_id() else {
                warn!("💸️ {kind:?} event carried no order uuid. No action taken.");
                return HttpResponse::Ok().json(JsonResponse::success("Event acknowledged. No action taken."));
            };
            let skip_notifications = event.payload.suppress_notifications();
            let outcome = match kind {
                EventKind::OrderSuccess => api.handle_payment_success(&uuid, skip_notifications).await,
                EventKind::OrderFailed => api.handle_payment_failure(&uuid).await,
                EventKind::OrderRefunded => api.handle_refund(&uuid, skip_notifications).await,
                _ => unreachable!("outer match covers only order events"),
            };
            match apply_outcome(&uuid, outcome) {
                Ok(response) => response,
                Err(response) => return response,
            }
        },
    };
    HttpResponse::Ok().json(result)
}

/// Maps a flow outcome to the webhook response. `Err` carries a ready non-200 response.
fn apply_outcome(
    uuid: &OrderId,
    outcome: Result<PaymentOutcome, PaymentFlowError>,
) -> Result<JsonResponse, HttpResponse> {
    match outcome {
        Ok(PaymentOutcome::Credited { order, change, .. }) => {
            info!(
                "💸️ Order {} processed successfully. User #{} now has {}.",
                order.uuid, order.user_id, change.new_balance
            );
            Ok(JsonResponse::success("Order processed successfully."))
        },
        Ok(PaymentOutcome::AlreadyProcessed) => {
            info!("💸️ Order {uuid} already processed.");
            Ok(JsonResponse::success("Already processed."))
        },
        Ok(PaymentOutcome::Failed(order)) => {
            info!("💸️ Order {} marked as failed.", order.uuid);
            Ok(JsonResponse::success("Order marked as failed."))
        },
        Ok(PaymentOutcome::Refunded { order, change }) => {
            info!(
                "💸️ Order {} refunded. User #{} now has {}.",
                order.uuid, order.user_id, change.new_balance
            );
            Ok(JsonResponse::success("Refund processed."))
        },
        Ok(PaymentOutcome::UnreconciledPaid(order)) => {
            // Acknowledge so the sender stops retrying; the anomaly is already logged at
            // error level by the flow.
            Ok(JsonResponse::success(format!("Order {} recorded. User #{} is unknown.", order.uuid, order.user_id)))
        },
        Ok(PaymentOutcome::UnreconciledRefund(order)) => {
            Ok(JsonResponse::success(format!("Refund for {} recorded. User #{} is unknown.", order.uuid, order.user_id)))
        },
        Err(PaymentFlowError::OrderNotFound(id)) => {
            warn!("💸️ Event for unknown order {id}. No action taken.");
            Ok(JsonResponse::success("Unknown order. No action taken."))
        },
        Err(e) => {
            error!("💸️ Could not process event for order {uuid}. {e}");
            Err(HttpResponse::InternalServerError()
                .json(serde_json::json!({ "error": "Could not process event." })))
        },
    }
}
