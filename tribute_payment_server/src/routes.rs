//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are async and must never block the worker thread: database and processor calls are
//! awaited futures. The webhook handler lives in [`crate::webhook_routes`].

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use tribute_payment_engine::{
    db_types::OrderId,
    traits::{PaymentProcessor, PaymentStore, RedirectUrls},
    PaymentFlowApi,
};

use crate::{
    config::ServerConfig,
    data_objects::{CreateOrderRequest, CreateOrderResult, OrderStatusResponse},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// The acting user, as injected by the upstream auth gateway in the `x-user-id` header. This
/// server never authenticates users itself; a request without the header is unauthorized.
pub fn acting_user_id(req: &HttpRequest) -> Result<i64, ServerError> {
    req.headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ServerError::UnidentifiedUser("Missing or malformed x-user-id header".to_string()))
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(create_order => Post "/create-order" impl PaymentStore, PaymentProcessor);
/// Route handler for the create-order endpoint
///
/// Resolves the requested package against the catalog, mints the order with Tribute, stores the
/// local shadow row and returns the payment link. Unknown package/currency combinations are a
/// 400; a processor outage is a 500 carrying the processor's message.
pub async fn create_order<B, P>(
    req: HttpRequest,
    config: web::Data<ServerConfig>,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<PaymentFlowApi<B>>,
    processor: web::Data<P>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    P: PaymentProcessor,
{
    let user_id = acting_user_id(&req)?;
    let CreateOrderRequest { package_id, currency, email } = body.into_inner();
    debug!("💻️ POST create_order for user #{user_id}: {package_id} ({currency:?})");
    let package = config.find_package(&package_id, currency)?;
    let urls = RedirectUrls { success_url: config.success_url.clone(), fail_url: config.fail_url.clone() };
    let created = api.create_order(processor.as_ref(), user_id, package, email, &urls).await.map_err(|e| {
        debug!("💻️ Could not create order. {e}");
        ServerError::from(e)
    })?;
    let result =
        CreateOrderResult { success: true, payment_url: created.payment_url, order_uuid: created.uuid };
    Ok(HttpResponse::Ok().json(result))
}

route!(order_status => Get "/order/{uuid}/status" impl PaymentStore, PaymentProcessor);
/// Route handler for the order status endpoint
///
/// Answers from the local shadow row when it is already terminal. For pending orders the
/// processor is polled, and any terminal answer is applied through the same path the webhook
/// uses, so polling and webhooks are interchangeable and neither can double-credit.
pub async fn order_status<B, P>(
    path: web::Path<OrderId>,
    api: web::Data<PaymentFlowApi<B>>,
    processor: web::Data<P>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentStore,
    P: PaymentProcessor,
{
    let uuid = path.into_inner();
    debug!("💻️ GET order_status for {uuid}");
    let (status, order) = api.check_order_status(processor.as_ref(), &uuid).await.map_err(|e| {
        debug!("💻️ Could not check order status. {e}");
        ServerError::from(e)
    })?;
    let response = OrderStatusResponse {
        success: true,
        status,
        tokens: order.as_ref().map(|o| o.tokens),
        paid_at: order.as_ref().and_then(|o| o.paid_at),
    };
    Ok(HttpResponse::Ok().json(response))
}
