use std::{sync::Arc, time::Duration};

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use tribute_payment_engine::{
    traits::{FlatRatePromo, NoPartner, NoPromo, Notifier, PromoRules},
    PaymentFlowApi,
    SideChannels,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{TelegramNotifier, TributeApi},
    middleware::HmacMiddlewareFactory,
    routes::{health, CreateOrderRoute, OrderStatusRoute},
    webhook_routes::tribute_webhook,
};

pub const SIGNATURE_HEADER: &str = "trbt-signature";

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
) -> Result<actix_web::dev::Server, ServerError> {
    let processor = TributeApi::new(&config.tribute).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let channels = side_channels(&config);
        let flow_api = PaymentFlowApi::new(db.clone(), channels);
        let webhook_secret = config.tribute.webhook_secret();
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("trb::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(processor.clone()))
            .app_data(web::Data::new(config.clone()));
        let tribute_scope = web::scope("/api/tribute")
            .service(CreateOrderRoute::<SqliteDatabase, TributeApi>::new())
            .service(OrderStatusRoute::<SqliteDatabase, TributeApi>::new())
            .service(
                web::resource("/webhook")
                    .route(web::post().to(tribute_webhook::<SqliteDatabase>))
                    .wrap(HmacMiddlewareFactory::new(SIGNATURE_HEADER, webhook_secret)),
            );
        app.service(health).service(tribute_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

fn side_channels(config: &ServerConfig) -> SideChannels {
    let mut channels = SideChannels::default().with_partner(Arc::new(NoPartner));
    if let Some(token) = config.telegram_bot_token.clone() {
        let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(token));
        channels = channels.with_notifier(notifier);
    }
    let promo: Arc<dyn PromoRules> = if config.promo_bonus_percent > 0 {
        Arc::new(FlatRatePromo { percent: config.promo_bonus_percent })
    } else {
        Arc::new(NoPromo)
    };
    channels = channels.with_promo(promo);
    if let Some(chat_id) = config.operator_chat_id {
        channels = channels.with_operator_chat(chat_id);
    }
    channels
}
