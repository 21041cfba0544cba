use std::env;

use log::*;
use serde::Deserialize;
use tribute_payment_engine::db_types::{Currency, TokenPackage};
use trb_common::Secret;

use crate::errors::ServerError;

const DEFAULT_TRB_HOST: &str = "127.0.0.1";
const DEFAULT_TRB_PORT: u16 = 8362;
const DEFAULT_TRIBUTE_BASE_URL: &str = "https://tribute.tg/api/v1";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub tribute: TributeConfig,
    /// Telegram bot token for buyer/operator notifications. When unset, notifications are
    /// silently disabled.
    pub telegram_bot_token: Option<Secret<String>>,
    /// Telegram chat that receives operator copies of purchase notifications
    pub operator_chat_id: Option<i64>,
    /// Flat promotion bonus applied to every purchase, in percent. 0 disables the promotion.
    pub promo_bonus_percent: u32,
    /// Where the processor sends the buyer after checkout
    pub success_url: String,
    pub fail_url: String,
    /// The purchasable token package catalog
    pub packages: Vec<TokenPackage>,
}

/// Tribute API credentials. The API key doubles as the webhook signing secret.
#[derive(Clone, Debug, Default)]
pub struct TributeConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TRB_HOST.to_string(),
            port: DEFAULT_TRB_PORT,
            database_url: String::default(),
            tribute: TributeConfig { base_url: DEFAULT_TRIBUTE_BASE_URL.to_string(), api_key: Secret::default() },
            telegram_bot_token: None,
            operator_chat_id: None,
            promo_bonus_percent: 0,
            success_url: String::default(),
            fail_url: String::default(),
            packages: default_catalog(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TRB_HOST").ok().unwrap_or_else(|| DEFAULT_TRB_HOST.into());
        let port = env::var("TRB_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for TRB_PORT. {e} Using the default, {DEFAULT_TRB_PORT}, instead."
                    );
                    DEFAULT_TRB_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_TRB_PORT);
        let database_url = env::var("TRB_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TRB_DATABASE_URL is not set. Please set it to the URL for the payment database.");
            String::default()
        });
        let tribute = TributeConfig::from_env_or_default();
        let telegram_bot_token = match env::var("TRB_TELEGRAM_BOT_TOKEN") {
            Ok(token) if !token.is_empty() => Some(Secret::new(token)),
            _ => {
                info!("🪛️ TRB_TELEGRAM_BOT_TOKEN is not set. Telegram notifications are disabled.");
                None
            },
        };
        let operator_chat_id = env::var("TRB_OPERATOR_CHAT_ID").ok().and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Ignoring invalid TRB_OPERATOR_CHAT_ID ({s}): {e}"))
                .ok()
        });
        let promo_bonus_percent = env::var("TRB_PROMO_BONUS_PERCENT")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Ignoring invalid TRB_PROMO_BONUS_PERCENT ({s}): {e}"))
                    .ok()
            })
            .unwrap_or(0);
        let success_url = env::var("TRB_SUCCESS_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ TRB_SUCCESS_URL is not set. Buyers will not be redirected after checkout.");
            String::default()
        });
        let fail_url = env::var("TRB_FAIL_URL").ok().unwrap_or_else(|| success_url.clone());
        let packages = packages_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            tribute,
            telegram_bot_token,
            operator_chat_id,
            promo_bonus_percent,
            success_url,
            fail_url,
            packages,
        }
    }

    /// Looks up a purchasable package by id and currency. Usd packages exist for historical
    /// orders and cannot be bought.
    pub fn find_package(&self, id: &str, currency: Currency) -> Result<&TokenPackage, ServerError> {
        if !currency.is_purchasable() {
            return Err(ServerError::UnknownPackage(format!("{currency} packages are not for sale")));
        }
        self.packages
            .iter()
            .find(|p| p.id == id && p.currency == currency)
            .ok_or_else(|| ServerError::UnknownPackage(format!("{id} ({currency})")))
    }
}

impl TributeConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("TRB_TRIBUTE_BASE_URL").ok().unwrap_or_else(|| DEFAULT_TRIBUTE_BASE_URL.to_string());
        let api_key = env::var("TRB_TRIBUTE_API_KEY").ok().unwrap_or_else(|| {
            error!(
                "🪛️ TRB_TRIBUTE_API_KEY is not set. Orders cannot be created and every webhook will be rejected. \
                 Set it to the API key of your Tribute shop."
            );
            String::default()
        });
        Self { base_url, api_key: Secret::new(api_key) }
    }

    /// The webhook signing secret. Tribute signs webhook bodies with the shop API key.
    pub fn webhook_secret(&self) -> Option<Secret<String>> {
        if self.api_key.is_empty() {
            None
        } else {
            Some(self.api_key.clone())
        }
    }
}

/// Catalog rows accepted from `TRB_PACKAGES`. Identical to [`TokenPackage`]; kept separate so a
/// malformed catalog fails loudly at startup rather than at purchase time.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
    title: String,
    tokens: i64,
    amount: i64,
    currency: Currency,
}

fn packages_from_env_or_default() -> Vec<TokenPackage> {
    let Ok(raw) = env::var("TRB_PACKAGES") else {
        info!("🪛️ TRB_PACKAGES is not set. Using the built-in package catalog.");
        return default_catalog();
    };
    match serde_json::from_str::<Vec<CatalogEntry>>(&raw) {
        Ok(entries) if !entries.is_empty() => entries
            .into_iter()
            .map(|e| TokenPackage {
                id: e.id,
                title: e.title,
                tokens: e.tokens.into(),
                amount: e.amount,
                currency: e.currency,
            })
            .collect(),
        Ok(_) => {
            warn!("🪛️ TRB_PACKAGES is empty. Using the built-in package catalog.");
            default_catalog()
        },
        Err(e) => {
            error!("🪛️ Could not parse TRB_PACKAGES: {e}. Using the built-in package catalog.");
            default_catalog()
        },
    }
}

fn default_catalog() -> Vec<TokenPackage> {
    let packages = [
        ("starter", "Starter pack", 50, 499, 49_900),
        ("plus", "Plus pack", 150, 1_299, 129_900),
        ("pro", "Pro pack", 500, 3_499, 349_900),
    ];
    packages
        .into_iter()
        .flat_map(|(id, title, tokens, eur_cents, rub_kopeks)| {
            [(Currency::Eur, eur_cents), (Currency::Rub, rub_kopeks)].map(|(currency, amount)| TokenPackage {
                id: id.to_string(),
                title: title.to_string(),
                tokens: tokens.into(),
                amount,
                currency,
            })
        })
        .collect()
}
