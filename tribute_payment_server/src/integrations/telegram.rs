//! Best-effort Telegram notifications via the Bot API `sendMessage` call.

use async_trait::async_trait;
use log::trace;
use reqwest::Client;
use serde_json::json;
use tribute_payment_engine::traits::{Notifier, NotifyError};
use trb_common::Secret;

#[derive(Clone)]
pub struct TelegramNotifier {
    token: Secret<String>,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(token: Secret<String>) -> Self {
        Self { token, client: Client::new() }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        trace!("📬️ Sending Telegram message to chat {chat_id}");
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token.reveal());
        let response = self
            .client
            .post(url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError(format!("sendMessage returned {status}: {body}")))
        }
    }
}
