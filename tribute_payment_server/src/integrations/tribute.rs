//! The Tribute REST client.
//!
//! Implements [`PaymentProcessor`] against Tribute's shop API: minting orders and querying their
//! live status. All authentication is a single `Api-Key` header carrying the shop API key.

use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tribute_payment_engine::{
    db_types::OrderId,
    traits::{NewProcessorOrder, PaymentProcessor, ProcessorError, ProcessorOrder, ProcessorOrderStatus},
};

use crate::config::TributeConfig;

#[derive(Clone)]
pub struct TributeApi {
    base_url: String,
    client: Arc<Client>,
}

impl TributeApi {
    pub fn new(config: &TributeConfig) -> Result<Self, ProcessorError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| ProcessorError::Initialization(e.to_string()))?;
        headers.insert("Api-Key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| ProcessorError::Initialization(e.to_string()))?;
        Ok(Self { base_url: config.base_url.clone(), client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, ProcessorError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ProcessorError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ProcessorError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ProcessorError::RequestError(e.to_string()))?;
            Err(ProcessorError::QueryError { status, message })
        }
    }
}

/// An order as Tribute returns it. Field names have drifted across API revisions, so the old
/// spellings are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
struct TributeOrder {
    #[serde(alias = "id")]
    uuid: String,
    #[serde(default, alias = "link", alias = "web_app_link")]
    payment_url: Option<String>,
    #[serde(default)]
    status: Option<ProcessorOrderStatus>,
}

impl PaymentProcessor for TributeApi {
    async fn create_order(&self, order: NewProcessorOrder) -> Result<ProcessorOrder, ProcessorError> {
        debug!("Creating Tribute order for customer {} ({} {})", order.customer_id, order.amount, order.currency);
        let result = self.rest_query::<TributeOrder, _>(Method::POST, "/shop/orders", Some(&order)).await?;
        let payment_url = result.payment_url.ok_or_else(|| {
            ProcessorError::JsonError(format!("Order {} was created without a payment link", result.uuid))
        })?;
        info!("Created Tribute order {}", result.uuid);
        Ok(ProcessorOrder { uuid: OrderId(result.uuid), payment_url })
    }

    async fn get_order_status(&self, uuid: &OrderId) -> Result<ProcessorOrderStatus, ProcessorError> {
        let path = format!("/shop/orders/{}", uuid.as_str());
        let result = self.rest_query::<TributeOrder, ()>(Method::GET, &path, None).await?;
        let status = result.status.unwrap_or(ProcessorOrderStatus::Pending);
        debug!("Tribute reports order {uuid} as {status}");
        Ok(status)
    }
}
