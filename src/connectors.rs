use crate::config::AppConfig;
use crate::http::build_client;
use crate::pricing::Marketplace;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushStatus {
    Logged,
    Delivered,
    Failed,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReceipt {
    pub marketplace: Marketplace,
    pub price: f64,
    pub status: PushStatus,
    pub detail: Option<String>,
    pub pushed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate<'a> {
    pub product_id: Option<&'a str>,
    pub marketplace: &'a Marketplace,
    pub price: f64,
    pub currency: &'a str,
}

#[derive(Clone)]
enum PublishTarget {
    Log,
    Webhook { url: String, http: Client },
}

/// Hands computed prices to the outside world. Without a webhook configured
/// updates are only logged; a failed delivery is reported in the receipt and
/// never fails the sync that produced it.
#[derive(Clone)]
pub struct PricePublisher {
    currency: String,
    target: PublishTarget,
}

impl PricePublisher {
    pub fn log_only(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            target: PublishTarget::Log,
        }
    }

    pub fn webhook(url: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            target: PublishTarget::Webhook {
                url: url.into(),
                http: build_client(),
            },
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        match &config.webhook_url {
            Some(url) => Self::webhook(url.clone(), config.currency.clone()),
            None => Self::log_only(config.currency.clone()),
        }
    }

    pub async fn publish(
        &self,
        product_id: Option<&str>,
        marketplace: &Marketplace,
        price: f64,
    ) -> PushReceipt {
        let update = PriceUpdate {
            product_id,
            marketplace,
            price,
            currency: &self.currency,
        };
        let (status, detail) = match &self.target {
            PublishTarget::Log => {
                info!(
                    target = "pricesync.push",
                    product_id = product_id.unwrap_or("-"),
                    marketplace = %marketplace,
                    price,
                    currency = %self.currency,
                    "price update (log only)"
                );
                (PushStatus::Logged, None)
            }
            PublishTarget::Webhook { url, http } => match send(http, url, &update).await {
                Ok(()) => (PushStatus::Delivered, None),
                Err(err) => {
                    warn!(
                        target = "pricesync.push",
                        marketplace = %marketplace,
                        error = %err,
                        "price webhook failed"
                    );
                    (PushStatus::Failed, Some(err.to_string()))
                }
            },
        };
        PushReceipt {
            marketplace: marketplace.clone(),
            price,
            status,
            detail,
            pushed_at: Utc::now(),
        }
    }

    pub async fn publish_all(
        &self,
        product_id: Option<&str>,
        prices: &BTreeMap<Marketplace, f64>,
    ) -> BTreeMap<Marketplace, PushReceipt> {
        let mut receipts = BTreeMap::new();
        for (marketplace, price) in prices {
            let receipt = self.publish(product_id, marketplace, *price).await;
            receipts.insert(marketplace.clone(), receipt);
        }
        receipts
    }
}

async fn send(http: &Client, url: &str, update: &PriceUpdate<'_>) -> Result<(), PublishError> {
    let response = http
        .post(url)
        .json(update)
        .send()
        .await
        .map_err(|err| PublishError::Request(err.to_string()))?;
    if !response.status().is_success() {
        return Err(PublishError::Status(response.status().as_u16()));
    }
    Ok(())
}
