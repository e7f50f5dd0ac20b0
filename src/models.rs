use crate::connectors::PushReceipt;
use crate::pricing::{FeeSchedule, MarginPolicy, Marketplace, PriceQuote};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub product_id: Option<String>,
    pub cost: f64,
    #[serde(alias = "newPrice")]
    pub observed_price: f64,
    #[serde(default)]
    pub source_marketplace: Marketplace,
    /// Omitted means every marketplace in the fee schedule.
    #[serde(default)]
    pub marketplaces: Option<Vec<Marketplace>>,
    #[serde(default)]
    pub fulfillment_fee: Option<f64>,
    /// Hand the computed prices to the configured price publisher.
    #[serde(default)]
    pub push: bool,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub product_id: Option<String>,
    pub source_marketplace: Marketplace,
    pub source_price: f64,
    pub cost: f64,
    pub target_margin_percent: f64,
    pub meets_minimum: bool,
    pub prices: BTreeMap<Marketplace, f64>,
    pub push_results: Option<BTreeMap<Marketplace, PushReceipt>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub cost: f64,
    pub target_margin: f64,
    pub marketplace: Marketplace,
    #[serde(default)]
    pub fulfillment_fee: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub quote: PriceQuote,
    pub meets_minimum: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginRequest {
    pub price: f64,
    pub cost: f64,
    pub marketplace: Marketplace,
    #[serde(default)]
    pub fulfillment_fee: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsRequest {
    pub cost: f64,
    pub target_margin: f64,
    #[serde(default)]
    pub marketplaces: Option<Vec<Marketplace>>,
    #[serde(default)]
    pub fulfillment_fee: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsResponse {
    pub target_margin_fraction: f64,
    pub meets_minimum: bool,
    pub prices: BTreeMap<Marketplace, f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplacesResponse<'a> {
    pub fees: &'a FeeSchedule,
    pub policy: &'a MarginPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSyncRequest {
    pub items: Vec<SyncRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
