use crate::connectors::PricePublisher;
use crate::metrics;
use crate::models::{SyncRequest, SyncResponse};
use crate::pricing::{Marketplace, PriceSyncEngine, PricingError};
use std::time::Instant;
use tracing::info;

/// Runs a sync request end to end: margin derivation, repricing and the
/// optional hand-off of the new prices to the publisher.
#[derive(Clone)]
pub struct SyncService {
    pub engine: PriceSyncEngine,
    publisher: PricePublisher,
}

impl SyncService {
    pub fn new(engine: PriceSyncEngine, publisher: PricePublisher) -> Self {
        Self { engine, publisher }
    }

    pub async fn run(&self, request: SyncRequest) -> Result<SyncResponse, PricingError> {
        let started = Instant::now();
        let targets: &[Marketplace] = match &request.marketplaces {
            Some(list) if list.is_empty() => {
                return Err(PricingError::invalid_input(
                    "marketplaces",
                    "omit the field to sync every marketplace; an empty list syncs nothing",
                ));
            }
            Some(list) => list.as_slice(),
            None => &[],
        };

        let result = self.engine.sync_across_marketplaces(
            request.observed_price,
            request.cost,
            &request.source_marketplace,
            targets,
            request.fulfillment_fee,
        )?;
        let prices = result.prices();

        let push_results = if request.push {
            Some(
                self.publisher
                    .publish_all(request.product_id.as_deref(), &prices)
                    .await,
            )
        } else {
            None
        };

        info!(
            target = "pricesync.sync",
            product_id = request.product_id.as_deref().unwrap_or("-"),
            source = %result.source_marketplace,
            source_price = result.source_price,
            margin_percent = result.target_margin_percent,
            marketplaces = prices.len(),
            "prices synced"
        );
        metrics::sync_computed(
            prices.len(),
            push_results.is_some(),
            started.elapsed().as_micros(),
        );

        Ok(SyncResponse {
            product_id: request.product_id,
            source_marketplace: result.source_marketplace,
            source_price: result.source_price,
            cost: request.cost,
            target_margin_percent: result.target_margin_percent,
            meets_minimum: result.meets_minimum,
            prices,
            push_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::PushStatus;
    use crate::pricing::PricingErrorKind;

    fn service() -> SyncService {
        SyncService::new(PriceSyncEngine::default(), PricePublisher::log_only("USD"))
    }

    fn request() -> SyncRequest {
        SyncRequest {
            product_id: Some("sku-42".into()),
            cost: 10.0,
            observed_price: 20.0,
            source_marketplace: Marketplace::Walmart,
            marketplaces: Some(vec![Marketplace::Shopify, Marketplace::Walmart]),
            fulfillment_fee: None,
            push: false,
        }
    }

    #[tokio::test]
    async fn run_returns_prices_without_push() {
        let resp = service().run(request()).await.expect("sync");
        assert_eq!(resp.product_id.as_deref(), Some("sku-42"));
        assert_eq!(resp.target_margin_percent, 35.0);
        assert_eq!(resp.prices[&Marketplace::Shopify], 16.59);
        assert!(resp.push_results.is_none());
    }

    #[tokio::test]
    async fn run_pushes_when_requested() {
        let resp = service()
            .run(SyncRequest {
                push: true,
                ..request()
            })
            .await
            .expect("sync");
        let receipts = resp.push_results.expect("receipts");
        assert_eq!(receipts.len(), 2);
        assert!(receipts.values().all(|r| r.status == PushStatus::Logged));
    }

    #[tokio::test]
    async fn run_rejects_empty_target_list() {
        let err = service()
            .run(SyncRequest {
                marketplaces: Some(vec![]),
                ..request()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn run_defaults_to_full_schedule() {
        let resp = service()
            .run(SyncRequest {
                marketplaces: None,
                ..request()
            })
            .await
            .expect("sync");
        assert_eq!(resp.prices.len(), 4);
    }
}
