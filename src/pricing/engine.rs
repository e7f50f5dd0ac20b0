use super::error::PricingError;
use super::fees::{FeeModel, FeeSchedule};
use super::marketplace::Marketplace;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, warn};

/// Margin realised below this fraction is flagged unless configured otherwise.
pub const DEFAULT_MINIMUM_MARGIN: f64 = 0.25;

/// `1 - margin - rate` at or below this is treated as zero. Margins that sum
/// with the rate to exactly one leave representation noise of order 1e-17.
const SOLVABLE_EPSILON: f64 = 1e-9;

const ONE_CENT: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownMarketplacePolicy {
    /// Price the marketplace as if it charged no fees.
    #[default]
    Fallback,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginPolicy {
    pub minimum_margin: f64,
    pub unknown_marketplace: UnknownMarketplacePolicy,
}

impl Default for MarginPolicy {
    fn default() -> Self {
        Self {
            minimum_margin: DEFAULT_MINIMUM_MARGIN,
            unknown_marketplace: UnknownMarketplacePolicy::default(),
        }
    }
}

impl MarginPolicy {
    pub fn meets_minimum(&self, margin: f64) -> bool {
        margin >= self.minimum_margin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub marketplace: Marketplace,
    pub cost: f64,
    pub target_margin_fraction: f64,
    pub computed_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginCheck {
    pub marketplace: Marketplace,
    pub price: f64,
    pub cost: f64,
    pub actual_margin_fraction: f64,
    pub meets_minimum: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub source_marketplace: Marketplace,
    pub source_price: f64,
    /// Margin realised on the source channel at `source_price`.
    pub target_margin_fraction: f64,
    pub target_margin_percent: f64,
    pub meets_minimum: bool,
    pub quotes: Vec<PriceQuote>,
}

impl SyncResult {
    pub fn prices(&self) -> BTreeMap<Marketplace, f64> {
        self.quotes
            .iter()
            .map(|quote| (quote.marketplace.clone(), quote.computed_price))
            .collect()
    }
}

/// Stateless margin arithmetic over an immutable fee schedule. Cloning is
/// cheap and every operation is a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct PriceSyncEngine {
    schedule: Arc<FeeSchedule>,
    policy: MarginPolicy,
}

impl PriceSyncEngine {
    pub fn new(schedule: FeeSchedule, policy: MarginPolicy) -> Result<Self, PricingError> {
        let minimum = policy.minimum_margin;
        if !minimum.is_finite() || !(0.0..1.0).contains(&minimum) {
            return Err(PricingError::Configuration(format!(
                "minimum margin {minimum} must be in [0, 1)"
            )));
        }
        Ok(Self {
            schedule: Arc::new(schedule),
            policy,
        })
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    pub fn policy(&self) -> &MarginPolicy {
        &self.policy
    }

    /// Fee model for `marketplace`, applying the unknown-marketplace policy
    /// when the schedule has no entry.
    pub fn fee_model(&self, marketplace: &Marketplace) -> Result<FeeModel, PricingError> {
        if let Some(model) = self.schedule.get(marketplace) {
            return Ok(*model);
        }
        match self.policy.unknown_marketplace {
            UnknownMarketplacePolicy::Fallback => {
                warn!(
                    target = "pricesync.engine",
                    marketplace = %marketplace,
                    "marketplace not in fee schedule; pricing with zero fees"
                );
                Ok(FeeModel::ZERO)
            }
            UnknownMarketplacePolicy::Reject => {
                Err(PricingError::UnknownMarketplace(marketplace.to_string()))
            }
        }
    }

    /// List price on `marketplace` that realises `target_margin` on `cost`.
    ///
    /// Solves `net(price) - cost = target_margin * price` where
    /// `net(price) = price * (1 - rate) - flat`, giving
    /// `price = (cost + flat) / (1 - target_margin - rate)`.
    ///
    /// The quote is always above `cost`: when cent rounding would land on or
    /// below it, the smallest whole-cent price above `cost` is returned.
    pub fn price_for_margin(
        &self,
        cost: f64,
        target_margin: f64,
        marketplace: &Marketplace,
        fulfillment_override: Option<f64>,
    ) -> Result<PriceQuote, PricingError> {
        ensure_positive("cost", cost)?;
        ensure_target_margin(target_margin)?;
        ensure_fulfillment(fulfillment_override)?;
        self.solve(cost, target_margin, marketplace, fulfillment_override)
    }

    /// Margin fraction realised when selling at `price` on `marketplace`.
    pub fn margin_for_price(
        &self,
        price: f64,
        cost: f64,
        marketplace: &Marketplace,
        fulfillment_override: Option<f64>,
    ) -> Result<MarginCheck, PricingError> {
        ensure_positive("price", price)?;
        ensure_positive("cost", cost)?;
        ensure_fulfillment(fulfillment_override)?;
        let model = self.fee_model(marketplace)?;
        let actual = (model.net_proceeds(price, fulfillment_override) - cost) / price;
        Ok(MarginCheck {
            marketplace: marketplace.clone(),
            price,
            cost,
            actual_margin_fraction: actual,
            meets_minimum: self.policy.meets_minimum(actual),
        })
    }

    /// Prices every marketplace in `marketplaces` at one target margin. An
    /// empty slice means every marketplace in the schedule.
    pub fn quote_all(
        &self,
        cost: f64,
        target_margin: f64,
        marketplaces: &[Marketplace],
        fulfillment_override: Option<f64>,
    ) -> Result<Vec<PriceQuote>, PricingError> {
        ensure_positive("cost", cost)?;
        ensure_target_margin(target_margin)?;
        ensure_fulfillment(fulfillment_override)?;
        let targets = if marketplaces.is_empty() {
            self.schedule.marketplaces().cloned().collect()
        } else {
            dedup(marketplaces)
        };
        self.solve_all(cost, target_margin, &targets, fulfillment_override)
    }

    /// Derives the margin realised at `observed_price` on `source` and reprices
    /// every target marketplace to realise the same margin. The source is
    /// always part of the target set so its recomputed price doubles as an
    /// identity check.
    pub fn sync_across_marketplaces(
        &self,
        observed_price: f64,
        cost: f64,
        source: &Marketplace,
        marketplaces: &[Marketplace],
        fulfillment_override: Option<f64>,
    ) -> Result<SyncResult, PricingError> {
        let check = self.margin_for_price(observed_price, cost, source, fulfillment_override)?;
        let margin = check.actual_margin_fraction;

        let mut targets: Vec<Marketplace> = if marketplaces.is_empty() {
            self.schedule.marketplaces().cloned().collect()
        } else {
            dedup(marketplaces)
        };
        if !targets.contains(source) {
            targets.push(source.clone());
        }

        // A loss-making source yields a negative margin; the targets are
        // repriced to the same loss rather than rejected.
        let quotes = self.solve_all(cost, margin, &targets, fulfillment_override)?;
        if let Some(identity) = quotes.iter().find(|q| &q.marketplace == source) {
            let drift = (identity.computed_price - observed_price).abs();
            if drift > 0.01 + 1e-9 {
                warn!(
                    target = "pricesync.engine",
                    marketplace = %source,
                    observed_price,
                    recomputed = identity.computed_price,
                    "source price does not round-trip"
                );
            }
        }
        debug!(
            target = "pricesync.engine",
            source = %source,
            margin,
            targets = quotes.len(),
            "synced prices across marketplaces"
        );

        Ok(SyncResult {
            source_marketplace: source.clone(),
            source_price: observed_price,
            target_margin_fraction: margin,
            target_margin_percent: round_cents(margin * 100.0),
            meets_minimum: check.meets_minimum,
            quotes,
        })
    }

    fn solve_all(
        &self,
        cost: f64,
        margin: f64,
        targets: &[Marketplace],
        fulfillment_override: Option<f64>,
    ) -> Result<Vec<PriceQuote>, PricingError> {
        targets
            .iter()
            .map(|marketplace| self.solve(cost, margin, marketplace, fulfillment_override))
            .collect()
    }

    /// Inputs are already validated; `margin` may be negative on the sync path.
    fn solve(
        &self,
        cost: f64,
        margin: f64,
        marketplace: &Marketplace,
        fulfillment_override: Option<f64>,
    ) -> Result<PriceQuote, PricingError> {
        let model = self.fee_model(marketplace)?;
        let denominator = 1.0 - margin - model.rate();
        if denominator <= SOLVABLE_EPSILON {
            return Err(PricingError::MarginUnachievable {
                marketplace: marketplace.to_string(),
                margin,
                fee_rate: model.rate(),
            });
        }
        let mut price = round_cents((cost + model.flat_fee(fulfillment_override)) / denominator);
        if margin >= 0.0 && price <= cost {
            price = next_cent_above(cost);
        }
        Ok(PriceQuote {
            marketplace: marketplace.clone(),
            cost,
            target_margin_fraction: margin,
            computed_price: price.max(ONE_CENT),
        })
    }
}

impl Default for PriceSyncEngine {
    fn default() -> Self {
        Self {
            schedule: Arc::new(FeeSchedule::built_in()),
            policy: MarginPolicy::default(),
        }
    }
}

/// Half-up rounding to two decimals; ties go toward positive infinity for
/// negative values too. The value is first snapped to 1e-8 so that binary
/// representation noise (16.585 stored as 16.58499..) does not decide the cent.
pub fn round_cents(value: f64) -> f64 {
    let snapped = (value * 1e8).round() / 1e6;
    (snapped + 0.5).floor() / 100.0
}

fn next_cent_above(amount: f64) -> f64 {
    let snapped = (amount * 1e8).round() / 1e6;
    (snapped.floor() + 1.0) / 100.0
}

fn ensure_target_margin(margin: f64) -> Result<(), PricingError> {
    if !margin.is_finite() || margin < 0.0 {
        return Err(PricingError::invalid_input(
            "targetMargin",
            format!("must be a non-negative fraction, got {margin}"),
        ));
    }
    Ok(())
}

fn ensure_positive(field: &'static str, value: f64) -> Result<(), PricingError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PricingError::invalid_input(
            field,
            format!("must be a positive amount, got {value}"),
        ));
    }
    Ok(())
}

fn ensure_fulfillment(fee: Option<f64>) -> Result<(), PricingError> {
    match fee {
        Some(value) if !value.is_finite() || value < 0.0 => Err(PricingError::invalid_input(
            "fulfillmentFee",
            format!("must be a non-negative amount, got {value}"),
        )),
        _ => Ok(()),
    }
}

fn dedup(marketplaces: &[Marketplace]) -> Vec<Marketplace> {
    let mut out: Vec<Marketplace> = Vec::with_capacity(marketplaces.len());
    for marketplace in marketplaces {
        if !out.contains(marketplace) {
            out.push(marketplace.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::error::PricingErrorKind;
    use proptest::prelude::*;

    fn engine() -> PriceSyncEngine {
        PriceSyncEngine::default()
    }

    fn rejecting_engine() -> PriceSyncEngine {
        PriceSyncEngine::new(
            FeeSchedule::built_in(),
            MarginPolicy {
                unknown_marketplace: UnknownMarketplacePolicy::Reject,
                ..MarginPolicy::default()
            },
        )
        .expect("engine")
    }

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn percent_plus_flat_price() {
        let quote = engine()
            .price_for_margin(10.0, 0.30, &Marketplace::Shopify, None)
            .unwrap();
        assert_eq!(quote.computed_price, 15.35);
        assert_eq!(quote.target_margin_fraction, 0.30);
    }

    #[test]
    fn percent_only_price() {
        let quote = engine()
            .price_for_margin(10.0, 0.30, &Marketplace::Walmart, None)
            .unwrap();
        assert_eq!(quote.computed_price, 18.18);
    }

    #[test]
    fn fulfillment_fee_and_override() {
        let engine = engine();
        let default_fba = engine
            .price_for_margin(10.0, 0.30, &Marketplace::Amazon, None)
            .unwrap();
        // (10 + 3) / 0.55
        assert_eq!(default_fba.computed_price, 23.64);
        let overridden = engine
            .price_for_margin(10.0, 0.30, &Marketplace::Amazon, Some(5.0))
            .unwrap();
        // (10 + 5) / 0.55
        assert_eq!(overridden.computed_price, 27.27);
        let shopify = engine
            .price_for_margin(10.0, 0.30, &Marketplace::Shopify, Some(5.0))
            .unwrap();
        assert_eq!(shopify.computed_price, 15.35);
    }

    #[test]
    fn margin_for_price_round_trips_quote() {
        let check = engine()
            .margin_for_price(15.35, 10.0, &Marketplace::Shopify, None)
            .unwrap();
        assert!(close(check.actual_margin_fraction, 0.30, 0.001));
        assert!(check.meets_minimum);
    }

    #[test]
    fn margin_below_minimum_is_flagged() {
        let check = engine()
            .margin_for_price(12.0, 10.0, &Marketplace::Walmart, None)
            .unwrap();
        assert!(check.actual_margin_fraction < 0.25);
        assert!(!check.meets_minimum);
    }

    #[test]
    fn configurable_minimum_margin() {
        let engine = PriceSyncEngine::new(
            FeeSchedule::built_in(),
            MarginPolicy {
                minimum_margin: 0.10,
                ..MarginPolicy::default()
            },
        )
        .unwrap();
        let check = engine
            .margin_for_price(12.0, 10.0, &Marketplace::Walmart, None)
            .unwrap();
        // (12 * 0.85 - 10) / 12 = 0.0166..
        assert!(!check.meets_minimum);
        let check = engine
            .margin_for_price(14.0, 10.0, &Marketplace::Walmart, None)
            .unwrap();
        assert!(check.meets_minimum);
    }

    #[test]
    fn sync_reprices_other_channels_at_source_margin() {
        let result = engine()
            .sync_across_marketplaces(
                20.0,
                10.0,
                &Marketplace::Walmart,
                &[Marketplace::Shopify, Marketplace::Walmart],
                None,
            )
            .unwrap();
        assert!(close(result.target_margin_fraction, 0.35, 1e-9));
        assert_eq!(result.target_margin_percent, 35.0);
        let prices = result.prices();
        assert_eq!(prices[&Marketplace::Shopify], 16.59);
        assert_eq!(prices[&Marketplace::Walmart], 20.0);
        assert!(result.meets_minimum);
    }

    #[test]
    fn sync_defaults_to_full_schedule_and_adds_source() {
        let engine = engine();
        let all = engine
            .sync_across_marketplaces(25.0, 10.0, &Marketplace::Shopify, &[], None)
            .unwrap();
        assert_eq!(all.quotes.len(), 4);

        let partial = engine
            .sync_across_marketplaces(
                25.0,
                10.0,
                &Marketplace::Shopify,
                &[Marketplace::Ebay, Marketplace::Ebay],
                None,
            )
            .unwrap();
        let names: Vec<&str> = partial.quotes.iter().map(|q| q.marketplace.as_str()).collect();
        assert_eq!(names, vec!["ebay", "shopify"]);
        assert_eq!(partial.prices()[&Marketplace::Shopify], 25.0);
    }

    #[test]
    fn unachievable_margin_is_an_error() {
        let engine = engine();
        // 0.971 + 0.029 sums to exactly 100%
        let err = engine
            .price_for_margin(10.0, 0.971, &Marketplace::Shopify, None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::MarginUnachievable);
        let err = engine
            .price_for_margin(10.0, 0.98, &Marketplace::Shopify, None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::MarginUnachievable);

        // 0.85 + 0.15 referral sums to exactly 100%
        let err = engine
            .price_for_margin(10.0, 0.85, &Marketplace::Walmart, None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::MarginUnachievable);

        let err = engine
            .price_for_margin(10.0, 1.0, &Marketplace::parse("direct"), None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::MarginUnachievable);
    }

    #[test]
    fn high_margin_below_the_fee_ceiling_is_priced() {
        // 0.95 + 0.029 leaves a 2.1% denominator: 10.30 / 0.021
        let quote = engine()
            .price_for_margin(10.0, 0.95, &Marketplace::Shopify, None)
            .unwrap();
        assert_eq!(quote.computed_price, 490.48);
    }

    #[test]
    fn sub_cent_cost_quotes_one_cent() {
        let quote = engine()
            .price_for_margin(0.001, 0.30, &Marketplace::Walmart, None)
            .unwrap();
        assert_eq!(quote.computed_price, 0.01);
    }

    #[test]
    fn rounding_never_lands_on_cost() {
        // 1 / 0.999 rounds back to 1.00
        let quote = engine()
            .price_for_margin(1.0, 0.001, &Marketplace::parse("direct"), None)
            .unwrap();
        assert_eq!(quote.computed_price, 1.01);

        let quote = engine()
            .price_for_margin(10.0, 0.0, &Marketplace::parse("direct"), None)
            .unwrap();
        assert_eq!(quote.computed_price, 10.01);
    }

    #[test]
    fn negative_target_margin_is_invalid() {
        let engine = engine();
        let err = engine
            .price_for_margin(10.0, -2.0, &Marketplace::Walmart, None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::InvalidInput);
        let err = engine
            .quote_all(10.0, -0.1, &[Marketplace::Shopify], None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::InvalidInput);
    }

    #[test]
    fn loss_making_source_still_syncs() {
        // walmart margin at 10: (8.5 - 12) / 10 = -0.35
        let result = engine()
            .sync_across_marketplaces(
                10.0,
                12.0,
                &Marketplace::Walmart,
                &[Marketplace::Shopify],
                None,
            )
            .unwrap();
        assert!(close(result.target_margin_fraction, -0.35, 1e-9));
        assert_eq!(result.target_margin_percent, -35.0);
        assert!(!result.meets_minimum);
        let prices = result.prices();
        assert_eq!(prices[&Marketplace::Walmart], 10.0);
        // 12.30 / 1.321
        assert_eq!(prices[&Marketplace::Shopify], 9.31);
    }

    #[test]
    fn sync_propagates_unachievable_target() {
        // A 90% margin on zero-fee custom channel cannot be matched on eBay.
        let err = engine()
            .sync_across_marketplaces(
                100.0,
                10.0,
                &Marketplace::parse("direct"),
                &[Marketplace::Ebay],
                None,
            )
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::MarginUnachievable);
    }

    #[test]
    fn non_positive_inputs_are_rejected() {
        let engine = engine();
        let err = engine
            .price_for_margin(-5.0, 0.3, &Marketplace::Shopify, None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::InvalidInput);
        let err = engine
            .price_for_margin(0.0, 0.3, &Marketplace::Shopify, None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::InvalidInput);
        let err = engine
            .margin_for_price(0.0, 10.0, &Marketplace::Shopify, None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::InvalidInput);
        let err = engine
            .price_for_margin(10.0, f64::NAN, &Marketplace::Shopify, None)
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::InvalidInput);
        let err = engine
            .price_for_margin(10.0, 0.3, &Marketplace::Amazon, Some(-1.0))
            .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::InvalidInput);
    }

    #[test]
    fn unknown_marketplace_falls_back_to_zero_fees() {
        let quote = engine()
            .price_for_margin(10.0, 0.5, &Marketplace::parse("etsy"), None)
            .unwrap();
        assert_eq!(quote.computed_price, 20.0);
    }

    #[test]
    fn unknown_marketplace_rejected_when_configured() {
        let err = rejecting_engine()
            .price_for_margin(10.0, 0.3, &Marketplace::parse("etsy"), None)
            .unwrap_err();
        assert_eq!(err, PricingError::UnknownMarketplace("etsy".into()));
    }

    #[test]
    fn invalid_minimum_margin_rejected() {
        let err = PriceSyncEngine::new(
            FeeSchedule::built_in(),
            MarginPolicy {
                minimum_margin: 1.5,
                ..MarginPolicy::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), PricingErrorKind::Configuration);
    }

    #[test]
    fn round_cents_is_half_up() {
        assert_eq!(round_cents(16.585), 16.59);
        assert_eq!(round_cents(1.005), 1.01);
        assert_eq!(round_cents(2.004), 2.0);
        assert_eq!(round_cents(18.181818), 18.18);
        assert_eq!(round_cents(-12.345), -12.34);
        assert_eq!(round_cents(-2.004), -2.0);
    }

    fn known_marketplace() -> impl Strategy<Value = Marketplace> {
        prop::sample::select(Marketplace::BUILT_IN.to_vec())
    }

    fn any_marketplace() -> impl Strategy<Value = Marketplace> {
        prop_oneof![
            4 => known_marketplace(),
            1 => Just(Marketplace::parse("direct")),
        ]
    }

    /// Margin error from moving the price by up to half a cent. With
    /// `d = 1 - margin - rate` the slope of margin in price is
    /// `d^2 / (cost + flat)`, so small costs tolerate more.
    fn round_trip_tolerance(cost: f64, margin: f64, model: &FeeModel) -> f64 {
        let d = 1.0 - margin - model.rate();
        0.0051 * d * d / (cost + model.flat_fee(None)) + 1e-9
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            cost in 0.5f64..1000.0,
            margin in 0.01f64..0.6,
            marketplace in any_marketplace(),
        ) {
            let engine = engine();
            let model = engine.fee_model(&marketplace).unwrap();
            let quote = engine.price_for_margin(cost, margin, &marketplace, None).unwrap();
            let check = engine
                .margin_for_price(quote.computed_price, cost, &marketplace, None)
                .unwrap();
            prop_assert!(close(
                check.actual_margin_fraction,
                margin,
                round_trip_tolerance(cost, margin, &model),
            ));
        }

        #[test]
        fn prop_price_increases_with_margin(
            cost in 1.0f64..1000.0,
            low in 0.0f64..0.4,
            step in 0.02f64..0.3,
            marketplace in known_marketplace(),
        ) {
            let engine = engine();
            let a = engine.price_for_margin(cost, low, &marketplace, None).unwrap();
            let b = engine.price_for_margin(cost, low + step, &marketplace, None).unwrap();
            prop_assert!(b.computed_price > a.computed_price);
        }

        #[test]
        fn prop_price_exceeds_cost(
            cost in 0.001f64..1000.0,
            margin in 0.0f64..0.6,
            marketplace in any_marketplace(),
        ) {
            let quote = engine().price_for_margin(cost, margin, &marketplace, None).unwrap();
            prop_assert!(quote.computed_price > cost);
        }

        #[test]
        fn prop_fallback_matches_zero_fee_marketplace(
            cost in 1.0f64..1000.0,
            margin in 0.0f64..0.9,
        ) {
            let zero = FeeSchedule::new([(Marketplace::parse("free"), FeeModel::ZERO)]).unwrap();
            let explicit = PriceSyncEngine::new(zero, MarginPolicy::default()).unwrap();
            let fallback = engine()
                .price_for_margin(cost, margin, &Marketplace::parse("unlisted"), None)
                .unwrap();
            let scheduled = explicit
                .price_for_margin(cost, margin, &Marketplace::parse("free"), None)
                .unwrap();
            prop_assert_eq!(fallback.computed_price, scheduled.computed_price);
        }
    }
}
