use super::error::PricingError;
use super::marketplace::Marketplace;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

/// How a marketplace takes its cut of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "model",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum FeeModel {
    /// Percentage of the price plus a flat per-order fee (card processing, listing fee).
    PercentPlusFlat { rate: f64, flat_fee: f64 },
    /// Referral percentage plus a per-item fulfillment fee. The fulfillment
    /// fee can be overridden per item.
    PercentPlusFulfillment { rate: f64, fulfillment_fee: f64 },
    PercentOnly { rate: f64 },
}

impl FeeModel {
    /// Zero-fee model applied to marketplaces missing from the schedule.
    pub const ZERO: FeeModel = FeeModel::PercentOnly { rate: 0.0 };

    pub fn rate(&self) -> f64 {
        match *self {
            FeeModel::PercentPlusFlat { rate, .. }
            | FeeModel::PercentPlusFulfillment { rate, .. }
            | FeeModel::PercentOnly { rate } => rate,
        }
    }

    /// Flat amount deducted per sale. `fulfillment_override` only applies to
    /// the fulfillment model and is ignored elsewhere.
    pub fn flat_fee(&self, fulfillment_override: Option<f64>) -> f64 {
        match *self {
            FeeModel::PercentPlusFlat { flat_fee, .. } => flat_fee,
            FeeModel::PercentPlusFulfillment {
                fulfillment_fee, ..
            } => fulfillment_override.unwrap_or(fulfillment_fee),
            FeeModel::PercentOnly { .. } => 0.0,
        }
    }

    pub fn net_proceeds(&self, price: f64, fulfillment_override: Option<f64>) -> f64 {
        price * (1.0 - self.rate()) - self.flat_fee(fulfillment_override)
    }

    fn validate(&self, marketplace: &Marketplace) -> Result<(), PricingError> {
        let rate = self.rate();
        if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
            return Err(PricingError::Configuration(format!(
                "{marketplace}: rate {rate} must be in [0, 1)"
            )));
        }
        let flat = self.flat_fee(None);
        if !flat.is_finite() || flat < 0.0 {
            return Err(PricingError::Configuration(format!(
                "{marketplace}: flat fee {flat} must be a non-negative amount"
            )));
        }
        Ok(())
    }
}

/// Read-only mapping from marketplace to fee model. Every entry is validated
/// on construction, so a held schedule never contains a rate outside `[0, 1)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeeSchedule {
    entries: BTreeMap<Marketplace, FeeModel>,
}

static BUILT_IN_SCHEDULE: Lazy<FeeSchedule> = Lazy::new(|| FeeSchedule {
    entries: BTreeMap::from([
        (
            Marketplace::Shopify,
            FeeModel::PercentPlusFlat {
                rate: 0.029,
                flat_fee: 0.30,
            },
        ),
        (
            Marketplace::Amazon,
            FeeModel::PercentPlusFulfillment {
                rate: 0.15,
                fulfillment_fee: 3.00,
            },
        ),
        (
            Marketplace::Ebay,
            FeeModel::PercentPlusFlat {
                rate: 0.129,
                flat_fee: 0.35,
            },
        ),
        (Marketplace::Walmart, FeeModel::PercentOnly { rate: 0.15 }),
    ]),
});

impl FeeSchedule {
    pub fn new(
        entries: impl IntoIterator<Item = (Marketplace, FeeModel)>,
    ) -> Result<Self, PricingError> {
        let entries: BTreeMap<_, _> = entries.into_iter().collect();
        if entries.is_empty() {
            return Err(PricingError::Configuration(
                "schedule lists no marketplaces".into(),
            ));
        }
        for (marketplace, model) in &entries {
            model.validate(marketplace)?;
        }
        Ok(Self { entries })
    }

    pub fn built_in() -> Self {
        BUILT_IN_SCHEDULE.clone()
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, PricingError> {
        let entries: BTreeMap<Marketplace, FeeModel> = serde_yaml::from_str(raw)
            .map_err(|err| PricingError::Configuration(err.to_string()))?;
        Self::new(entries)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PricingError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            PricingError::Configuration(format!("reading {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn get(&self, marketplace: &Marketplace) -> Option<&FeeModel> {
        self.entries.get(marketplace)
    }

    pub fn marketplaces(&self) -> impl Iterator<Item = &Marketplace> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
