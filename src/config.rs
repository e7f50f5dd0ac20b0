use crate::pricing::{
    FeeSchedule, MarginPolicy, PriceSyncEngine, PricingError, UnknownMarketplacePolicy,
};
use std::{env, path::PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub request_max_bytes: usize,
    pub policy: MarginPolicy,
    pub fee_schedule_path: Option<PathBuf>,
    pub redis_url: Option<String>,
    pub idempotency_ttl_secs: u64,
    pub queue_capacity: usize,
    pub job_retention_secs: u64,
    pub webhook_url: Option<String>,
    pub currency: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            request_max_bytes: 256 * 1024,
            policy: MarginPolicy::default(),
            fee_schedule_path: None,
            redis_url: None,
            idempotency_ttl_secs: 3600,
            queue_capacity: 64,
            job_retention_secs: 3600,
            webhook_url: None,
            currency: "USD".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let minimum_margin = match var("MIN_MARGIN") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && (0.0..1.0).contains(v))
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "MIN_MARGIN",
                    reason: format!("`{raw}` is not a fraction in [0, 1)"),
                })?,
            None => defaults.policy.minimum_margin,
        };
        let unknown_marketplace = match var("UNKNOWN_MARKETPLACE_POLICY").as_deref() {
            None => defaults.policy.unknown_marketplace,
            Some(raw) if raw.eq_ignore_ascii_case("fallback") => UnknownMarketplacePolicy::Fallback,
            Some(raw) if raw.eq_ignore_ascii_case("reject") => UnknownMarketplacePolicy::Reject,
            Some(raw) => {
                return Err(ConfigError::InvalidValue {
                    key: "UNKNOWN_MARKETPLACE_POLICY",
                    reason: format!("`{raw}` is neither `fallback` nor `reject`"),
                });
            }
        };

        Ok(Self {
            port: var("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            request_max_bytes: var("REQUEST_MAX_BYTES")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.request_max_bytes),
            policy: MarginPolicy {
                minimum_margin,
                unknown_marketplace,
            },
            fee_schedule_path: var("FEE_SCHEDULE_PATH").map(PathBuf::from),
            redis_url: var("REDIS_URL"),
            idempotency_ttl_secs: var("IDEMPOTENCY_TTL_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.idempotency_ttl_secs),
            queue_capacity: var("QUEUE_CAPACITY")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.queue_capacity),
            job_retention_secs: var("JOB_RETENTION_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.job_retention_secs),
            webhook_url: var("PRICE_PUSH_WEBHOOK_URL"),
            currency: var("PRICE_CURRENCY")
                .map(|v| v.to_uppercase())
                .unwrap_or(defaults.currency),
        })
    }

    pub fn fee_schedule(&self) -> Result<FeeSchedule, ConfigError> {
        let Some(path) = &self.fee_schedule_path else {
            return Ok(FeeSchedule::built_in());
        };
        let schedule = FeeSchedule::from_path(path)?;
        info!(
            target = "pricesync.config",
            path = %path.display(),
            marketplaces = schedule.len(),
            "loaded fee schedule"
        );
        Ok(schedule)
    }

    pub fn build_engine(&self) -> Result<PriceSyncEngine, ConfigError> {
        Ok(PriceSyncEngine::new(self.fee_schedule()?, self.policy)?)
    }
}
