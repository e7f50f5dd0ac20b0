use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },
    #[error("unknown marketplace `{0}`")]
    UnknownMarketplace(String),
    #[error(
        "margin {margin:.4} is unachievable on `{marketplace}`: margin plus fee rate {fee_rate:.4} reaches 100%"
    )]
    MarginUnachievable {
        marketplace: String,
        margin: f64,
        fee_rate: f64,
    },
    #[error("fee schedule: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingErrorKind {
    InvalidInput,
    UnknownMarketplace,
    MarginUnachievable,
    Configuration,
}

impl PricingErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            PricingErrorKind::InvalidInput => "invalid_input",
            PricingErrorKind::UnknownMarketplace => "unknown_marketplace",
            PricingErrorKind::MarginUnachievable => "margin_unachievable",
            PricingErrorKind::Configuration => "configuration",
        }
    }
}

impl PricingError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> PricingErrorKind {
        match self {
            PricingError::InvalidInput { .. } => PricingErrorKind::InvalidInput,
            PricingError::UnknownMarketplace(_) => PricingErrorKind::UnknownMarketplace,
            PricingError::MarginUnachievable { .. } => PricingErrorKind::MarginUnachievable,
            PricingError::Configuration(_) => PricingErrorKind::Configuration,
        }
    }
}
