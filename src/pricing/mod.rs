pub mod engine;
pub mod error;
pub mod fees;
pub mod marketplace;

pub use engine::{
    MarginCheck, MarginPolicy, PriceQuote, PriceSyncEngine, SyncResult, UnknownMarketplacePolicy,
};
pub use error::{PricingError, PricingErrorKind};
pub use fees::{FeeModel, FeeSchedule};
pub use marketplace::Marketplace;
