use async_trait::async_trait;
use chrono::NaiveDate;
use recon_types::{CurrencyCode, ReconResult};
use rust_decimal::Decimal;

/// A dated conversion rate as returned by a read-through FX cache.
/// `value` converts one unit of `from` into `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct FxRate {
    pub value: Decimal,
    pub source: String,
    pub as_of_date: NaiveDate,
}

/// Port consumed by the Normalizer's FX enrichment step. Implementations
/// are expected to be a read-through cache in front of whatever upstream FX
/// service a deployment uses; this crate only specifies the contract.
#[async_trait]
pub trait FxProvider: Send + Sync {
    async fn rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        as_of: NaiveDate,
    ) -> ReconResult<FxRate>;
}
