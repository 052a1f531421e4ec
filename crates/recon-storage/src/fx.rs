use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use recon_ports::{FxProvider, FxRate};
use recon_types::{CurrencyCode, ReconError, ReconResult};
use rust_decimal::Decimal;

/// Reference [`FxProvider`] seeded with a fixed table of rates, keyed by
/// `(from, to, as_of)`. Intended for tests and for deployments that are
/// content to update rates out-of-band rather than call a live FX service.
#[derive(Default)]
pub struct StaticFxProvider {
    rates: HashMap<(CurrencyCode, CurrencyCode, NaiveDate), FxRate>,
}

impl StaticFxProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(
        mut self,
        from: CurrencyCode,
        to: CurrencyCode,
        as_of: NaiveDate,
        value: Decimal,
        source: impl Into<String>,
    ) -> Self {
        self.rates.insert(
            (from, to, as_of),
            FxRate {
                value,
                source: source.into(),
                as_of_date: as_of,
            },
        );
        self
    }
}

#[async_trait]
impl FxProvider for StaticFxProvider {
    async fn rate(&self, from: CurrencyCode, to: CurrencyCode, as_of: NaiveDate) -> ReconResult<FxRate> {
        if from == to {
            return Ok(FxRate {
                value: Decimal::ONE,
                source: "identity".to_string(),
                as_of_date: as_of,
            });
        }
        self.rates
            .get(&(from, to, as_of))
            .cloned()
            .ok_or(ReconError::FxUnavailable { from, to, as_of })
    }
}
