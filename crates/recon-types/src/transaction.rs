use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::{EventType, ReconStatus, TransactionStatus};
use crate::ids::{BrandId, ConnectionId, CustomerId, EntityId, TenantId, TransactionId};
use crate::money::{CurrencyCode, Money};

/// Canonical transaction row. Inserted by the Normalizer, and
/// thereafter mutated only by Matching (`recon_status`) and Ledger
/// (`recon_status -> POSTED`); `version` is bumped on every such mutation
/// and used as the optimistic-concurrency token for `CanonicalStore`
/// updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub brand_id: BrandId,
    pub entity_id: EntityId,
    pub connection_id: ConnectionId,
    pub event_type: EventType,
    pub event_ts: DateTime<Utc>,
    pub txn_date: NaiveDate,
    pub amount: Money,
    pub original_currency: Option<CurrencyCode>,
    pub fx_rate: Option<rust_decimal::Decimal>,
    pub fx_rate_source: Option<String>,
    pub fx_rate_date: Option<NaiveDate>,
    pub psp_txn_id: String,
    pub psp_payment_id: Option<String>,
    pub psp_settlement_id: Option<String>,
    pub psp_fee: Option<i64>,
    pub net_amount: Option<i64>,
    pub customer_id: Option<CustomerId>,
    pub status: TransactionStatus,
    pub recon_status: ReconStatus,
    pub source_idempotency_key: String,
    pub metadata: Value,
    pub version: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TransactionInvariantError {
    #[error("amount.value must be >= 0, got {0}")]
    NegativeAmount(i64),
    #[error("fx_rate set without original_currency")]
    FxRateWithoutOriginalCurrency,
    #[error("net_amount ({net_amount}) != amount.value ({amount}) - psp_fee ({fee})")]
    NetAmountMismatch {
        net_amount: i64,
        amount: i64,
        fee: i64,
    },
}

impl Transaction {
    /// Validates this row's internal consistency invariants. Callers that
    /// construct a `Transaction` outside of the Normalizer (tests, the
    /// in-memory store's conflict path) should run this before persisting.
    pub fn check_invariants(&self) -> Result<(), TransactionInvariantError> {
        if self.amount.value < 0 {
            return Err(TransactionInvariantError::NegativeAmount(self.amount.value));
        }
        if self.fx_rate.is_some() && self.original_currency.is_none() {
            return Err(TransactionInvariantError::FxRateWithoutOriginalCurrency);
        }
        if let (Some(net), Some(fee)) = (self.net_amount, self.psp_fee) {
            if net != self.amount.value - fee {
                return Err(TransactionInvariantError::NetAmountMismatch {
                    net_amount: net,
                    amount: self.amount.value,
                    fee,
                });
            }
        }
        Ok(())
    }

    /// The `(tenant, connection, psp_txn_id, event_type)` tuple is this
    /// entity's natural key.
    pub fn natural_key(&self) -> (TenantId, ConnectionId, String, String) {
        (
            self.tenant_id,
            self.connection_id,
            self.psp_txn_id.clone(),
            self.event_type.as_str().to_string(),
        )
    }
}
