use chrono::{DateTime, Utc};
use recon_types::{CurrencyCode, EventType, ReconError, ReconResult};
use serde_json::Value;

/// Wire format a raw payload was delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    Json,
    Csv,
    Xlsx,
}

/// Language-neutral parsed event produced by a [`Parser`]. Typed
/// fields the pipeline needs for matching/ledgering are first-class;
/// anything vendor-specific that isn't otherwise modeled lives in
/// `metadata`.
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub psp_event_id: String,
    pub psp_event_type: String,
    pub canonical_event_type: EventType,
    pub psp_txn_id: String,
    pub psp_payment_id: Option<String>,
    pub psp_settlement_id: Option<String>,
    pub amount_smallest_unit: i64,
    pub currency: CurrencyCode,
    pub psp_fee: Option<i64>,
    pub net: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub customer_id: Option<String>,
    pub metadata: Value,
    /// Row position within its settlement file. `Some` only for events
    /// whose `canonical_event_type` is the settlement marker
    /// (`Other("SETTLEMENT")`); the normalizer uses it as `Settlement`'s
    /// `line_no`, batching rows by `created_at`'s date.
    pub settlement_line_no: Option<u32>,
}

impl ParsedEvent {
    /// Requires `psp_event_id` and `canonical_event_type` to be present.
    /// `canonical_event_type` is
    /// non-optional in this type, so only `psp_event_id` needs a runtime
    /// check.
    pub fn validate(&self, connection: recon_types::ConnectionId) -> ReconResult<()> {
        if self.psp_event_id.trim().is_empty() {
            return Err(ReconError::ParseError {
                connection,
                message: "psp_event_id must be present".to_string(),
            });
        }
        Ok(())
    }
}

/// Parser port, keyed by `(psp_name, schema_version)` at the
/// registry level (see `recon-normalizer::ParserRegistry`). Implementations
/// are pluggable — this crate only fixes the contract and the
/// two reference parsers live in `recon-normalizer`.
pub trait Parser: Send + Sync {
    fn parse(&self, bytes: &[u8], format: EventFormat) -> ReconResult<Vec<ParsedEvent>>;
}
