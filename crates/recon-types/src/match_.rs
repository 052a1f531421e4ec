use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{MatchLevel, MatchMethod, MatchStatus};
use crate::ids::{MatchId, SettlementId, TenantId, TransactionId};

/// A reconciliation match row. Never deleted — supersession goes
/// through a new row plus a status update on the superseded one, so the
/// match history for a transaction is always fully reconstructable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tenant_id: TenantId,
    pub transaction_id: TransactionId,
    pub settlement_id: Option<SettlementId>,
    pub level: MatchLevel,
    pub confidence: u8,
    pub method: MatchMethod,
    pub amount_diff: Option<i64>,
    pub amount_diff_pct: Option<f64>,
    pub status: MatchStatus,
    pub matched_at: DateTime<Utc>,
    pub matched_by: Option<String>,
}

impl Match {
    /// `confidence == 100 iff level == StrongId`.
    pub fn check_confidence_invariant(&self) -> bool {
        (self.confidence == 100) == matches!(self.level, MatchLevel::StrongId)
    }
}
