use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{ExceptionPriority, ExceptionStatus, ExceptionType};
use crate::ids::{ExceptionId, SettlementId, TenantId, TransactionId};
use crate::money::Money;

/// A tracked reconciliation work item. At least one of
/// `transaction_id`/`settlement_id` is always present; priority is a pure
/// function of amount (`ExceptionPriority::from_amount`), never set freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exception {
    pub id: ExceptionId,
    pub tenant_id: TenantId,
    pub transaction_id: Option<TransactionId>,
    pub settlement_id: Option<SettlementId>,
    pub exception_type: ExceptionType,
    pub amount: Money,
    pub priority: ExceptionPriority,
    pub status: ExceptionStatus,
    pub created_at: DateTime<Utc>,
}

impl Exception {
    pub fn has_anchor(&self) -> bool {
        self.transaction_id.is_some() || self.settlement_id.is_some()
    }
}
