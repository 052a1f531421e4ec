use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionId, SettlementId, TenantId};
use crate::money::Money;

/// A PSP-issued settlement line item. Inserted by parsers,
/// immutable thereafter — the matching engine only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub tenant_id: TenantId,
    pub connection_id: ConnectionId,
    pub settlement_date: NaiveDate,
    pub batch_id: String,
    pub line_no: u32,
    pub amount: Money,
    pub psp_settlement_id: Option<String>,
    pub psp_txn_id_list: Vec<String>,
    pub fee: Option<i64>,
    pub net: Option<i64>,
}

impl Settlement {
    /// `(tenant, connection, batch_id, line_no)` uniquely identifies a row.
    pub fn natural_key(&self) -> (TenantId, ConnectionId, String, u32) {
        (self.tenant_id, self.connection_id, self.batch_id.clone(), self.line_no)
    }

    pub fn references_psp_txn(&self, psp_txn_id: &str) -> bool {
        self.psp_txn_id_list.iter().any(|id| id == psp_txn_id)
    }
}
