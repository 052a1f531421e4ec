use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use recon_ports::CanonicalStore;
use recon_types::{
    ConnectionId, Exception, ExceptionId, LedgerEntry, Match, MatchId, ReconError, ReconResult,
    ReconStatus, Settlement, SettlementId, TenantId, Transaction, TransactionId,
};

#[derive(Default)]
struct State {
    transactions: HashMap<TransactionId, Transaction>,
    transactions_by_natural_key: HashMap<(TenantId, ConnectionId, String, String), TransactionId>,
    settlements: HashMap<SettlementId, Settlement>,
    settlements_by_natural_key: HashMap<(TenantId, ConnectionId, String, u32), SettlementId>,
    matches: HashMap<MatchId, Match>,
    active_match_by_settlement: HashMap<SettlementId, MatchId>,
    active_match_by_transaction: HashMap<TransactionId, MatchId>,
    exceptions: HashMap<ExceptionId, Exception>,
    ledger_entries_by_transaction: HashMap<TransactionId, Vec<LedgerEntry>>,
}

/// Reference [`CanonicalStore`]: one `RwLock`-guarded map per entity kind,
/// with natural-key indexes maintained alongside the primary maps. Every
/// write that the port contract calls out as conditional or optimistic is
/// implemented as a single critical section under the write lock, which is
/// sufficient to make those guarantees hold in one process without needing
/// per-row locks.
#[derive(Default)]
pub struct InMemoryCanonicalStore {
    state: RwLock<State>,
}

impl InMemoryCanonicalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CanonicalStore for InMemoryCanonicalStore {
    async fn get_transaction(&self, id: TransactionId) -> ReconResult<Option<Transaction>> {
        Ok(self.state.read().transactions.get(&id).cloned())
    }

    async fn find_transaction_by_natural_key(
        &self,
        tenant: TenantId,
        connection: ConnectionId,
        psp_txn_id: &str,
        event_type: &str,
    ) -> ReconResult<Option<Transaction>> {
        let state = self.state.read();
        let key = (tenant, connection, psp_txn_id.to_string(), event_type.to_string());
        Ok(state
            .transactions_by_natural_key
            .get(&key)
            .and_then(|id| state.transactions.get(id))
            .cloned())
    }

    async fn insert_transaction_if_absent(&self, txn: Transaction) -> ReconResult<Transaction> {
        let mut state = self.state.write();
        let key = txn.natural_key();
        if let Some(existing_id) = state.transactions_by_natural_key.get(&key) {
            return Ok(state.transactions[existing_id].clone());
        }
        state.transactions_by_natural_key.insert(key, txn.id);
        state.transactions.insert(txn.id, txn.clone());
        Ok(txn)
    }

    async fn update_transaction_recon_status(
        &self,
        id: TransactionId,
        expected_version: u32,
        new_status: ReconStatus,
    ) -> ReconResult<bool> {
        let mut state = self.state.write();
        let Some(txn) = state.transactions.get_mut(&id) else {
            return Err(ReconError::NotFound {
                detail: format!("transaction {id} not found"),
            });
        };
        if txn.version != expected_version as u64 {
            return Ok(false);
        }
        txn.recon_status = new_status;
        txn.version += 1;
        Ok(true)
    }

    async fn settlements_for_connection(
        &self,
        connection: ConnectionId,
        psp_settlement_id: &str,
    ) -> ReconResult<Vec<Settlement>> {
        let state = self.state.read();
        Ok(state
            .settlements
            .values()
            .filter(|s| {
                s.connection_id == connection
                    && s.psp_settlement_id.as_deref() == Some(psp_settlement_id)
            })
            .cloned()
            .collect())
    }

    async fn insert_settlement_if_absent(&self, settlement: Settlement) -> ReconResult<Settlement> {
        let mut state = self.state.write();
        let key = settlement.natural_key();
        if let Some(existing_id) = state.settlements_by_natural_key.get(&key) {
            return Ok(state.settlements[existing_id].clone());
        }
        state.settlements_by_natural_key.insert(key, settlement.id);
        state.settlements.insert(settlement.id, settlement.clone());
        Ok(settlement)
    }

    async fn active_match_for_settlement(
        &self,
        settlement: SettlementId,
    ) -> ReconResult<Option<Match>> {
        let state = self.state.read();
        Ok(state
            .active_match_by_settlement
            .get(&settlement)
            .and_then(|id| state.matches.get(id))
            .cloned())
    }

    async fn match_for_transaction(&self, txn: TransactionId) -> ReconResult<Option<Match>> {
        let state = self.state.read();
        Ok(state
            .active_match_by_transaction
            .get(&txn)
            .and_then(|id| state.matches.get(id))
            .cloned())
    }

    async fn get_match(&self, id: MatchId) -> ReconResult<Option<Match>> {
        Ok(self.state.read().matches.get(&id).cloned())
    }

    async fn insert_match(&self, m: Match, recon_status: ReconStatus) -> ReconResult<()> {
        let mut state = self.state.write();

        if state.active_match_by_transaction.contains_key(&m.transaction_id) {
            return Err(ReconError::StorageConflict {
                detail: format!("transaction {} already has an active match", m.transaction_id),
            });
        }
        if let Some(settlement_id) = m.settlement_id {
            if state.active_match_by_settlement.contains_key(&settlement_id) {
                return Err(ReconError::StorageConflict {
                    detail: format!("settlement {settlement_id} already has an active match"),
                });
            }
        }

        let Some(txn) = state.transactions.get_mut(&m.transaction_id) else {
            return Err(ReconError::NotFound {
                detail: format!("transaction {} not found", m.transaction_id),
            });
        };
        txn.recon_status = recon_status;
        txn.version += 1;

        state.active_match_by_transaction.insert(m.transaction_id, m.id);
        if let Some(settlement_id) = m.settlement_id {
            state.active_match_by_settlement.insert(settlement_id, m.id);
        }
        state.matches.insert(m.id, m);
        Ok(())
    }

    async fn insert_exception(&self, exception: Exception) -> ReconResult<Exception> {
        let mut state = self.state.write();
        state.exceptions.insert(exception.id, exception.clone());
        Ok(exception)
    }

    async fn post_ledger_entries(
        &self,
        txn: TransactionId,
        expected_version: u32,
        entries: Vec<LedgerEntry>,
    ) -> ReconResult<bool> {
        let mut state = self.state.write();
        let Some(transaction) = state.transactions.get_mut(&txn) else {
            return Err(ReconError::NotFound {
                detail: format!("transaction {txn} not found"),
            });
        };
        if transaction.version != expected_version as u64 {
            return Ok(false);
        }
        transaction.recon_status = ReconStatus::Posted;
        transaction.version += 1;
        state
            .ledger_entries_by_transaction
            .entry(txn)
            .or_default()
            .extend(entries);
        Ok(true)
    }

    async fn ledger_entries_for_transaction(
        &self,
        txn: TransactionId,
    ) -> ReconResult<Vec<LedgerEntry>> {
        Ok(self
            .state
            .read()
            .ledger_entries_by_transaction
            .get(&txn)
            .cloned()
            .unwrap_or_default())
    }

    async fn unreconciled_transactions(
        &self,
        tenant: TenantId,
        connection: ConnectionId,
    ) -> ReconResult<Vec<Transaction>> {
        Ok(self
            .state
            .read()
            .transactions
            .values()
            .filter(|t| {
                t.tenant_id == tenant
                    && t.connection_id == connection
                    && matches!(
                        t.recon_status,
                        ReconStatus::Pending | ReconStatus::PartialMatch | ReconStatus::Unmatched
                    )
            })
            .cloned()
            .collect())
    }

    async fn candidate_settlements(
        &self,
        connection: ConnectionId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ReconResult<Vec<Settlement>> {
        let state = self.state.read();
        Ok(state
            .settlements
            .values()
            .filter(|s| {
                s.connection_id == connection
                    && s.settlement_date >= from
                    && s.settlement_date <= to
                    && !state.active_match_by_settlement.contains_key(&s.id)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use recon_types::{
        BrandId, CurrencyCode, CustomerId, EntityId, EventType, Money, TenantId, TransactionStatus,
    };
    use serde_json::json;

    fn sample_txn(connection: ConnectionId, key: &str) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            tenant_id: TenantId::new(),
            brand_id: BrandId::new(),
            entity_id: EntityId::new(),
            connection_id: connection,
            event_type: EventType::Deposit,
            event_ts: Utc::now(),
            txn_date: Utc::now().date_naive(),
            amount: Money::new(1_000, CurrencyCode::new("USD").unwrap()),
            original_currency: None,
            fx_rate: None,
            fx_rate_source: None,
            fx_rate_date: None,
            psp_txn_id: "psp_1".to_string(),
            psp_payment_id: None,
            psp_settlement_id: None,
            psp_fee: None,
            net_amount: None,
            customer_id: None::<CustomerId>,
            status: TransactionStatus::Completed,
            recon_status: ReconStatus::Pending,
            source_idempotency_key: key.to_string(),
            metadata: json!({}),
            version: 0,
        }
    }

    #[tokio::test]
    async fn duplicate_natural_key_returns_existing_row() {
        let store = InMemoryCanonicalStore::new();
        let connection = ConnectionId::new();
        let first = store
            .insert_transaction_if_absent(sample_txn(connection, "k1"))
            .await
            .unwrap();
        let second = store
            .insert_transaction_if_absent(sample_txn(connection, "k1"))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn optimistic_update_fails_on_stale_version() {
        let store = InMemoryCanonicalStore::new();
        let connection = ConnectionId::new();
        let txn = store
            .insert_transaction_if_absent(sample_txn(connection, "k1"))
            .await
            .unwrap();

        let ok = store
            .update_transaction_recon_status(txn.id, 0, ReconStatus::Unmatched)
            .await
            .unwrap();
        assert!(ok);

        let stale = store
            .update_transaction_recon_status(txn.id, 0, ReconStatus::Matched)
            .await
            .unwrap();
        assert!(!stale);
    }
}
