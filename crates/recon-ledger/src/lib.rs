//! Double-entry posting: turns a confirmed `Match` into balanced
//! `LedgerEntry` rows against a fixed chart of accounts and marks the
//! transaction `POSTED`. Posting and the status flip commit as one atomic
//! `CanonicalStore` write.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use recon_ports::CanonicalStore;
use recon_types::{
    postings_balance, posting_totals, Account, ConnectionId, EventType, LedgerEntry, LedgerEntryId,
    Match, MatchId, ReconError, ReconResult, Transaction, TransactionId,
};

/// Resolves a connection to the PSP name its cash accounts are keyed on.
/// Kept separate from `CanonicalStore` since it is static configuration,
/// not a canonical row.
#[derive(Default)]
pub struct PspDirectory {
    names: HashMap<ConnectionId, String>,
}

impl PspDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection: ConnectionId, psp_name: impl Into<String>) {
        self.names.insert(connection, psp_name.into());
    }

    fn lookup(&self, connection: ConnectionId) -> ReconResult<&str> {
        self.names
            .get(&connection)
            .map(|s| s.as_str())
            .ok_or_else(|| ReconError::ConfigMissing {
                connection,
                detail: "no PSP name registered for ledger cash account resolution".to_string(),
            })
    }
}

pub struct LedgerPoster {
    store: Arc<dyn CanonicalStore>,
    psp_directory: PspDirectory,
}

impl LedgerPoster {
    pub fn new(store: Arc<dyn CanonicalStore>, psp_directory: PspDirectory) -> Self {
        Self { store, psp_directory }
    }

    /// Posts the balanced entries for `transaction_id`/`match_id` and marks
    /// the transaction `POSTED`. Returns the entries actually written.
    /// Fails with `ReconError::StorageConflict` (not retried by this
    /// method) if `transaction_id`'s version moved between the read and
    /// the write — the caller re-reads and decides whether to retry.
    #[tracing::instrument(skip(self), fields(transaction = %transaction_id, r#match = %match_id))]
    pub async fn post(
        &self,
        transaction_id: TransactionId,
        match_id: MatchId,
    ) -> ReconResult<Vec<LedgerEntry>> {
        let txn = self
            .store
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| ReconError::NotFound {
                detail: format!("transaction {transaction_id} not found"),
            })?;
        let m = self
            .store
            .get_match(match_id)
            .await?
            .ok_or_else(|| ReconError::NotFound {
                detail: format!("match {match_id} not found"),
            })?;

        let cash = Account::cash(self.psp_directory.lookup(txn.connection_id)?, txn.amount.currency);
        let entries = build_entries(&txn, &m, cash)?;

        if !postings_balance(&entries) {
            let currency = txn.amount.currency;
            let (debit_total, credit_total) =
                posting_totals(&entries).get(&currency).copied().unwrap_or((0, 0));
            recon_metrics::ledger_unbalanced(currency.as_str());
            return Err(ReconError::LedgerUnbalanced {
                transaction_id,
                currency,
                debit_total,
                credit_total,
            });
        }

        let committed = self
            .store
            .post_ledger_entries(transaction_id, txn.version as u32, entries.clone())
            .await?;
        if !committed {
            return Err(ReconError::StorageConflict {
                detail: format!("transaction {transaction_id} version changed before posting"),
            });
        }
        recon_metrics::ledger_posted(txn.amount.currency.as_str(), entries.len());
        Ok(entries)
    }
}

/// Builds the balanced entry set for one event type. Unsupported event
/// types are a fatal, non-retried error per the posting contract — callers
/// should route them to an operational alert rather than requeue.
fn build_entries(txn: &Transaction, m: &Match, cash: Account) -> ReconResult<Vec<LedgerEntry>> {
    let now = Utc::now();
    let mk = |debit: Account, credit: Account, value: i64, description: &str| LedgerEntry {
        id: LedgerEntryId::new(),
        tenant_id: txn.tenant_id,
        entity_id: txn.entity_id,
        txn_date: txn.txn_date,
        debit_account: debit.code(),
        credit_account: credit.code(),
        amount: recon_types::Money::new(value, txn.amount.currency),
        ref_transaction: txn.id,
        ref_match: m.id,
        description: description.to_string(),
        posted_at: now,
    };

    let entries = match txn.event_type {
        EventType::Deposit => {
            let net = txn.net_amount.unwrap_or(txn.amount.value);
            let fee = txn.psp_fee.unwrap_or(0);
            let mut entries = vec![mk(
                cash.clone(),
                Account::AccountsReceivable,
                net,
                "deposit settled net of PSP fee",
            )];
            if fee > 0 {
                entries.push(mk(Account::PspFees, cash, fee, "PSP fee on deposit"));
            }
            entries
        }
        EventType::Withdrawal => vec![mk(
            Account::PlayerBalances,
            cash,
            txn.amount.value,
            "player withdrawal",
        )],
        EventType::Refund => vec![mk(
            Account::AccountsReceivable,
            cash,
            txn.amount.value,
            "refund",
        )],
        EventType::Chargeback => vec![
            mk(
                Account::ChargebackLosses,
                cash,
                txn.amount.value,
                "chargeback loss",
            ),
            mk(
                Account::AccountsReceivable,
                Account::AccountsReceivable,
                txn.amount.value,
                "chargeback reversal marker: original receivable wiped",
            ),
        ],
        EventType::Fee => vec![mk(Account::PspFees, cash, txn.amount.value, "standalone PSP fee")],
        EventType::ChargebackReversal | EventType::Other(_) => {
            return Err(ReconError::UnsupportedEventType {
                event_type: txn.event_type.as_str().to_string(),
            });
        }
    };
    Ok(entries)
}
