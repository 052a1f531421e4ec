use async_trait::async_trait;
use chrono::NaiveDate;
use recon_types::{
    ConnectionId, Exception, LedgerEntry, Match, MatchId, ReconResult, ReconStatus, Settlement,
    SettlementId, TenantId, Transaction, TransactionId,
};

/// Durable home for canonical domain rows: transactions, settlements,
/// matches, exceptions and ledger entries. Every mutating method is either
/// a conditional insert (no-op if the natural key already exists) or an
/// optimistic update gated on the caller's observed `version`, so retries
/// after a crash or a redelivered bus message are always safe.
#[async_trait]
pub trait CanonicalStore: Send + Sync {
    async fn get_transaction(&self, id: TransactionId) -> ReconResult<Option<Transaction>>;

    async fn find_transaction_by_natural_key(
        &self,
        tenant: TenantId,
        connection: ConnectionId,
        psp_txn_id: &str,
        event_type: &str,
    ) -> ReconResult<Option<Transaction>>;

    /// Inserts `txn` unless a row with the same `(tenant, connection,
    /// psp_txn_id, event_type)` natural key — see [`Transaction::natural_key`]
    /// — already exists, in which case the existing row is returned
    /// unchanged and `txn` is discarded.
    async fn insert_transaction_if_absent(&self, txn: Transaction) -> ReconResult<Transaction>;

    /// Moves `id` from `expected_version` to `new_status`, bumping the
    /// version by one. Returns `Ok(false)` without mutating anything if the
    /// stored version no longer matches `expected_version` — the caller
    /// should re-read and decide whether to retry.
    async fn update_transaction_recon_status(
        &self,
        id: TransactionId,
        expected_version: u32,
        new_status: ReconStatus,
    ) -> ReconResult<bool>;

    async fn settlements_for_connection(
        &self,
        connection: ConnectionId,
        psp_settlement_id: &str,
    ) -> ReconResult<Vec<Settlement>>;

    async fn insert_settlement_if_absent(&self, settlement: Settlement) -> ReconResult<Settlement>;

    /// The active (non-superseded) match currently anchored on a
    /// settlement, if any. Used to enforce one-settlement-one-match
    /// exclusivity before a new match is inserted.
    async fn active_match_for_settlement(
        &self,
        settlement: SettlementId,
    ) -> ReconResult<Option<Match>>;

    async fn match_for_transaction(&self, txn: TransactionId) -> ReconResult<Option<Match>>;

    async fn get_match(&self, id: MatchId) -> ReconResult<Option<Match>>;

    /// Inserts `m` and moves the transaction to `recon_status` atomically,
    /// failing with `ReconError::StorageConflict` if either side was
    /// already claimed by a different active match. `recon_status` is
    /// passed in rather than derived here since only the caller knows
    /// whether this hit counts as a clean match or a partial one.
    async fn insert_match(&self, m: Match, recon_status: ReconStatus) -> ReconResult<()>;

    async fn insert_exception(&self, exception: Exception) -> ReconResult<Exception>;

    /// Appends balanced `entries` and marks `txn` as posted in one atomic
    /// unit; callers must have already validated the entries balance to
    /// zero (see `recon_types::ledger::postings_balance`).
    async fn post_ledger_entries(
        &self,
        txn: TransactionId,
        expected_version: u32,
        entries: Vec<LedgerEntry>,
    ) -> ReconResult<bool>;

    async fn ledger_entries_for_transaction(
        &self,
        txn: TransactionId,
    ) -> ReconResult<Vec<LedgerEntry>>;

    /// Candidate pool for the matching engine: unreconciled transactions on
    /// `connection` within a coarse date window, narrowed further in
    /// memory by the matching engine itself.
    async fn unreconciled_transactions(
        &self,
        tenant: TenantId,
        connection: ConnectionId,
    ) -> ReconResult<Vec<Transaction>>;

    /// Settlement candidates for the matching ladder: every settlement on
    /// `connection` dated within `[from, to]` inclusive that has no active
    /// MATCHED row anchored on it yet. The matching engine narrows this
    /// coarse window further in memory against each level's predicate.
    async fn candidate_settlements(
        &self,
        connection: ConnectionId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ReconResult<Vec<Settlement>>;
}
