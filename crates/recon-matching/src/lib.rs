//! Hierarchical settlement matching: four successive heuristics of
//! decreasing specificity, evaluated in order with the first hit winning.
//! Produces a `Match`, sometimes paired with an `Exception`, or an
//! `Exception` alone when nothing in the candidate window qualifies.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use recon_ports::CanonicalStore;
use recon_types::{
    Exception, ExceptionId, ExceptionPriority, ExceptionStatus, ExceptionType, Match, MatchId,
    MatchLevel, MatchMethod, MatchStatus, ReconError, ReconResult, ReconStatus, Settlement,
    Transaction, TransactionId,
};

/// Outcome of one `match_transaction` call. `exception` is populated for
/// every outcome except a clean Level-1/Level-2 hit.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub recon_status: ReconStatus,
    pub confidence: u8,
    pub match_row: Option<Match>,
    pub exception: Option<Exception>,
}

const LEVEL2_TOLERANCE_PCT: f64 = 1.0;
const LEVEL3_TOLERANCE_PCT: f64 = 0.1;
const LEVEL3_DATE_WINDOW_DAYS: i64 = 1;

pub struct MatchingEngine {
    store: Arc<dyn CanonicalStore>,
}

impl MatchingEngine {
    pub fn new(store: Arc<dyn CanonicalStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self), fields(transaction = %transaction_id))]
    pub async fn match_transaction(&self, transaction_id: TransactionId) -> ReconResult<MatchOutcome> {
        let txn = self
            .store
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| ReconError::NotFound {
                detail: format!("transaction {transaction_id} not found"),
            })?;

        if txn.recon_status == ReconStatus::Matched {
            let existing = self.store.match_for_transaction(transaction_id).await?;
            return Ok(MatchOutcome {
                recon_status: ReconStatus::Matched,
                confidence: 100,
                match_row: existing,
                exception: None,
            });
        }

        let window_start = txn.txn_date.checked_sub_days(Days::new(LEVEL3_DATE_WINDOW_DAYS as u64)).unwrap_or(txn.txn_date);
        let window_end = txn.txn_date.checked_add_days(Days::new(LEVEL3_DATE_WINDOW_DAYS as u64)).unwrap_or(txn.txn_date);
        let candidates = self
            .store
            .candidate_settlements(txn.connection_id, window_start, window_end)
            .await?;

        if let Some(settlement) = select_level1(&txn, &candidates) {
            return self
                .finalize_hit(&txn, settlement, MatchLevel::StrongId, 100, MatchStatus::Matched, None, None)
                .await;
        }

        if let Some((settlement, diff, diff_pct)) = select_level2(&txn, &candidates) {
            let clean = diff_pct < LEVEL2_TOLERANCE_PCT;
            let match_status = if clean { MatchStatus::Matched } else { MatchStatus::PartialMatch };
            let mut outcome = self
                .finalize_hit(&txn, settlement, MatchLevel::PspReference, 95, match_status, Some(diff), Some(diff_pct))
                .await?;
            if !clean {
                outcome.exception =
                    Some(self.create_exception(&txn, ExceptionType::AmountMismatch).await?);
            }
            return Ok(outcome);
        }

        if let Some((settlement, diff, diff_pct, confidence)) = select_level3(&txn, &candidates) {
            let mut outcome = self
                .finalize_hit(
                    &txn,
                    settlement,
                    MatchLevel::Fuzzy,
                    confidence,
                    MatchStatus::PartialMatch,
                    Some(diff),
                    Some(diff_pct),
                )
                .await?;
            outcome.exception = Some(
                self.create_exception(&txn, ExceptionType::PartialMatch).await?,
            );
            return Ok(outcome);
        }

        if let Some(settlement) = select_level4(&txn, &candidates) {
            let mut outcome = self
                .finalize_hit(
                    &txn,
                    settlement,
                    MatchLevel::AmountDate,
                    60,
                    MatchStatus::PendingReview,
                    None,
                    None,
                )
                .await?;
            outcome.exception = Some(
                self.create_exception(&txn, ExceptionType::PartialMatch).await?,
            );
            return Ok(outcome);
        }

        let exception = self.create_exception(&txn, ExceptionType::Unmatched).await?;
        self.transition(&txn, ReconStatus::Unmatched).await?;
        recon_metrics::match_unmatched();
        Ok(MatchOutcome {
            recon_status: ReconStatus::Unmatched,
            confidence: 0,
            match_row: None,
            exception: Some(exception),
        })
    }

    async fn finalize_hit(
        &self,
        txn: &Transaction,
        settlement: &Settlement,
        level: MatchLevel,
        confidence: u8,
        match_status: MatchStatus,
        amount_diff: Option<i64>,
        amount_diff_pct: Option<f64>,
    ) -> ReconResult<MatchOutcome> {
        // A PENDING_REVIEW match row still only moves the transaction's
        // coarser recon_status to PARTIAL_MATCH; ReconStatus has no review
        // state of its own.
        let recon_status = match match_status {
            MatchStatus::Matched => ReconStatus::Matched,
            MatchStatus::PartialMatch | MatchStatus::PendingReview => ReconStatus::PartialMatch,
        };

        let m = Match {
            id: MatchId::new(),
            tenant_id: txn.tenant_id,
            transaction_id: txn.id,
            settlement_id: Some(settlement.id),
            level,
            confidence,
            method: MatchMethod::Auto,
            amount_diff,
            amount_diff_pct,
            status: match_status,
            matched_at: Utc::now(),
            matched_by: None,
        };

        self.store.insert_match(m.clone(), recon_status).await?;
        recon_metrics::match_hit(level, confidence);

        Ok(MatchOutcome {
            recon_status,
            confidence,
            match_row: Some(m),
            exception: None,
        })
    }

    async fn create_exception(&self, txn: &Transaction, kind: ExceptionType) -> ReconResult<Exception> {
        let priority = ExceptionPriority::from_amount(txn.amount.value);
        let exception = Exception {
            id: ExceptionId::new(),
            tenant_id: txn.tenant_id,
            transaction_id: Some(txn.id),
            settlement_id: None,
            exception_type: kind,
            amount: txn.amount,
            priority,
            status: ExceptionStatus::Open,
            created_at: Utc::now(),
        };
        recon_metrics::exception_raised(exception.exception_type, exception.priority);
        self.store.insert_exception(exception).await
    }

    async fn transition(&self, txn: &Transaction, new_status: ReconStatus) -> ReconResult<()> {
        self.store
            .update_transaction_recon_status(txn.id, txn.version as u32, new_status)
            .await?;
        Ok(())
    }
}

fn select_level1<'a>(txn: &Transaction, candidates: &'a [Settlement]) -> Option<&'a Settlement> {
    let psp_settlement_id = txn.psp_settlement_id.as_deref()?;
    best_candidate(
        txn,
        candidates.iter().filter(|s| {
            s.psp_settlement_id.as_deref() == Some(psp_settlement_id)
                && s.settlement_date == txn.txn_date
        }),
    )
}

fn select_level2<'a>(
    txn: &Transaction,
    candidates: &'a [Settlement],
) -> Option<(&'a Settlement, i64, f64)> {
    let psp_payment_id = txn.psp_payment_id.as_deref()?;
    let settlement = best_candidate(
        txn,
        candidates.iter().filter(|s| {
            s.references_psp_txn(psp_payment_id)
                && s.settlement_date == txn.txn_date
                && s.amount.currency == txn.amount.currency
                && txn
                    .amount
                    .abs_diff_pct(&s.amount)
                    .map(|pct| pct <= LEVEL2_TOLERANCE_PCT)
                    .unwrap_or(false)
        }),
    )?;
    let diff = txn.amount.abs_diff(&settlement.amount)?;
    let diff_pct = txn.amount.abs_diff_pct(&settlement.amount)?;
    Some((settlement, diff, diff_pct))
}

fn select_level3<'a>(
    txn: &Transaction,
    candidates: &'a [Settlement],
) -> Option<(&'a Settlement, i64, f64, u8)> {
    let customer_ref = txn.customer_id.map(|id| id.to_string());
    let settlement = best_candidate(
        txn,
        candidates.iter().filter(|s| {
            s.amount.currency == txn.amount.currency
                && txn
                    .amount
                    .abs_diff_pct(&s.amount)
                    .map(|pct| pct <= LEVEL3_TOLERANCE_PCT)
                    .unwrap_or(false)
                && date_diff_days(txn.txn_date, s.settlement_date) <= LEVEL3_DATE_WINDOW_DAYS
                && customer_ref
                    .as_deref()
                    .map(|id| s.references_psp_txn(id))
                    .unwrap_or(true)
        }),
    )?;
    let diff = txn.amount.abs_diff(&settlement.amount)?;
    let diff_pct = txn.amount.abs_diff_pct(&settlement.amount)?;
    let date_diff = date_diff_days(txn.txn_date, settlement.settlement_date);
    let confidence = (90 - 10 * date_diff).clamp(70, 90) as u8;
    Some((settlement, diff, diff_pct, confidence))
}

fn select_level4<'a>(txn: &Transaction, candidates: &'a [Settlement]) -> Option<&'a Settlement> {
    best_candidate(
        txn,
        candidates.iter().filter(|s| {
            s.amount.currency == txn.amount.currency
                && s.amount.value == txn.amount.value
                && s.settlement_date == txn.txn_date
        }),
    )
}

fn date_diff_days(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

/// Deterministic tie-break among candidates a level's predicate already
/// accepted: smallest `|Δamount|`, then smallest `|Δdate|`, then smallest
/// `(batch_id, line_no)`.
fn best_candidate<'a>(
    txn: &Transaction,
    iter: impl Iterator<Item = &'a Settlement>,
) -> Option<&'a Settlement> {
    iter.min_by_key(|s| {
        let amount_diff = txn.amount.abs_diff(&s.amount).unwrap_or(i64::MAX);
        let date_diff = date_diff_days(txn.txn_date, s.settlement_date);
        (amount_diff, date_diff, s.batch_id.clone(), s.line_no)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_storage::InMemoryCanonicalStore;
    use recon_types::{
        BrandId, ConnectionId, CurrencyCode, CustomerId, EntityId, EventType, Money, TenantId,
        TransactionStatus,
    };
    use serde_json::json;

    fn txn(tenant: TenantId, connection: ConnectionId, date: NaiveDate, amount: i64) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            tenant_id: tenant,
            brand_id: BrandId::new(),
            entity_id: EntityId::new(),
            connection_id: connection,
            event_type: EventType::Deposit,
            event_ts: Utc::now(),
            txn_date: date,
            amount: Money::new(amount, CurrencyCode::new("USD").unwrap()),
            original_currency: None,
            fx_rate: None,
            fx_rate_source: None,
            fx_rate_date: None,
            psp_txn_id: "psp_1".to_string(),
            psp_payment_id: None,
            psp_settlement_id: None,
            psp_fee: None,
            net_amount: None,
            customer_id: None,
            status: TransactionStatus::Completed,
            recon_status: ReconStatus::Pending,
            source_idempotency_key: "key_1".to_string(),
            metadata: json!({}),
            version: 0,
        }
    }

    fn settlement(
        tenant: TenantId,
        connection: ConnectionId,
        date: NaiveDate,
        amount: i64,
        batch_id: &str,
        line_no: u32,
    ) -> Settlement {
        Settlement {
            id: recon_types::SettlementId::new(),
            tenant_id: tenant,
            connection_id: connection,
            settlement_date: date,
            batch_id: batch_id.to_string(),
            line_no,
            amount: Money::new(amount, CurrencyCode::new("USD").unwrap()),
            psp_settlement_id: None,
            psp_txn_id_list: Vec::new(),
            fee: None,
            net: None,
        }
    }

    #[tokio::test]
    async fn level1_strong_id_hits_at_full_confidence() {
        let store = Arc::new(InMemoryCanonicalStore::new());
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let mut t = txn(tenant, connection, date, 100_000);
        t.psp_settlement_id = Some("set_A".to_string());
        let t = store.insert_transaction_if_absent(t).await.unwrap();

        let mut s = settlement(tenant, connection, date, 97_100, "b1", 1);
        s.psp_settlement_id = Some("set_A".to_string());
        store.insert_settlement_if_absent(s).await.unwrap();

        let engine = MatchingEngine::new(store.clone());
        let outcome = engine.match_transaction(t.id).await.unwrap();
        assert_eq!(outcome.confidence, 100);
        assert_eq!(outcome.recon_status, ReconStatus::Matched);
        assert_eq!(outcome.match_row.unwrap().level, MatchLevel::StrongId);
    }

    #[tokio::test]
    async fn level2_half_percent_drift_matches_clean() {
        let store = Arc::new(InMemoryCanonicalStore::new());
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let mut t = txn(tenant, connection, date, 100_000);
        t.psp_payment_id = Some("pi_1".to_string());
        let t = store.insert_transaction_if_absent(t).await.unwrap();

        let mut s = settlement(tenant, connection, date, 99_500, "b1", 1);
        s.psp_txn_id_list.push("pi_1".to_string());
        store.insert_settlement_if_absent(s).await.unwrap();

        let engine = MatchingEngine::new(store);
        let outcome = engine.match_transaction(t.id).await.unwrap();
        assert_eq!(outcome.confidence, 95);
        assert_eq!(outcome.recon_status, ReconStatus::Matched);
        assert!(outcome.exception.is_none());
    }

    #[tokio::test]
    async fn level2_exact_one_percent_drift_is_partial_not_matched() {
        let store = Arc::new(InMemoryCanonicalStore::new());
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let mut t = txn(tenant, connection, date, 100_000);
        t.psp_payment_id = Some("pi_1".to_string());
        let t = store.insert_transaction_if_absent(t).await.unwrap();

        // 1_000 off of 100_000 is exactly 1.0% — still a Level-2 candidate
        // (the filter is `<=`) but not "clean" (`<`), so it lands partial.
        let mut s = settlement(tenant, connection, date, 99_000, "b1", 1);
        s.psp_txn_id_list.push("pi_1".to_string());
        store.insert_settlement_if_absent(s).await.unwrap();

        let engine = MatchingEngine::new(store);
        let outcome = engine.match_transaction(t.id).await.unwrap();
        assert_eq!(outcome.recon_status, ReconStatus::PartialMatch);
        let exception = outcome.exception.unwrap();
        assert_eq!(exception.exception_type, ExceptionType::AmountMismatch);
    }

    #[tokio::test]
    async fn level2_two_percent_drift_is_partial_with_exception() {
        let store = Arc::new(InMemoryCanonicalStore::new());
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let mut t = txn(tenant, connection, date, 100_000);
        t.psp_payment_id = Some("pi_1".to_string());
        let t = store.insert_transaction_if_absent(t).await.unwrap();

        let mut s = settlement(tenant, connection, date, 98_000, "b1", 1);
        s.psp_txn_id_list.push("pi_1".to_string());
        store.insert_settlement_if_absent(s).await.unwrap();

        let engine = MatchingEngine::new(store);
        let outcome = engine.match_transaction(t.id).await.unwrap();
        assert_eq!(outcome.recon_status, ReconStatus::PartialMatch);
        let exception = outcome.exception.unwrap();
        assert_eq!(exception.exception_type, ExceptionType::AmountMismatch);
        assert_eq!(exception.priority, ExceptionPriority::P2);
    }

    #[tokio::test]
    async fn level3_dated_shift_with_customer_match() {
        let store = Arc::new(InMemoryCanonicalStore::new());
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let txn_date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let settlement_date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();

        let customer = CustomerId::new();
        let mut t = txn(tenant, connection, txn_date, 100_000);
        t.customer_id = Some(customer);
        let t = store.insert_transaction_if_absent(t).await.unwrap();

        let mut s = settlement(tenant, connection, settlement_date, 100_000, "b1", 1);
        s.psp_txn_id_list.push(customer.to_string());
        store.insert_settlement_if_absent(s).await.unwrap();

        let engine = MatchingEngine::new(store);
        let outcome = engine.match_transaction(t.id).await.unwrap();
        assert_eq!(outcome.confidence, 80);
        assert_eq!(outcome.recon_status, ReconStatus::PartialMatch);
        assert_eq!(
            outcome.exception.unwrap().exception_type,
            ExceptionType::PartialMatch
        );
    }

    #[tokio::test]
    async fn level3_same_day_with_customer_match_scores_ninety() {
        let store = Arc::new(InMemoryCanonicalStore::new());
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        // No psp_settlement_id/psp_payment_id set, so Levels 1–2 can't fire;
        // same-day with a tiny fuzzy drift forces the Level-3 path at Δdate=0.
        let customer = CustomerId::new();
        let mut t = txn(tenant, connection, date, 100_000);
        t.customer_id = Some(customer);
        let t = store.insert_transaction_if_absent(t).await.unwrap();

        let mut s = settlement(tenant, connection, date, 99_950, "b1", 1);
        s.psp_txn_id_list.push(customer.to_string());
        store.insert_settlement_if_absent(s).await.unwrap();

        let engine = MatchingEngine::new(store);
        let outcome = engine.match_transaction(t.id).await.unwrap();
        assert_eq!(outcome.confidence, 90);
        assert_eq!(outcome.recon_status, ReconStatus::PartialMatch);
    }

    #[tokio::test]
    async fn no_candidates_produce_unmatched_exception() {
        let store = Arc::new(InMemoryCanonicalStore::new());
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let t = store
            .insert_transaction_if_absent(txn(tenant, connection, date, 100_000))
            .await
            .unwrap();

        let engine = MatchingEngine::new(store);
        let outcome = engine.match_transaction(t.id).await.unwrap();
        assert_eq!(outcome.recon_status, ReconStatus::Unmatched);
        assert_eq!(
            outcome.exception.unwrap().exception_type,
            ExceptionType::Unmatched
        );
    }

    #[tokio::test]
    async fn already_matched_transaction_returns_early() {
        let store = Arc::new(InMemoryCanonicalStore::new());
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let mut t = txn(tenant, connection, date, 100_000);
        t.psp_settlement_id = Some("set_A".to_string());
        let t = store.insert_transaction_if_absent(t).await.unwrap();

        let mut s = settlement(tenant, connection, date, 100_000, "b1", 1);
        s.psp_settlement_id = Some("set_A".to_string());
        store.insert_settlement_if_absent(s).await.unwrap();

        let engine = MatchingEngine::new(store);
        engine.match_transaction(t.id).await.unwrap();
        let second = engine.match_transaction(t.id).await.unwrap();
        assert_eq!(second.recon_status, ReconStatus::Matched);
        assert_eq!(second.confidence, 100);
    }
}
