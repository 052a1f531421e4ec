use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, LedgerEntryId, MatchId, TenantId, TransactionId};
use crate::money::Money;

/// Fixed chart-of-accounts codes. Kept as a closed enum rather
/// than free-form strings so an unmapped account is a compile error, not a
/// runtime typo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Account {
    Cash { psp: String, currency: crate::money::CurrencyCode },
    AccountsReceivable,
    PlayerBalances,
    PspFees,
    ChargebackLosses,
    FxGains,
    FxLosses,
    GamingRevenue,
}

impl Account {
    pub fn cash(psp: impl Into<String>, currency: crate::money::CurrencyCode) -> Self {
        Self::Cash { psp: psp.into(), currency }
    }

    pub fn code(&self) -> String {
        match self {
            Self::Cash { psp, currency } => format!("CASH:{psp}:{}", currency.as_str()),
            Self::AccountsReceivable => "ACCOUNTS_RECEIVABLE".to_string(),
            Self::PlayerBalances => "PLAYER_BALANCES".to_string(),
            Self::PspFees => "PSP_FEES".to_string(),
            Self::ChargebackLosses => "CHARGEBACK_LOSSES".to_string(),
            Self::FxGains => "FX_GAINS".to_string(),
            Self::FxLosses => "FX_LOSSES".to_string(),
            Self::GamingRevenue => "GAMING_REVENUE".to_string(),
        }
    }
}

/// An append-only double-entry posting row. `amount > 0`, and
/// `debit_account != credit_account` except for the chargeback reversal
/// marker, which intentionally debits and credits the same account to
/// leave an audit trail (see DESIGN.md for the reasoning).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub tenant_id: TenantId,
    pub entity_id: EntityId,
    pub txn_date: NaiveDate,
    pub debit_account: String,
    pub credit_account: String,
    pub amount: Money,
    pub ref_transaction: TransactionId,
    pub ref_match: MatchId,
    pub description: String,
    pub posted_at: DateTime<Utc>,
}

/// Tallies `entries` into a debit-side total and a credit-side total per
/// currency, each built from its own side's accounts rather than folded
/// into one shared bucket, so the two can actually diverge if the entries
/// don't pair up correctly.
pub fn posting_totals(
    entries: &[LedgerEntry],
) -> std::collections::HashMap<crate::money::CurrencyCode, (i64, i64)> {
    use std::collections::HashMap;

    let mut debits: HashMap<(String, crate::money::CurrencyCode), i64> = HashMap::new();
    let mut credits: HashMap<(String, crate::money::CurrencyCode), i64> = HashMap::new();

    for entry in entries {
        *debits
            .entry((entry.debit_account.clone(), entry.amount.currency))
            .or_default() += entry.amount.value;
        *credits
            .entry((entry.credit_account.clone(), entry.amount.currency))
            .or_default() += entry.amount.value;
    }

    let mut totals: HashMap<crate::money::CurrencyCode, (i64, i64)> = HashMap::new();
    for ((_, currency), value) in debits {
        totals.entry(currency).or_default().0 += value;
    }
    for ((_, currency), value) in credits {
        totals.entry(currency).or_default().1 += value;
    }
    totals
}

/// Checks `sum(debits) == sum(credits)` per currency for one posting group,
/// tallied separately by [`posting_totals`]. An empty group is never
/// balanced: every event type's entry builder posts at least one leg, so
/// zero entries means something upstream dropped them rather than that
/// there was nothing to post.
pub fn postings_balance(entries: &[LedgerEntry]) -> bool {
    if entries.is_empty() {
        return false;
    }
    posting_totals(entries).values().all(|(debit, credit)| debit == credit)
}
