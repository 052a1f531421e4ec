use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Canonical event type a [`crate::Transaction`] was normalized into.
/// `Other` is the catch-all extension point: connections that report an
/// event kind without a dedicated variant here still normalize, but
/// `LedgerPoster` has no posting rule for it and will fail fatally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Deposit,
    Withdrawal,
    Refund,
    Chargeback,
    ChargebackReversal,
    Fee,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Refund => "REFUND",
            Self::Chargeback => "CHARGEBACK",
            Self::ChargebackReversal => "CHARGEBACK_REVERSAL",
            Self::Fee => "FEE",
            Self::Other(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum TransactionStatus {
    #[strum(serialize = "PENDING")]
    Pending,
    #[strum(serialize = "COMPLETED")]
    Completed,
    #[strum(serialize = "FAILED")]
    Failed,
    #[strum(serialize = "CANCELLED")]
    Cancelled,
}

/// Reconciliation status state machine owned exclusively by [`crate::Transaction`].
/// `can_transition_to` encodes the allowed state diagram:
/// `PENDING -> {MATCHED, PARTIAL_MATCH, UNMATCHED, EXPECTED}`,
/// `MATCHED -> POSTED`, `* -> VOIDED`, and reprocessing letting
/// `PARTIAL_MATCH`/`UNMATCHED` advance to `MATCHED` on a later run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum ReconStatus {
    #[strum(serialize = "PENDING")]
    Pending,
    #[strum(serialize = "MATCHED")]
    Matched,
    #[strum(serialize = "PARTIAL_MATCH")]
    PartialMatch,
    #[strum(serialize = "UNMATCHED")]
    Unmatched,
    #[strum(serialize = "EXPECTED")]
    Expected,
    #[strum(serialize = "POSTED")]
    Posted,
    #[strum(serialize = "VOIDED")]
    Voided,
}

impl ReconStatus {
    pub fn can_transition_to(&self, next: ReconStatus) -> bool {
        use ReconStatus::*;
        if next == Voided {
            return true;
        }
        match self {
            Pending => matches!(next, Matched | PartialMatch | Unmatched | Expected),
            Matched => matches!(next, Posted),
            PartialMatch | Unmatched => matches!(next, Matched | PartialMatch | Unmatched),
            Expected | Posted | Voided => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum MatchLevel {
    #[strum(serialize = "1")]
    StrongId = 1,
    #[strum(serialize = "2")]
    PspReference = 2,
    #[strum(serialize = "3")]
    Fuzzy = 3,
    #[strum(serialize = "4")]
    AmountDate = 4,
}

impl MatchLevel {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum MatchMethod {
    #[strum(serialize = "AUTO")]
    Auto,
    #[strum(serialize = "MANUAL")]
    Manual,
    #[strum(serialize = "RULE")]
    Rule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum MatchStatus {
    #[strum(serialize = "MATCHED")]
    Matched,
    #[strum(serialize = "PARTIAL_MATCH")]
    PartialMatch,
    #[strum(serialize = "PENDING_REVIEW")]
    PendingReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum ExceptionType {
    #[strum(serialize = "UNMATCHED")]
    Unmatched,
    #[strum(serialize = "PARTIAL_MATCH")]
    PartialMatch,
    #[strum(serialize = "AMOUNT_MISMATCH")]
    AmountMismatch,
    #[strum(serialize = "DUPLICATE")]
    Duplicate,
    #[strum(serialize = "TIMING_MISMATCH")]
    TimingMismatch,
}

/// Ordered so `P1 < P2 < P3 < P4`: "most urgent" sorts first, matching how
/// the exception queue should be drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString)]
pub enum ExceptionPriority {
    #[strum(serialize = "P1")]
    P1,
    #[strum(serialize = "P2")]
    P2,
    #[strum(serialize = "P3")]
    P3,
    #[strum(serialize = "P4")]
    P4,
}

impl ExceptionPriority {
    /// `>= 1_000_000` -> P1, `>= 100_000` -> P2, `>= 10_000` -> P3, else P4.
    /// Operates on the absolute smallest-unit amount regardless of currency.
    pub fn from_amount(amount_smallest_unit: i64) -> Self {
        let amount = amount_smallest_unit.abs();
        if amount >= 1_000_000 {
            Self::P1
        } else if amount >= 100_000 {
            Self::P2
        } else if amount >= 10_000 {
            Self::P3
        } else {
            Self::P4
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum ExceptionStatus {
    #[strum(serialize = "OPEN")]
    Open,
    #[strum(serialize = "UNDER_REVIEW")]
    UnderReview,
    #[strum(serialize = "RESOLVED")]
    Resolved,
    #[strum(serialize = "EXPECTED")]
    Expected,
}
