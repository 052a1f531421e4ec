//! Canonical data model for the reconciliation pipeline: tenant-scoped
//! entities, money, and the taxonomy of errors every stage returns.
//!
//! This crate has no I/O — it is imported by every other crate in the
//! workspace and must stay that way.

mod enums;
mod error;
mod exception;
mod ids;
mod ledger;
mod match_;
mod money;
mod raw_record;
mod settlement;
mod transaction;

pub use enums::{
    EventType, ExceptionPriority, ExceptionStatus, ExceptionType, MatchLevel, MatchMethod,
    MatchStatus, ReconStatus, TransactionStatus,
};
pub use error::{ReconError, ReconResult};
pub use exception::Exception;
pub use ids::{
    BrandId, ConnectionId, CustomerId, EntityId, ExceptionId, LedgerEntryId, MatchId, RawRecordId,
    SettlementId, TenantId, TenantScope, TransactionId,
};
pub use ledger::{postings_balance, posting_totals, Account, LedgerEntry};
pub use match_::Match;
pub use money::{CurrencyCode, Money};
pub use raw_record::{ArchiveRef, RawRecord};
pub use settlement::Settlement;
pub use transaction::{Transaction, TransactionInvariantError};
