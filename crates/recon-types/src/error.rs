use chrono::NaiveDate;

use crate::ids::{ConnectionId, TransactionId};
use crate::money::CurrencyCode;

/// Error taxonomy for the whole pipeline. These are *kinds*, not wire/transport
/// errors — each stage maps its own I/O failures onto one of these before
/// it crosses a crate boundary, so callers only ever match on this enum.
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("signature verification failed for connection {connection}")]
    BadSignature { connection: ConnectionId },

    #[error("duplicate event for idempotency key {idempotency_key}")]
    Duplicate { idempotency_key: String },

    #[error("failed to parse event for connection {connection}: {message}")]
    ParseError {
        connection: ConnectionId,
        message: String,
    },

    #[error("connection {connection} is missing configuration: {detail}")]
    ConfigMissing {
        connection: ConnectionId,
        detail: String,
    },

    #[error("no fx rate for {from}->{to} as of {as_of}")]
    FxUnavailable {
        from: CurrencyCode,
        to: CurrencyCode,
        as_of: NaiveDate,
    },

    #[error("no settlement candidate matched transaction {transaction_id}")]
    NoMatch { transaction_id: TransactionId },

    #[error(
        "ledger postings for transaction {transaction_id} do not balance in {currency}: \
         debits={debit_total} credits={credit_total}"
    )]
    LedgerUnbalanced {
        transaction_id: TransactionId,
        currency: CurrencyCode,
        debit_total: i64,
        credit_total: i64,
    },

    #[error("unsupported event type for ledger posting: {event_type}")]
    UnsupportedEventType { event_type: String },

    #[error("transient storage error: {detail}")]
    StorageTransient { detail: String },

    #[error("storage conflict: {detail}")]
    StorageConflict { detail: String },

    #[error("not found: {detail}")]
    NotFound { detail: String },
}

pub type ReconResult<T> = Result<T, ReconError>;
