use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recon_types::{
    ArchiveRef, ConnectionId, MatchId, ReconResult, TenantId, TransactionId,
};

/// Topics the pipeline stages publish to and consume from. Each stage only
/// ever consumes the topic immediately upstream of it, so the enum also
/// documents the pipeline's stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    RawEventReceived,
    TransactionNormalized,
    TransactionMatched,
}

/// Published right after a webhook payload has been archived and
/// deduplicated. Carries enough to let the normalizer re-fetch the raw
/// bytes without the intake stage doing any parsing itself.
#[derive(Debug, Clone)]
pub struct RawBusRecord {
    pub tenant: TenantId,
    pub connection: ConnectionId,
    pub archive_ref: ArchiveRef,
    pub received_at: DateTime<Utc>,
}

/// Published once a raw record has been parsed, FX-enriched and persisted
/// as a canonical `Transaction`.
#[derive(Debug, Clone)]
pub struct NormalizedBusRecord {
    pub tenant: TenantId,
    pub transaction: TransactionId,
}

/// Published once the matching engine has reached a terminal or
/// human-actionable outcome for a transaction.
#[derive(Debug, Clone)]
pub struct MatchedBusRecord {
    pub tenant: TenantId,
    pub transaction: TransactionId,
    pub match_id: Option<MatchId>,
}

/// The envelope actually moved across the bus. Kept as one enum (rather than
/// three separately-typed channels) so a single `EventBus` implementation
/// can back every topic.
#[derive(Debug, Clone)]
pub enum BusMessage {
    Raw(RawBusRecord),
    Normalized(NormalizedBusRecord),
    Matched(MatchedBusRecord),
}

impl BusMessage {
    pub fn topic(&self) -> Topic {
        match self {
            BusMessage::Raw(_) => Topic::RawEventReceived,
            BusMessage::Normalized(_) => Topic::TransactionNormalized,
            BusMessage::Matched(_) => Topic::TransactionMatched,
        }
    }
}

/// Durable-enough pub/sub between pipeline stages. Implementations decide
/// their own delivery guarantees (at-least-once is assumed by every
/// consumer, since every downstream write this crate defines is either
/// idempotent or conditional).
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, message: BusMessage) -> ReconResult<()>;

    /// Pulls the next message for `topic`, if any is queued. Consumers poll
    /// rather than receive a callback so the reference in-memory
    /// implementation and any durable backend can share one trait shape.
    async fn poll(&self, topic: Topic) -> ReconResult<Option<BusMessage>>;
}
