use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionId, RawRecordId, TenantId};

/// A reference to bytes stored in a `RawEventArchive`. Opaque from the
/// pipeline's point of view — only the archive port knows how to resolve
/// it back to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRef(pub String);

impl std::fmt::Display for ArchiveRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw event row. `idempotency_key` is unique per tenant and is
/// never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: RawRecordId,
    pub tenant_id: TenantId,
    pub connection_id: ConnectionId,
    pub idempotency_key: String,
    pub bytes_ref: ArchiveRef,
    pub ingested_at: DateTime<Utc>,
}
