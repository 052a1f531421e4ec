use std::time::Duration;

use async_trait::async_trait;
use recon_types::{ArchiveRef, ReconResult, TenantId};

/// Outcome of a content-addressed dedup check against an [`IdempotencyStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// No row existed for this key; it has now been inserted with the given
    /// expiry and points at `archive_ref`.
    Reserved,
    /// A row already existed; its `archive_ref` is returned so the caller
    /// doesn't have to look it up separately. No side effects are repeated.
    AlreadyExists { archive_ref: ArchiveRef },
}

/// Content-addressed dedup table with TTL. `reserve` must be
/// atomic: exactly one caller racing on the same `(tenant, key)` observes
/// `Reserved`, everyone else observes `AlreadyExists`.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn reserve(
        &self,
        tenant: TenantId,
        key: &str,
        archive_ref: ArchiveRef,
        ttl: Duration,
    ) -> ReconResult<ReserveOutcome>;
}
