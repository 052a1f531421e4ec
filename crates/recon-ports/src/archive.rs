use async_trait::async_trait;
use recon_types::{ArchiveRef, ConnectionId, ReconResult, TenantId};

/// Immutable store for raw inbound payloads, written before any parsing is
/// attempted so a failed or buggy parse can be replayed from the original
/// bytes. Content is addressed by the ref it hands back from `store`.
#[async_trait]
pub trait RawEventArchive: Send + Sync {
    async fn store(
        &self,
        tenant: TenantId,
        connection: ConnectionId,
        bytes: &[u8],
    ) -> ReconResult<ArchiveRef>;

    async fn fetch(&self, archive_ref: &ArchiveRef) -> ReconResult<Vec<u8>>;
}
