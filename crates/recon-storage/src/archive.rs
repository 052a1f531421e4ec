use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use recon_ports::RawEventArchive;
use recon_types::{ArchiveRef, ConnectionId, ReconError, ReconResult, TenantId};

/// Reference [`RawEventArchive`]: bytes never leave the process, keyed by a
/// monotonically increasing counter rather than a content hash so repeated
/// identical payloads (legitimately re-sent by a PSP) don't collide.
#[derive(Default)]
pub struct InMemoryRawEventArchive {
    next_id: AtomicU64,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryRawEventArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RawEventArchive for InMemoryRawEventArchive {
    async fn store(
        &self,
        tenant: TenantId,
        connection: ConnectionId,
        bytes: &[u8],
    ) -> ReconResult<ArchiveRef> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let key = format!("{tenant}/{connection}/{id}");
        self.blobs.write().insert(key.clone(), bytes.to_vec());
        Ok(ArchiveRef(key))
    }

    async fn fetch(&self, archive_ref: &ArchiveRef) -> ReconResult<Vec<u8>> {
        self.blobs
            .read()
            .get(&archive_ref.0)
            .cloned()
            .ok_or_else(|| ReconError::NotFound {
                detail: format!("archive ref {archive_ref} not found"),
            })
    }
}
