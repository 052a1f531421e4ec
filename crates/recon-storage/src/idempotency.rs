use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use recon_ports::{IdempotencyStore, ReserveOutcome};
use recon_types::{ArchiveRef, ReconResult, TenantId};

struct Entry {
    archive_ref: ArchiveRef,
    expires_at: Instant,
}

/// Reference [`IdempotencyStore`] backed by a single mutex-guarded map.
/// Expired entries are swept lazily on the next `reserve` for the same key
/// rather than on a background timer, which is sufficient for a
/// single-process deployment.
#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    entries: Mutex<HashMap<(TenantId, String), Entry>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn reserve(
        &self,
        tenant: TenantId,
        key: &str,
        archive_ref: ArchiveRef,
        ttl: Duration,
    ) -> ReconResult<ReserveOutcome> {
        let mut entries = self.entries.lock();
        let map_key = (tenant, key.to_string());
        let now = Instant::now();

        if let Some(existing) = entries.get(&map_key) {
            if existing.expires_at > now {
                return Ok(ReserveOutcome::AlreadyExists {
                    archive_ref: existing.archive_ref.clone(),
                });
            }
        }

        entries.insert(
            map_key,
            Entry {
                archive_ref,
                expires_at: now + ttl,
            },
        );
        Ok(ReserveOutcome::Reserved)
    }
}
