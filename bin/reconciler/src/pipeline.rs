use std::sync::Arc;

use recon_intake::{WebhookConfig, WebhookIntake};
use recon_ledger::{LedgerPoster, PspDirectory};
use recon_matching::MatchingEngine;
use recon_normalizer::{AdyenParser, ConnectionConfig, Normalizer, ParserRegistry, StripeParser};
use recon_ports::{CanonicalStore, EventFormat};
use recon_storage::{
    InMemoryCanonicalStore, InMemoryEventBus, InMemoryIdempotencyStore, InMemoryRawEventArchive,
    StaticFxProvider,
};
use recon_types::{BrandId, ConnectionId, CurrencyCode, EntityId, ReconStatus, TenantId};

/// Everything one connection needs to run end to end: the ports, the
/// identity the connection is registered under, and the stage objects
/// wired to those ports. Built once per process; `bin/reconciler`'s `main`
/// drives it, and the integration tests drive it directly without going
/// through the CLI at all.
pub struct Pipeline {
    pub tenant_id: TenantId,
    pub connection_id: ConnectionId,
    pub archive: Arc<InMemoryRawEventArchive>,
    pub bus: Arc<InMemoryEventBus>,
    pub store: Arc<InMemoryCanonicalStore>,
    pub intake: WebhookIntake,
    pub normalizer: Normalizer,
    pub matching: MatchingEngine,
    pub ledger: LedgerPoster,
    pub webhook_config: WebhookConfig,
}

pub struct PipelineConfig {
    pub psp_name: String,
    pub settlement_currency: CurrencyCode,
    pub signing_secret: Vec<u8>,
    pub idempotency_ttl: std::time::Duration,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let tenant_id = TenantId::new();
        let connection_id = ConnectionId::new();
        let brand_id = BrandId::new();
        let entity_id = EntityId::new();

        let archive = Arc::new(InMemoryRawEventArchive::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let store = Arc::new(InMemoryCanonicalStore::new());
        let fx = Arc::new(StaticFxProvider::new());

        let mut registry = ParserRegistry::new();
        match config.psp_name.as_str() {
            "adyen" => registry.register_parser("adyen", Box::new(AdyenParser::new(connection_id))),
            _ => registry.register_parser("stripe", Box::new(StripeParser::new(connection_id))),
        }
        registry.register_connection(
            connection_id,
            ConnectionConfig {
                psp_name: config.psp_name.clone(),
                format: EventFormat::Json,
                tenant_id,
                brand_id,
                entity_id,
                settlement_currency: config.settlement_currency,
            },
        );

        let mut psp_directory = PspDirectory::new();
        psp_directory.register(connection_id, config.psp_name.clone());

        let intake = WebhookIntake::new(
            archive.clone(),
            Arc::new(InMemoryIdempotencyStore::new()),
            bus.clone(),
        );
        let normalizer = Normalizer::new(archive.clone(), bus.clone(), store.clone(), fx, registry);
        let matching = MatchingEngine::new(store.clone());
        let ledger = LedgerPoster::new(store.clone(), psp_directory);

        Self {
            tenant_id,
            connection_id,
            archive,
            bus,
            store,
            intake,
            normalizer,
            matching,
            ledger,
            webhook_config: WebhookConfig {
                signing_secret: config.signing_secret,
                idempotency_ttl: config.idempotency_ttl,
            },
        }
    }

    /// Drains the bus into canonical transactions: every raw record the
    /// intake stage queued gets parsed and persisted before this returns.
    pub async fn drain_normalizer(&self) -> recon_types::ReconResult<usize> {
        let mut total = 0;
        loop {
            let produced = self.normalizer.process_next().await?;
            if produced.is_empty() {
                break;
            }
            total += produced.len();
        }
        Ok(total)
    }

    /// Runs the matching ladder over every transaction not yet settled,
    /// then posts a balanced ledger entry set for each one that cleanly
    /// matched. Returns `(matched, posted)` counts.
    pub async fn reconcile_and_post(&self) -> recon_types::ReconResult<(usize, usize)> {
        let pending = self
            .store
            .unreconciled_transactions(self.tenant_id, self.connection_id)
            .await?;

        let mut matched = 0;
        let mut posted = 0;
        for txn in pending {
            let outcome = self.matching.match_transaction(txn.id).await?;
            if outcome.recon_status != ReconStatus::Matched {
                continue;
            }
            matched += 1;
            let Some(m) = outcome.match_row else { continue };
            self.ledger.post(txn.id, m.id).await?;
            posted += 1;
        }
        Ok((matched, posted))
    }
}
