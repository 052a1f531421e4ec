//! Webhook intake: verifies a PSP's signature, deduplicates by idempotency
//! key, archives the raw payload and hands a reference off to the bus for
//! the normalizer to pick up. Nothing here parses PSP-specific payloads —
//! that is the normalizer's job, kept downstream so a signature failure or
//! a duplicate never touches a parser.

mod signature;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use recon_ports::{BusMessage, EventBus, IdempotencyStore, RawBusRecord, RawEventArchive};
use recon_types::{ConnectionId, ReconResult, TenantId};
pub use signature::verify_hmac_sha256;

/// Per-connection inbound webhook settings. One `recon-intake` deployment
/// serves many connections; the caller resolves this from its own
/// configuration store and passes it in per request.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub signing_secret: Vec<u8>,
    pub idempotency_ttl: Duration,
}

/// Everything in a single inbound webhook delivery that intake needs,
/// independent of wire format (JSON/form/etc. are all just `body` bytes by
/// this point — only the outer HTTP framing differs, and that's the
/// caller's concern, not this crate's).
#[derive(Debug, Clone)]
pub struct InboundWebhook<'a> {
    pub body: &'a [u8],
    pub signature_header: Option<&'a str>,
    pub idempotency_header: Option<&'a str>,
    pub psp_event_id: Option<&'a str>,
    pub psp_event_type: Option<&'a str>,
    pub psp_timestamp: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Accepted,
    Duplicate,
}

/// Derives the idempotency key for a delivery: the PSP's own idempotency
/// header if it sent one, otherwise a composite of fields that are stable
/// across retries of the same logical event.
fn derive_idempotency_key(connection: ConnectionId, webhook: &InboundWebhook<'_>) -> String {
    if let Some(header) = webhook.idempotency_header {
        return header.to_string();
    }
    format!(
        "{connection}|{}|{}|{}",
        webhook.psp_event_id.unwrap_or(""),
        webhook.psp_event_type.unwrap_or(""),
        webhook.psp_timestamp.unwrap_or(""),
    )
}

pub struct WebhookIntake {
    archive: Arc<dyn RawEventArchive>,
    idempotency: Arc<dyn IdempotencyStore>,
    bus: Arc<dyn EventBus>,
}

impl WebhookIntake {
    pub fn new(
        archive: Arc<dyn RawEventArchive>,
        idempotency: Arc<dyn IdempotencyStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            archive,
            idempotency,
            bus,
        }
    }

    #[tracing::instrument(skip(self, config, webhook), fields(connection = %connection))]
    pub async fn handle(
        &self,
        tenant: TenantId,
        connection: ConnectionId,
        config: &WebhookConfig,
        webhook: InboundWebhook<'_>,
    ) -> ReconResult<IntakeOutcome> {
        let Some(signature) = webhook.signature_header else {
            recon_metrics::webhook_rejected(&connection.to_string(), "bad_signature");
            return Err(recon_types::ReconError::BadSignature { connection });
        };
        if let Err(err) =
            verify_hmac_sha256(connection, &config.signing_secret, webhook.body, signature)
        {
            recon_metrics::webhook_rejected(&connection.to_string(), "bad_signature");
            return Err(err);
        }

        let archive_ref = self.archive.store(tenant, connection, webhook.body).await?;
        let idempotency_key = derive_idempotency_key(connection, &webhook);

        let outcome = self
            .idempotency
            .reserve(tenant, &idempotency_key, archive_ref.clone(), config.idempotency_ttl)
            .await?;

        match outcome {
            recon_ports::ReserveOutcome::AlreadyExists { .. } => {
                tracing::debug!(idempotency_key, "duplicate webhook delivery, skipping");
                recon_metrics::webhook_duplicate(&connection.to_string());
                Ok(IntakeOutcome::Duplicate)
            }
            recon_ports::ReserveOutcome::Reserved => {
                self.bus
                    .publish(BusMessage::Raw(RawBusRecord {
                        tenant,
                        connection,
                        archive_ref,
                        received_at: Utc::now(),
                    }))
                    .await?;
                recon_metrics::webhook_accepted(&connection.to_string());
                Ok(IntakeOutcome::Accepted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_ports::{BusMessage, Topic};
    use recon_storage::{InMemoryEventBus, InMemoryIdempotencyStore, InMemoryRawEventArchive};

    fn intake() -> (WebhookIntake, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        let intake = WebhookIntake::new(
            Arc::new(InMemoryRawEventArchive::new()),
            Arc::new(InMemoryIdempotencyStore::new()),
            bus.clone(),
        );
        (intake, bus)
    }

    fn config() -> WebhookConfig {
        WebhookConfig {
            signing_secret: b"whsec_test".to_vec(),
            idempotency_ttl: Duration::from_secs(3600),
        }
    }

    fn sign(secret: &[u8], body: &[u8]) -> String {
        use hmac::{Hmac, Mac};
        let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[tokio::test]
    async fn accepts_signed_delivery_and_publishes() {
        let (intake, bus) = intake();
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let config = config();
        let signature = sign(&config.signing_secret, b"{}");
        let webhook = InboundWebhook {
            body: b"{}",
            signature_header: Some(&signature),
            idempotency_header: Some("evt_1"),
            psp_event_id: Some("evt_1"),
            psp_event_type: Some("payment.succeeded"),
            psp_timestamp: Some("2026-01-01T00:00:00Z"),
        };
        let outcome = intake.handle(tenant, connection, &config, webhook).await.unwrap();
        assert_eq!(outcome, IntakeOutcome::Accepted);
        assert!(matches!(
            bus.poll(Topic::RawEventReceived).await.unwrap(),
            Some(BusMessage::Raw(_))
        ));
    }

    #[tokio::test]
    async fn replay_of_same_delivery_is_deduplicated() {
        let (intake, bus) = intake();
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let config = config();
        let signature = sign(&config.signing_secret, b"{}");
        let webhook = || InboundWebhook {
            body: b"{}",
            signature_header: Some(&signature),
            idempotency_header: Some("evt_1"),
            psp_event_id: Some("evt_1"),
            psp_event_type: Some("payment.succeeded"),
            psp_timestamp: Some("2026-01-01T00:00:00Z"),
        };
        intake.handle(tenant, connection, &config, webhook()).await.unwrap();
        let second = intake.handle(tenant, connection, &config, webhook()).await.unwrap();
        assert_eq!(second, IntakeOutcome::Duplicate);

        assert!(bus.poll(Topic::RawEventReceived).await.unwrap().is_some());
        assert!(bus.poll(Topic::RawEventReceived).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_before_archiving() {
        let (intake, _bus) = intake();
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let webhook = InboundWebhook {
            body: b"{}",
            signature_header: Some("deadbeef"),
            idempotency_header: Some("evt_1"),
            psp_event_id: Some("evt_1"),
            psp_event_type: Some("payment.succeeded"),
            psp_timestamp: Some("2026-01-01T00:00:00Z"),
        };
        let err = intake.handle(tenant, connection, &config(), webhook).await.unwrap_err();
        assert!(matches!(err, recon_types::ReconError::BadSignature { .. }));
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let (intake, _bus) = intake();
        let tenant = TenantId::new();
        let connection = ConnectionId::new();
        let webhook = InboundWebhook {
            body: b"{}",
            signature_header: None,
            idempotency_header: Some("evt_1"),
            psp_event_id: Some("evt_1"),
            psp_event_type: Some("payment.succeeded"),
            psp_timestamp: Some("2026-01-01T00:00:00Z"),
        };
        let err = intake.handle(tenant, connection, &config(), webhook).await.unwrap_err();
        assert!(matches!(err, recon_types::ReconError::BadSignature { .. }));
    }
}
