use std::sync::Arc;

use recon_ports::{
    BusMessage, CanonicalStore, EventBus, FxProvider, NormalizedBusRecord, ParsedEvent, RawEventArchive, Topic,
};
use recon_types::{
    CustomerId, EventType, Money, ReconError, ReconResult, ReconStatus, Settlement, SettlementId, Transaction,
    TransactionId, TransactionStatus,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::registry::ParserRegistry;

/// Consumes raw records from the bus, parses them with the registered PSP
/// parser, enriches into the tenant's settlement currency, and persists the
/// result as a canonical `Transaction`. Runs one record at a time so a
/// caller can choose its own concurrency and retry/backoff policy around
/// `process_next`.
pub struct Normalizer {
    archive: Arc<dyn RawEventArchive>,
    bus: Arc<dyn EventBus>,
    store: Arc<dyn CanonicalStore>,
    fx: Arc<dyn FxProvider>,
    registry: ParserRegistry,
}

impl Normalizer {
    pub fn new(
        archive: Arc<dyn RawEventArchive>,
        bus: Arc<dyn EventBus>,
        store: Arc<dyn CanonicalStore>,
        fx: Arc<dyn FxProvider>,
        registry: ParserRegistry,
    ) -> Self {
        Self {
            archive,
            bus,
            store,
            fx,
            registry,
        }
    }

    /// Pulls and fully processes one raw record, if any is queued. Returns
    /// the ids of every transaction it produced (a single raw payload can
    /// decode into several events, e.g. a settlement CSV).
    #[tracing::instrument(skip(self))]
    pub async fn process_next(&self) -> ReconResult<Vec<TransactionId>> {
        let Some(BusMessage::Raw(record)) = self.bus.poll(Topic::RawEventReceived).await? else {
            return Ok(Vec::new());
        };

        let config = self.registry.connection_config(record.connection)?;
        let parser = self.registry.parser_for(record.connection, &config.psp_name)?;
        let bytes = self.archive.fetch(&record.archive_ref).await?;
        let parsed_events = match parser.parse(&bytes, config.format) {
            Ok(events) => events,
            Err(err) => {
                recon_metrics::parse_error(&record.connection.to_string());
                return Err(err);
            }
        };

        let mut produced = Vec::with_capacity(parsed_events.len());
        for parsed in parsed_events {
            parsed.validate(record.connection)?;

            let (amount_value, original_currency, fx_rate, fx_rate_source, fx_rate_date) =
                if parsed.currency == config.settlement_currency {
                    (parsed.amount_smallest_unit, None, None, None, None)
                } else {
                    let as_of = parsed.created_at.date_naive();
                    let rate = self
                        .fx
                        .rate(parsed.currency, config.settlement_currency, as_of)
                        .await?;
                    let converted = convert_smallest_unit(parsed.amount_smallest_unit, rate.value)
                        .ok_or_else(|| ReconError::FxUnavailable {
                            from: parsed.currency,
                            to: config.settlement_currency,
                            as_of,
                        })?;
                    (
                        converted,
                        Some(parsed.currency),
                        Some(rate.value),
                        Some(rate.source),
                        Some(rate.as_of_date),
                    )
                };

            if parsed.canonical_event_type == EventType::Other("SETTLEMENT".to_string()) {
                let settlement = build_settlement(&config, record.connection, &parsed, amount_value);
                self.store.insert_settlement_if_absent(settlement).await?;
                recon_metrics::event_normalized(&record.connection.to_string());
                continue;
            }

            let txn = Transaction {
                id: TransactionId::new(),
                tenant_id: config.tenant_id,
                brand_id: config.brand_id,
                entity_id: config.entity_id,
                connection_id: record.connection,
                event_type: parsed.canonical_event_type.clone(),
                event_ts: parsed.created_at,
                txn_date: parsed.created_at.date_naive(),
                amount: Money::new(amount_value, config.settlement_currency),
                original_currency,
                fx_rate,
                fx_rate_source,
                fx_rate_date,
                psp_txn_id: parsed.psp_txn_id.clone(),
                psp_payment_id: parsed.psp_payment_id.clone(),
                psp_settlement_id: parsed.psp_settlement_id.clone(),
                psp_fee: parsed.psp_fee,
                net_amount: parsed.net,
                customer_id: parsed.customer_id.as_deref().map(CustomerId::from_external_id),
                status: TransactionStatus::Completed,
                recon_status: ReconStatus::Pending,
                source_idempotency_key: parsed.psp_event_id.clone(),
                metadata: parsed.metadata,
                version: 0,
            };

            txn.check_invariants().map_err(|e| ReconError::ParseError {
                connection: record.connection,
                message: e.to_string(),
            })?;

            let stored = self.store.insert_transaction_if_absent(txn).await?;
            self.bus
                .publish(BusMessage::Normalized(NormalizedBusRecord {
                    tenant: config.tenant_id,
                    transaction: stored.id,
                }))
                .await?;
            recon_metrics::event_normalized(&record.connection.to_string());
            produced.push(stored.id);
        }

        Ok(produced)
    }
}

/// `amount * rate`, floored to the nearest smallest unit, per the
/// floor-on-conversion rule applied everywhere money crosses currencies in
/// this pipeline (never round up, since that would overstate cash).
fn convert_smallest_unit(amount_smallest_unit: i64, rate: Decimal) -> Option<i64> {
    let converted = Decimal::from(amount_smallest_unit) * rate;
    converted.floor().to_i64()
}

/// Builds the `Settlement` row for a parsed settlement-file line. Rows are
/// batched by calendar date (settlement files are exchanged daily per PSP)
/// with `line_no` as their position within that day's file; a PSP that
/// emits more than one file for the same date with overlapping line
/// numbers would collide on the natural key, but none of the connectors
/// registered here do that.
fn build_settlement(
    config: &crate::registry::ConnectionConfig,
    connection: recon_types::ConnectionId,
    parsed: &ParsedEvent,
    amount_value: i64,
) -> Settlement {
    let settlement_date = parsed.created_at.date_naive();
    Settlement {
        id: SettlementId::new(),
        tenant_id: config.tenant_id,
        connection_id: connection,
        settlement_date,
        batch_id: settlement_date.to_string(),
        line_no: parsed.settlement_line_no.unwrap_or(0),
        amount: Money::new(amount_value, config.settlement_currency),
        psp_settlement_id: parsed.psp_settlement_id.clone(),
        psp_txn_id_list: vec![parsed.psp_txn_id.clone()],
        fee: parsed.psp_fee,
        net: parsed.net,
    }
}
