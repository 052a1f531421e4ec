use std::collections::HashMap;

use recon_ports::{EventFormat, Parser};
use recon_types::{ConnectionId, ReconError, ReconResult};

/// Per-connection configuration needed to dispatch a raw payload to the
/// right parser and enrich it into the tenant's settlement currency.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub psp_name: String,
    pub format: EventFormat,
    pub tenant_id: recon_types::TenantId,
    pub brand_id: recon_types::BrandId,
    pub entity_id: recon_types::EntityId,
    pub settlement_currency: recon_types::CurrencyCode,
}

/// Maps a connection to its configuration and a PSP name to the `Parser`
/// that understands it. Kept as two small maps rather than folding the
/// parser into `ConnectionConfig` so the same parser instance is shared
/// across every connection for that PSP.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Box<dyn Parser>>,
    connections: HashMap<ConnectionId, ConnectionConfig>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_parser(&mut self, psp_name: impl Into<String>, parser: Box<dyn Parser>) {
        self.parsers.insert(psp_name.into(), parser);
    }

    pub fn register_connection(&mut self, connection: ConnectionId, config: ConnectionConfig) {
        self.connections.insert(connection, config);
    }

    pub fn connection_config(&self, connection: ConnectionId) -> ReconResult<&ConnectionConfig> {
        self.connections
            .get(&connection)
            .ok_or_else(|| ReconError::ConfigMissing {
                connection,
                detail: "no connection configuration registered".to_string(),
            })
    }

    pub fn parser_for(&self, connection: ConnectionId, psp_name: &str) -> ReconResult<&dyn Parser> {
        self.parsers
            .get(psp_name)
            .map(|p| p.as_ref())
            .ok_or_else(|| ReconError::ConfigMissing {
                connection,
                detail: format!("no parser registered for psp '{psp_name}'"),
            })
    }
}
