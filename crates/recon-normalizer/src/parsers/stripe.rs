use chrono::{DateTime, TimeZone, Utc};
use recon_ports::{EventFormat, ParsedEvent, Parser};
use recon_types::{ConnectionId, CurrencyCode, EventType, ReconError, ReconResult};
use serde_json::Value;

/// Parses Stripe webhook JSON and settlement CSV exports. Grounded on the
/// event-type mapping Stripe documents for `payment_intent`/`charge`/
/// `payout` events.
pub struct StripeParser {
    connection: ConnectionId,
}

impl StripeParser {
    pub fn new(connection: ConnectionId) -> Self {
        Self { connection }
    }

    fn normalize_event_type(psp_event_type: &str) -> EventType {
        match psp_event_type {
            "payment_intent.succeeded" | "charge.succeeded" => EventType::Deposit,
            "charge.refunded" => EventType::Refund,
            "charge.dispute.created" => EventType::Chargeback,
            "charge.dispute.closed" => EventType::ChargebackReversal,
            "payout.paid" => EventType::Other("SETTLEMENT".to_string()),
            other => EventType::Other(other.to_ascii_uppercase()),
        }
    }

    fn parse_json(&self, bytes: &[u8]) -> ReconResult<Vec<ParsedEvent>> {
        let root: Value = serde_json::from_slice(bytes).map_err(|e| ReconError::ParseError {
            connection: self.connection,
            message: format!("invalid Stripe JSON: {e}"),
        })?;

        let items: Vec<&Value> = if root.get("type").is_some() && root.get("data").is_some() {
            vec![&root]
        } else {
            root.as_array()
                .ok_or_else(|| ReconError::ParseError {
                    connection: self.connection,
                    message: "expected a Stripe event object or array".to_string(),
                })?
                .iter()
                .collect()
        };

        items.into_iter().map(|item| self.parse_event(item)).collect()
    }

    fn parse_event(&self, item: &Value) -> ReconResult<ParsedEvent> {
        let psp_event_id = item
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ReconError::ParseError {
                connection: self.connection,
                message: "missing event id".to_string(),
            })?
            .to_string();

        let psp_event_type = item
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let object = item
            .get("data")
            .and_then(|d| d.get("object"))
            .cloned()
            .unwrap_or(Value::Null);

        let amount_smallest_unit = object.get("amount").and_then(Value::as_i64).unwrap_or(0);
        let currency = object
            .get("currency")
            .and_then(Value::as_str)
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_else(|| "USD".to_string());
        let currency = CurrencyCode::new(&currency).map_err(|e| ReconError::ParseError {
            connection: self.connection,
            message: e.to_string(),
        })?;

        let created_at = item
            .get("created")
            .and_then(Value::as_i64)
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(ParsedEvent {
            psp_event_id: psp_event_id.clone(),
            canonical_event_type: Self::normalize_event_type(&psp_event_type),
            psp_event_type,
            psp_txn_id: object
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or(&psp_event_id)
                .to_string(),
            psp_payment_id: object
                .get("payment_intent")
                .and_then(Value::as_str)
                .map(str::to_string),
            // Present once Stripe has assigned the charge to a payout
            // batch; absent on the initial `payment_intent.succeeded`
            // delivery, which is why Level-1 matching only ever fires for
            // transactions updated after settlement, not on first receipt.
            psp_settlement_id: object
                .get("balance_transaction")
                .and_then(Value::as_str)
                .map(str::to_string),
            amount_smallest_unit,
            currency,
            psp_fee: None,
            net: None,
            created_at,
            customer_id: object.get("customer").and_then(Value::as_str).map(str::to_string),
            metadata: object,
            settlement_line_no: None,
        })
    }

    fn parse_csv(&self, bytes: &[u8]) -> ReconResult<Vec<ParsedEvent>> {
        super::csv::parse_settlement_csv(self.connection, bytes, |row, line_no| {
            let amount = super::csv::parse_cents(row.get("amount"))?;
            let fee = super::csv::parse_cents(row.get("fee")).unwrap_or(0);
            let net = super::csv::parse_cents(row.get("net")).unwrap_or(amount - fee);
            let currency = row
                .get("currency")
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| "USD".to_string());
            let currency = CurrencyCode::new(&currency).ok()?;
            let created_at = row
                .get("created")
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);

            Some(ParsedEvent {
                psp_event_id: row.get("id").cloned().unwrap_or_default(),
                psp_event_type: "SETTLEMENT".to_string(),
                canonical_event_type: EventType::Other("SETTLEMENT".to_string()),
                psp_txn_id: row.get("id").cloned().unwrap_or_default(),
                psp_payment_id: row.get("payment_intent").cloned(),
                psp_settlement_id: row.get("id").cloned(),
                amount_smallest_unit: amount,
                currency,
                psp_fee: Some(fee),
                net: Some(net),
                created_at,
                customer_id: None,
                metadata: Value::Null,
                settlement_line_no: Some(line_no),
            })
        })
    }
}

impl Parser for StripeParser {
    fn parse(&self, bytes: &[u8], format: EventFormat) -> ReconResult<Vec<ParsedEvent>> {
        match format {
            EventFormat::Json => self.parse_json(bytes),
            EventFormat::Csv => self.parse_csv(bytes),
            EventFormat::Xlsx => Err(ReconError::ParseError {
                connection: self.connection,
                message: "xlsx settlement files are not yet supported for Stripe".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_webhook_event() {
        let parser = StripeParser::new(ConnectionId::new());
        let payload = br#"{
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "created": 1700000000,
            "data": {"object": {"id": "pi_1", "amount": 2500, "currency": "usd"}}
        }"#;
        let events = parser.parse(payload, EventFormat::Json).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].canonical_event_type, EventType::Deposit);
        assert_eq!(events[0].amount_smallest_unit, 2500);
        assert_eq!(events[0].currency.as_str(), "USD");
    }

    #[test]
    fn parses_array_of_events() {
        let parser = StripeParser::new(ConnectionId::new());
        let payload = br#"[
            {"id": "evt_1", "type": "charge.succeeded", "data": {"object": {"id": "ch_1", "amount": 100, "currency": "usd"}}},
            {"id": "evt_2", "type": "charge.refunded", "data": {"object": {"id": "ch_2", "amount": 50, "currency": "usd"}}}
        ]"#;
        let events = parser.parse(payload, EventFormat::Json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].canonical_event_type, EventType::Refund);
    }

    #[test]
    fn parses_settlement_csv() {
        let parser = StripeParser::new(ConnectionId::new());
        let csv = b"id,amount,currency,fee,net\ntxn_1,100.00,USD,2.50,97.50\n";
        let events = parser.parse(csv, EventFormat::Csv).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].amount_smallest_unit, 10000);
        assert_eq!(events[0].psp_fee, Some(250));
    }
}
