use chrono::{DateTime, Utc};
use recon_ports::{EventFormat, ParsedEvent, Parser};
use recon_types::{ConnectionId, CurrencyCode, EventType, ReconError, ReconResult};
use serde_json::Value;

/// Parses Adyen's `notificationItems` webhook envelope and settlement CSV
/// exports. Grounded on the event-code mapping Adyen documents for
/// authorisation/capture/refund/chargeback/payout notifications.
pub struct AdyenParser {
    connection: ConnectionId,
}

impl AdyenParser {
    pub fn new(connection: ConnectionId) -> Self {
        Self { connection }
    }

    fn normalize_event_type(event_code: &str) -> EventType {
        match event_code {
            "AUTHORISATION" | "CAPTURE" => EventType::Deposit,
            "REFUND" => EventType::Refund,
            "CHARGEBACK" => EventType::Chargeback,
            "CHARGEBACK_REVERSED" => EventType::ChargebackReversal,
            "PAYOUT" => EventType::Other("SETTLEMENT".to_string()),
            other => EventType::Other(other.to_ascii_uppercase()),
        }
    }

    fn parse_json(&self, bytes: &[u8]) -> ReconResult<Vec<ParsedEvent>> {
        let root: Value = serde_json::from_slice(bytes).map_err(|e| ReconError::ParseError {
            connection: self.connection,
            message: format!("invalid Adyen JSON: {e}"),
        })?;

        if let Some(items) = root.get("notificationItems").and_then(Value::as_array) {
            items
                .iter()
                .map(|item| {
                    let notification = item.get("NotificationRequestItem").cloned().unwrap_or(Value::Null);
                    self.parse_notification(&notification)
                })
                .collect()
        } else {
            Ok(vec![self.parse_notification(&root)?])
        }
    }

    fn parse_notification(&self, notification: &Value) -> ReconResult<ParsedEvent> {
        let psp_event_id = notification
            .get("pspReference")
            .and_then(Value::as_str)
            .ok_or_else(|| ReconError::ParseError {
                connection: self.connection,
                message: "missing pspReference".to_string(),
            })?
            .to_string();

        let event_code = notification
            .get("eventCode")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let amount = notification.get("amount").cloned().unwrap_or(Value::Null);
        let amount_smallest_unit = amount.get("value").and_then(Value::as_i64).unwrap_or(0);
        let currency = amount
            .get("currency")
            .and_then(Value::as_str)
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_else(|| "EUR".to_string());
        let currency = CurrencyCode::new(&currency).map_err(|e| ReconError::ParseError {
            connection: self.connection,
            message: e.to_string(),
        })?;

        let created_at = notification
            .get("eventDate")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(ParsedEvent {
            psp_event_id: psp_event_id.clone(),
            canonical_event_type: Self::normalize_event_type(&event_code),
            psp_event_type: event_code,
            psp_txn_id: notification
                .get("merchantReference")
                .and_then(Value::as_str)
                .unwrap_or(&psp_event_id)
                .to_string(),
            psp_payment_id: notification
                .get("originalReference")
                .and_then(Value::as_str)
                .map(str::to_string),
            psp_settlement_id: None,
            amount_smallest_unit,
            currency,
            psp_fee: None,
            net: None,
            created_at,
            customer_id: None,
            metadata: notification.clone(),
            settlement_line_no: None,
        })
    }

    fn parse_csv(&self, bytes: &[u8]) -> ReconResult<Vec<ParsedEvent>> {
        super::csv::parse_settlement_csv(self.connection, bytes, |row, line_no| {
            let amount = super::csv::parse_cents(row.get("Amount"))?;
            let fee = super::csv::parse_cents(row.get("Commission")).unwrap_or(0);
            let net = super::csv::parse_cents(row.get("Net Amount")).unwrap_or(amount - fee);
            let currency = row
                .get("Currency")
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| "EUR".to_string());
            let currency = CurrencyCode::new(&currency).ok()?;

            Some(ParsedEvent {
                psp_event_id: row.get("Merchant Reference").cloned().unwrap_or_default(),
                psp_event_type: "SETTLEMENT".to_string(),
                canonical_event_type: EventType::Other("SETTLEMENT".to_string()),
                psp_txn_id: row.get("Merchant Reference").cloned().unwrap_or_default(),
                psp_payment_id: row.get("Payment Reference").cloned(),
                psp_settlement_id: row.get("Payment Reference").cloned(),
                amount_smallest_unit: amount,
                currency,
                psp_fee: Some(fee),
                net: Some(net),
                created_at: Utc::now(),
                customer_id: None,
                metadata: Value::Null,
                settlement_line_no: Some(line_no),
            })
        })
    }
}

impl Parser for AdyenParser {
    fn parse(&self, bytes: &[u8], format: EventFormat) -> ReconResult<Vec<ParsedEvent>> {
        match format {
            EventFormat::Json => self.parse_json(bytes),
            EventFormat::Csv => self.parse_csv(bytes),
            EventFormat::Xlsx => Err(ReconError::ParseError {
                connection: self.connection,
                message: "xlsx settlement files are not yet supported for Adyen".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_notification_envelope() {
        let parser = AdyenParser::new(ConnectionId::new());
        let payload = br#"{
            "notificationItems": [
                {"NotificationRequestItem": {
                    "pspReference": "psp_1",
                    "eventCode": "AUTHORISATION",
                    "amount": {"value": 1500, "currency": "EUR"},
                    "merchantReference": "order_1"
                }}
            ]
        }"#;
        let events = parser.parse(payload, EventFormat::Json).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].canonical_event_type, EventType::Deposit);
        assert_eq!(events[0].psp_txn_id, "order_1");
    }

    #[test]
    fn parses_single_notification() {
        let parser = AdyenParser::new(ConnectionId::new());
        let payload = br#"{
            "pspReference": "psp_2",
            "eventCode": "CHARGEBACK",
            "amount": {"value": 500, "currency": "EUR"}
        }"#;
        let events = parser.parse(payload, EventFormat::Json).unwrap();
        assert_eq!(events[0].canonical_event_type, EventType::Chargeback);
    }

    #[test]
    fn parses_settlement_csv() {
        let parser = AdyenParser::new(ConnectionId::new());
        let csv = b"Merchant Reference,Payment Reference,Amount,Currency,Commission,Net Amount\norder_1,pay_1,100.00,EUR,2.00,98.00\n";
        let events = parser.parse(csv, EventFormat::Csv).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].amount_smallest_unit, 10000);
    }
}
