use std::collections::HashMap;

use recon_ports::ParsedEvent;
use recon_types::{ConnectionId, ReconError, ReconResult};

/// Minimal CSV reader for the settlement exports PSPs hand out: a header
/// row plus unquoted comma-separated fields. Good enough for the fixed
/// column sets `StripeParser`/`AdyenParser` expect; anything quoted or
/// embedding commas is out of scope for this reader.
pub fn parse_settlement_csv(
    connection: ConnectionId,
    bytes: &[u8],
    mut row_to_event: impl FnMut(&HashMap<String, String>, u32) -> Option<ParsedEvent>,
) -> ReconResult<Vec<ParsedEvent>> {
    let text = std::str::from_utf8(bytes).map_err(|e| ReconError::ParseError {
        connection,
        message: format!("settlement csv is not valid utf-8: {e}"),
    })?;

    let mut lines = text.lines();
    let header: Vec<&str> = match lines.next() {
        Some(line) => line.split(',').map(str::trim).collect(),
        None => return Ok(Vec::new()),
    };

    let mut events = Vec::new();
    let mut line_no = 0u32;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        let row: HashMap<String, String> = header
            .iter()
            .zip(fields.iter())
            .map(|(k, v)| (k.to_string(), v.trim().to_string()))
            .collect();

        if let Some(event) = row_to_event(&row, line_no) {
            events.push(event);
        }
        line_no += 1;
    }
    Ok(events)
}

/// Parses a decimal-dollars column (`"100.00"`) into integer cents, the way
/// every settlement CSV column in this module is expressed.
pub fn parse_cents(field: Option<&String>) -> Option<i64> {
    let value: f64 = field?.parse().ok()?;
    Some((value * 100.0).round() as i64)
}
