//! Thin facade over the `metrics` crate's global recorder: every stage
//! records through one of these functions instead of calling
//! `metrics::counter!`/`histogram!` directly, so the metric names and
//! label sets live in one place.

use recon_types::{ExceptionPriority, ExceptionType, MatchLevel};

pub fn webhook_accepted(connection: &str) {
    metrics::counter!("recon_webhook_accepted_total", "connection" => connection.to_string())
        .increment(1);
}

pub fn webhook_duplicate(connection: &str) {
    metrics::counter!("recon_webhook_duplicate_total", "connection" => connection.to_string())
        .increment(1);
}

pub fn webhook_rejected(connection: &str, reason: &'static str) {
    metrics::counter!(
        "recon_webhook_rejected_total",
        "connection" => connection.to_string(),
        "reason" => reason,
    )
    .increment(1);
}

pub fn event_normalized(connection: &str) {
    metrics::counter!("recon_events_normalized_total", "connection" => connection.to_string())
        .increment(1);
}

pub fn parse_error(connection: &str) {
    metrics::counter!("recon_parse_errors_total", "connection" => connection.to_string())
        .increment(1);
}

pub fn match_hit(level: MatchLevel, confidence: u8) {
    metrics::counter!(
        "recon_matches_total",
        "level" => level.as_u8().to_string(),
    )
    .increment(1);
    metrics::histogram!("recon_match_confidence").record(confidence as f64);
}

pub fn match_unmatched() {
    metrics::counter!("recon_matches_unmatched_total").increment(1);
}

pub fn exception_raised(exception_type: ExceptionType, priority: ExceptionPriority) {
    metrics::counter!(
        "recon_exceptions_total",
        "type" => exception_type.to_string(),
        "priority" => priority.to_string(),
    )
    .increment(1);
}

pub fn ledger_posted(currency: &str, entry_count: usize) {
    metrics::counter!("recon_ledger_posted_total", "currency" => currency.to_string())
        .increment(1);
    metrics::histogram!("recon_ledger_entries_per_posting").record(entry_count as f64);
}

pub fn ledger_unbalanced(currency: &str) {
    metrics::counter!("recon_ledger_unbalanced_total", "currency" => currency.to_string())
        .increment(1);
}

pub fn pipeline_stage_duration(stage: &'static str, seconds: f64) {
    metrics::histogram!("recon_stage_duration_seconds", "stage" => stage).record(seconds);
}
