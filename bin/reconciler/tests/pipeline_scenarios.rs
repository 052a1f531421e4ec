//! End-to-end coverage for the full intake → normalize → match → ledger
//! run, driven through `Pipeline` the same way the binary drives it.

use std::time::Duration;

use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use recon_ports::CanonicalStore;
use recon_types::{
    CurrencyCode, ExceptionPriority, ExceptionType, Money, ReconStatus, Settlement, SettlementId,
};
use reconciler::pipeline::{Pipeline, PipelineConfig};
use sha2::Sha256;

const SIGNING_SECRET: &[u8] = b"";

fn new_pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig {
        psp_name: "stripe".to_string(),
        settlement_currency: CurrencyCode::new("USD").unwrap(),
        signing_secret: SIGNING_SECRET.to_vec(),
        idempotency_ttl: Duration::from_secs(3600),
    })
}

/// Intake requires a signature header on every delivery; sign with the same
/// (empty) secret the pipeline under test is configured with.
fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SIGNING_SECRET).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

fn stripe_deposit_webhook(event_id: &str, payment_intent: &str, balance_transaction: &str) -> Vec<u8> {
    format!(
        r#"{{"id":"{event_id}","type":"payment_intent.succeeded","created":1705276800,
            "data":{{"object":{{"id":"{payment_intent}","amount":100000,"currency":"usd","balance_transaction":"{balance_transaction}"}}}}}}"#
    )
    .into_bytes()
}

#[tokio::test]
async fn level1_strong_id_match_posts_a_balanced_ledger() {
    let pipeline = new_pipeline();

    let settlement = Settlement {
        id: SettlementId::new(),
        tenant_id: pipeline.tenant_id,
        connection_id: pipeline.connection_id,
        settlement_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        batch_id: "2024-01-15".to_string(),
        line_no: 0,
        amount: Money::new(97_100, CurrencyCode::new("USD").unwrap()),
        psp_settlement_id: Some("set_A".to_string()),
        psp_txn_id_list: vec!["pi_1".to_string()],
        fee: None,
        net: None,
    };
    pipeline.store.insert_settlement_if_absent(settlement).await.unwrap();

    let body = stripe_deposit_webhook("evt_1", "pi_1", "set_A");
    let signature = sign(&body);
    let webhook = recon_intake::InboundWebhook {
        body: &body,
        signature_header: Some(&signature),
        idempotency_header: Some("evt_1"),
        psp_event_id: Some("evt_1"),
        psp_event_type: Some("payment_intent.succeeded"),
        psp_timestamp: None,
    };
    let outcome = pipeline
        .intake
        .handle(pipeline.tenant_id, pipeline.connection_id, &pipeline.webhook_config, webhook)
        .await
        .unwrap();
    assert_eq!(outcome, recon_intake::IntakeOutcome::Accepted);

    let produced = pipeline.drain_normalizer().await.unwrap();
    assert_eq!(produced, 1);

    let (matched, posted) = pipeline.reconcile_and_post().await.unwrap();
    assert_eq!(matched, 1);
    assert_eq!(posted, 1);
}

#[tokio::test]
async fn idempotent_replay_yields_one_transaction_one_match_one_ledger_group() {
    let pipeline = new_pipeline();

    let settlement = Settlement {
        id: SettlementId::new(),
        tenant_id: pipeline.tenant_id,
        connection_id: pipeline.connection_id,
        settlement_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        batch_id: "2024-01-15".to_string(),
        line_no: 0,
        amount: Money::new(97_100, CurrencyCode::new("USD").unwrap()),
        psp_settlement_id: Some("set_A".to_string()),
        psp_txn_id_list: vec!["pi_1".to_string()],
        fee: None,
        net: None,
    };
    pipeline.store.insert_settlement_if_absent(settlement).await.unwrap();

    let body = stripe_deposit_webhook("evt_1", "pi_1", "set_A");
    let signature = sign(&body);
    let webhook = || recon_intake::InboundWebhook {
        body: &body,
        signature_header: Some(&signature),
        idempotency_header: Some("evt_1"),
        psp_event_id: Some("evt_1"),
        psp_event_type: Some("payment_intent.succeeded"),
        psp_timestamp: None,
    };

    let first = pipeline
        .intake
        .handle(pipeline.tenant_id, pipeline.connection_id, &pipeline.webhook_config, webhook())
        .await
        .unwrap();
    assert_eq!(first, recon_intake::IntakeOutcome::Accepted);

    // Resubmit the identical delivery three more times, as a PSP's retry
    // policy would after a dropped ack.
    for _ in 0..3 {
        let replay = pipeline
            .intake
            .handle(pipeline.tenant_id, pipeline.connection_id, &pipeline.webhook_config, webhook())
            .await
            .unwrap();
        assert_eq!(replay, recon_intake::IntakeOutcome::Duplicate);
    }

    let produced = pipeline.drain_normalizer().await.unwrap();
    assert_eq!(produced, 1, "replays must not re-enter the bus as new raw records");

    // Draining again confirms nothing is left queued from the duplicates.
    assert_eq!(pipeline.drain_normalizer().await.unwrap(), 0);

    let (matched, posted) = pipeline.reconcile_and_post().await.unwrap();
    assert_eq!(matched, 1);
    assert_eq!(posted, 1);

    // Reconciling again must not double-match or double-post: the
    // transaction is no longer in the unreconciled pool.
    let (matched_again, posted_again) = pipeline.reconcile_and_post().await.unwrap();
    assert_eq!(matched_again, 0);
    assert_eq!(posted_again, 0);
}

#[tokio::test]
async fn transaction_with_no_settlement_candidate_raises_a_priority_exception() {
    let pipeline = new_pipeline();

    let body = stripe_deposit_webhook("evt_2", "pi_2", "");
    let signature = sign(&body);
    let webhook = recon_intake::InboundWebhook {
        body: &body,
        signature_header: Some(&signature),
        idempotency_header: Some("evt_2"),
        psp_event_id: Some("evt_2"),
        psp_event_type: Some("payment_intent.succeeded"),
        psp_timestamp: None,
    };
    pipeline
        .intake
        .handle(pipeline.tenant_id, pipeline.connection_id, &pipeline.webhook_config, webhook)
        .await
        .unwrap();
    pipeline.drain_normalizer().await.unwrap();

    let pending = pipeline
        .store
        .unreconciled_transactions(pipeline.tenant_id, pipeline.connection_id)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    let outcome = pipeline.matching.match_transaction(pending[0].id).await.unwrap();
    assert_eq!(outcome.recon_status, ReconStatus::Unmatched);
    let exception = outcome.exception.expect("no candidates must raise an exception");
    assert_eq!(exception.exception_type, ExceptionType::Unmatched);
    // amount=100_000 sits right at the P2 threshold.
    assert_eq!(exception.priority, ExceptionPriority::from_amount(100_000));
    assert_eq!(exception.priority, ExceptionPriority::P2);
}
