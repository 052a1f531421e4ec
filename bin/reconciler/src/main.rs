//! Drives the reconciliation pipeline over a directory of webhook
//! deliveries: intake, normalize, match, and post to the ledger, using the
//! in-memory port implementations. There is no REST/auth surface here by
//! design — this binary is the pipeline runner the real service's HTTP
//! layer would call into, not a server itself.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hmac::{Hmac, Mac};
use recon_intake::InboundWebhook;
use recon_types::CurrencyCode;
use reconciler::pipeline::{Pipeline, PipelineConfig};
use sha2::Sha256;

#[derive(Parser)]
#[command(about = "Runs the PSP reconciliation pipeline over a directory of webhook payloads")]
struct Cli {
    /// Directory containing one file per inbound webhook delivery.
    #[arg(long)]
    webhook_dir: PathBuf,

    /// PSP connector name; selects the parser (stripe|adyen).
    #[arg(long, default_value = "stripe")]
    psp: String,

    /// Settlement currency transactions are normalized into.
    #[arg(long, default_value = "USD")]
    settlement_currency: String,

    /// Shared HMAC signing secret. Every delivery is signed against this
    /// (an empty secret is still a valid HMAC key) — there is no unsigned
    /// path, matching intake's requirement that a signature header always
    /// be present.
    #[arg(long, env = "RECON_SIGNING_SECRET")]
    signing_secret: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let settlement_currency = CurrencyCode::new(&cli.settlement_currency)?;
    let signing_secret = cli.signing_secret.clone().unwrap_or_default().into_bytes();

    let pipeline = Pipeline::new(PipelineConfig {
        psp_name: cli.psp,
        settlement_currency,
        signing_secret: signing_secret.clone(),
        idempotency_ttl: Duration::from_secs(24 * 60 * 60),
    });

    let mut accepted = 0;
    let mut duplicate = 0;
    let mut entries = std::fs::read_dir(&cli.webhook_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect::<Vec<_>>();
    entries.sort();

    for path in entries {
        let body = std::fs::read(&path)?;
        let signature = sign(&signing_secret, &body);
        let webhook = InboundWebhook {
            body: &body,
            signature_header: Some(&signature),
            idempotency_header: path.file_name().and_then(|n| n.to_str()),
            psp_event_id: None,
            psp_event_type: None,
            psp_timestamp: None,
        };

        match pipeline
            .intake
            .handle(
                pipeline.tenant_id,
                pipeline.connection_id,
                &pipeline.webhook_config,
                webhook,
            )
            .await?
        {
            recon_intake::IntakeOutcome::Accepted => accepted += 1,
            recon_intake::IntakeOutcome::Duplicate => duplicate += 1,
        }
    }

    let normalized = pipeline.drain_normalizer().await?;
    let (matched, posted) = pipeline.reconcile_and_post().await?;

    tracing::info!(
        accepted,
        duplicate,
        normalized,
        matched,
        posted,
        "reconciliation run complete"
    );
    Ok(())
}

/// Computes the HMAC-SHA256 signature over `body` with `secret`. An empty
/// secret is a valid (if weak) HMAC key, so this always produces a header
/// rather than leaving deliveries unsigned.
fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC-SHA256 accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
