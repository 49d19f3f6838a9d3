//! Sender run loop: connect once, send every configured file, disconnect.

use std::sync::Arc;

use hubdrop_session::SessionEstablisher;
use hubdrop_transfer::{TransferEngine, TransferOutcome, TransferRequest};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::spool::{SpoolFactory, SpoolProvisioner};

/// Runs one batch. Returns one outcome per file that could be opened.
pub async fn run(config: Config) -> anyhow::Result<Vec<TransferOutcome>> {
    let establisher = SessionEstablisher::new(
        Arc::new(SpoolProvisioner::new(config.spool.hub.clone())),
        Arc::new(SpoolFactory::new(config.spool.path.clone())),
    )
    .with_retry(config.retry.to_retry_config());

    let session = establisher.connect(&config.device, &config.endpoint).await?;

    let mut requests = Vec::with_capacity(config.files.len());
    for entry in &config.files {
        match TransferRequest::open(&entry.source, entry.destination.clone(), entry.compress).await
        {
            Ok(request) => requests.push(request),
            Err(e) => {
                error!(source = %entry.source.display(), error = %e, "cannot open file, skipping");
            }
        }
    }

    let engine = TransferEngine::with_limits(config.limits.to_limits());
    let outcomes = engine.send_batch(&session, requests).await;

    for outcome in &outcomes {
        if outcome.status.is_success() {
            info!(
                id = %outcome.session_id,
                parts = outcome.parts,
                size_kb = outcome.size_kb,
                "file sent"
            );
        } else {
            warn!(
                id = %outcome.session_id,
                message = %outcome.message,
                "file transfer failed"
            );
        }
    }

    if let Err(e) = session.disconnect().await {
        warn!(error = %e, "disconnect failed");
    }

    Ok(outcomes)
}
