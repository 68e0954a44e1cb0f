//! Download worker: downloads the artifact, verifies its checksum,
//! and hands the verified bundle off to the installer. The worker task
//! exits as soon as the handoff is made, leaving the session open until the
//! installer reports back through the [`InstallerBridge`](super::InstallerBridge).

use crate::error::SessionError;
use crate::http::{Execution, FinishedResult};
use crate::installer::InstallHandle;

use super::SessionContext;
use super::intake::{Artifact, post_deployment_feedback};

pub(super) async fn run(ctx: &SessionContext, action_id: String, artifact: Artifact) {
    tracing::info!(
        action_id,
        name = %artifact.name,
        version = %artifact.version,
        "starting download"
    );

    let outcome = match ctx
        .transport
        .download(&artifact.download_url, &ctx.config.bundle_path, artifact.size)
        .await
    {
        Ok(outcome) => outcome,
        Err(source) => {
            let err = SessionError::DownloadFailed { source };
            tracing::warn!(%err, action_id, "artifact download failed");
            report_failure(ctx, &action_id, &err.to_string()).await;
            super::teardown(&ctx.action, &ctx.config.bundle_path).await;
            return;
        }
    };

    let speed_mb_s = outcome.bytes_per_second / (1024.0 * 1024.0);
    report_progress(
        ctx,
        &action_id,
        &format!("Download complete. {speed_mb_s:.2} MB/s"),
    )
    .await;

    if !outcome.sha1_hex.eq_ignore_ascii_case(&artifact.sha1) {
        let err = SessionError::ChecksumMismatch {
            expected: artifact.sha1.clone(),
            computed: outcome.sha1_hex.clone(),
        };
        tracing::warn!(%err, action_id, "checksum mismatch");
        report_failure(ctx, &action_id, &err.to_string()).await;
        super::teardown(&ctx.action, &ctx.config.bundle_path).await;
        return;
    }

    report_progress(ctx, &action_id, "File checksum OK.").await;

    let handle = InstallHandle::new(
        ctx.config.bundle_path.clone(),
        action_id.clone(),
        ctx.bridge.sender(),
    );
    let installer = ctx.installer.clone();
    tokio::spawn(async move {
        installer.install(handle).await;
    });

    tracing::debug!(action_id, "download worker handed off to installer and is exiting");
}

async fn report_progress(ctx: &SessionContext, action_id: &str, message: &str) {
    if let Err(err) = post_deployment_feedback(
        &ctx.transport,
        &ctx.config,
        action_id,
        Some(message),
        FinishedResult::None,
        Execution::Proceeding,
        None,
    )
    .await
    {
        tracing::warn!(%err, action_id, "failed to post download progress feedback");
    }
}

async fn report_failure(ctx: &SessionContext, action_id: &str, detail: &str) {
    if let Err(err) = post_deployment_feedback(
        &ctx.transport,
        &ctx.config,
        action_id,
        Some(detail),
        FinishedResult::Failure,
        Execution::Closed,
        None,
    )
    .await
    {
        tracing::warn!(%err, action_id, "failed to post download failure feedback");
    }
}
