//! Installer bridge: marshals progress/completion events from an
//! installer's own task back onto the control task, so feedback POSTs are
//! always issued from one place instead of racing from the installer.

use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::http::{Execution, FinishedResult};
use crate::installer::InstallerEvent;

use super::SessionContext;
use super::intake::post_deployment_feedback;

/// Sending half of the installer event channel, cloned into every
/// [`InstallHandle`](crate::installer::InstallHandle) handed to an installer.
#[derive(Debug, Clone)]
pub struct InstallerBridge {
    sender: mpsc::UnboundedSender<InstallerEvent>,
}

impl InstallerBridge {
    /// Creates a bridge and its matching receiver. The receiver is owned by
    /// the poll loop, which drains it alongside the poll ticker.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<InstallerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    #[must_use]
    pub fn sender(&self) -> mpsc::UnboundedSender<InstallerEvent> {
        self.sender.clone()
    }
}

/// Dispatches one installer event onto the session context.
pub(super) async fn handle_event(ctx: &SessionContext, event: InstallerEvent) {
    match event {
        InstallerEvent::Progress { action_id, message } => on_progress(ctx, &action_id, &message).await,
        InstallerEvent::Complete { action_id, success } => on_complete(ctx, &action_id, success).await,
    }
}

async fn on_progress(ctx: &SessionContext, action_id: &str, message: &str) {
    if ctx.action.current().await.as_deref() != Some(action_id) {
        tracing::debug!(action_id, "dropping installer progress for a superseded action");
        return;
    }

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
        tracing::warn!(%err, action_id, "failed to post installer progress feedback");
    }
}

async fn on_complete(ctx: &SessionContext, action_id: &str, success: bool) {
    if ctx.action.current().await.as_deref() != Some(action_id) {
        // The live session (if any) belongs to a different action id; tearing
        // it down here would clear an unrelated, still-active session.
        tracing::debug!(action_id, "dropping installer completion for a superseded action");
        return;
    }

    let (detail, finished) = if success {
        ("Software bundle installed successful.", FinishedResult::Success)
    } else {
        let err = SessionError::InstallFailed;
        tracing::warn!(%err, action_id, "installer reported failure");
        ("Failed to install software bundle.", FinishedResult::Failure)
    };

    if let Err(err) = post_deployment_feedback(
        &ctx.transport,
        &ctx.config,
        action_id,
        Some(detail),
        finished,
        Execution::Closed,
        None,
    )
    .await
    {
        tracing::warn!(%err, action_id, "failed to post installer completion feedback");
    }

    super::teardown(&ctx.action, &ctx.config.bundle_path).await;

    if success && ctx.config.reboot_after_install {
        tracing::info!(action_id, "reboot after install requested; rebooting now");
        crate::system::reboot::sync_and_reboot();
    }
}
