//! The update session state machine and its concurrency harness: the
//! poller, deployment intake, download worker, and installer
//! bridge that together drive one download-verify-install-report
//! lifecycle, tied together by the single-session action-id invariant.

mod action;
mod bridge;
mod download;
mod intake;
mod poller;

pub use action::ActionCell;
pub use bridge::InstallerBridge;
pub use intake::{Artifact, base_poll};
pub use poller::{PollLoopOutcome, run_poll_loop};

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::AgentConfig;
use crate::http::Transport;
use crate::installer::Installer;

/// Everything the poller, intake, download worker, and installer bridge
/// share for the process lifetime: the transport, the resolved
/// config, the single-session action-id cell, the installer capability, and
/// the bridge's sending half. Cheap to clone — every field is itself
/// reference-counted or immutable.
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<AgentConfig>,
    pub transport: Transport,
    pub action: ActionCell,
    pub installer: Arc<dyn Installer>,
    pub bridge: InstallerBridge,
    last_worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionContext {
    #[must_use]
    pub fn new(
        config: Arc<AgentConfig>,
        transport: Transport,
        installer: Arc<dyn Installer>,
        bridge: InstallerBridge,
    ) -> Self {
        Self {
            config,
            transport,
            action: ActionCell::new(),
            installer,
            bridge,
            last_worker: Arc::new(Mutex::new(None)),
        }
    }
}

/// Removes a stale bundle file left over from a crashed previous run,
/// before the poller starts. A missing file
/// is the common case and is not logged; any other I/O failure is logged
/// and otherwise ignored, since a stale file that cannot be removed will
/// simply be caught by the next free-space check.
pub fn cleanup_stale_bundle(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed stale bundle file from a previous run");
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(%err, path = %path.display(), "failed to remove stale bundle file");
        }
    }
}

/// Session teardown: clears the action id and removes the
/// downloaded file. Invoked from the download worker's failure paths and
/// from the installer bridge's completion handler; idempotent either way.
pub(crate) async fn teardown(action: &ActionCell, bundle_path: &Path) {
    action.clear().await;
    match tokio::fs::remove_file(bundle_path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(%err, path = %bundle_path.display(), "failed to remove bundle file during teardown");
        }
    }
}
