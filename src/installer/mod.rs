//! Pluggable installer capability.
//!
//! The actual bundle installer is an external collaborator: the download
//! worker (`session::download`) invokes [`Installer::install`] once an
//! artifact has passed its checksum check, and the installer reports
//! progress/completion back onto the control task through an
//! [`InstallHandle`] rather than running feedback POSTs itself.

mod command;
#[cfg(any(test, feature = "testing"))]
mod test_support;

pub use command::CommandInstaller;
#[cfg(any(test, feature = "testing"))]
pub use test_support::FakeInstaller;

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Event an installer sends back onto the control task. Carries its
/// own action id so a completion arriving after a session has already been
/// torn down (or superseded) can be recognized and dropped.
#[derive(Debug, Clone)]
pub enum InstallerEvent {
    Progress { action_id: String, message: String },
    Complete { action_id: String, success: bool },
}

/// Handle given to [`Installer::install`]: the bundle path plus a
/// progress/completion callback. Calls are safe from the installer's own
/// thread/task — they're marshaled onto the control task via an `mpsc`
/// channel instead of running a feedback POST directly.
#[derive(Debug, Clone)]
pub struct InstallHandle {
    pub bundle_path: PathBuf,
    action_id: String,
    events: mpsc::UnboundedSender<InstallerEvent>,
}

impl InstallHandle {
    #[must_use]
    pub fn new(
        bundle_path: PathBuf,
        action_id: String,
        events: mpsc::UnboundedSender<InstallerEvent>,
    ) -> Self {
        Self {
            bundle_path,
            action_id,
            events,
        }
    }

    /// Reports installer progress. A no-op if the control task's receiver
    /// has already gone away (e.g. the process is shutting down).
    pub fn progress(&self, message: impl Into<String>) {
        drop(self.events.send(InstallerEvent::Progress {
            action_id: self.action_id.clone(),
            message: message.into(),
        }));
    }

    /// Reports terminal installer completion.
    pub fn complete(&self, success: bool) {
        drop(self.events.send(InstallerEvent::Complete {
            action_id: self.action_id.clone(),
            success,
        }));
    }
}

/// An external bundle installer. The crate ships one concrete
/// implementation ([`CommandInstaller`]); tests use [`FakeInstaller`].
#[async_trait]
pub trait Installer: Send + Sync {
    /// Installs the bundle at `handle.bundle_path`. Expected to return
    /// promptly — a long-running install should hand off to its own task
    /// or child process and report back through `handle` asynchronously.
    async fn install(&self, handle: InstallHandle);
}
