use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{InstallHandle, Installer};

/// Deterministic test double for [`Installer`]: reports the configured
/// progress messages, then completes with a fixed outcome. Never touches
/// the filesystem or spawns a process.
#[derive(Debug, Clone)]
pub struct FakeInstaller {
    success: bool,
    progress_messages: Vec<String>,
    invoked: Arc<AtomicBool>,
}

impl FakeInstaller {
    #[must_use]
    pub fn new(success: bool) -> Self {
        Self {
            success,
            progress_messages: Vec::new(),
            invoked: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, messages: &[&str]) -> Self {
        self.progress_messages = messages.iter().map(|message| (*message).to_owned()).collect();
        self
    }

    pub fn was_invoked(&self) -> bool {
        self.invoked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Installer for FakeInstaller {
    async fn install(&self, handle: InstallHandle) {
        self.invoked.store(true, Ordering::SeqCst);
        for message in &self.progress_messages {
            handle.progress(message.clone());
        }
        handle.complete(self.success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio::sync::mpsc;

    use crate::installer::InstallerEvent;

    #[tokio::test]
    async fn reports_progress_then_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = InstallHandle::new(PathBuf::from("/tmp/bundle.bin"), "42".to_owned(), tx);
        let installer = FakeInstaller::new(true).with_progress(&["step one", "step two"]);

        installer.install(handle).await;

        assert!(installer.was_invoked());
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], InstallerEvent::Progress { message, .. } if message == "step one"));
        assert!(matches!(&events[1], InstallerEvent::Progress { message, .. } if message == "step two"));
        assert!(matches!(&events[2], InstallerEvent::Complete { success: true, .. }));
    }
}
