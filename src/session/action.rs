use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::SessionError;

/// Process-wide handle on the single live update session. At most
/// one action ID is ever committed at a time; the deployment-intake code
/// commits it before spawning the download worker, and session teardown is
/// the only path that clears it.
#[derive(Debug, Clone)]
pub struct ActionCell(Arc<Mutex<Option<String>>>);

impl ActionCell {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    /// Commits `id` as the live session's action ID.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyInProgress` if a session is already
    /// open; the caller must not spawn a worker in that case.
    pub async fn try_begin(&self, id: String) -> Result<(), SessionError> {
        let mut guard = self.0.lock().await;
        if guard.is_some() {
            return Err(SessionError::AlreadyInProgress);
        }
        *guard = Some(id);
        Ok(())
    }

    #[must_use]
    pub async fn current(&self) -> Option<String> {
        self.0.lock().await.clone()
    }

    pub async fn is_active(&self) -> bool {
        self.0.lock().await.is_some()
    }

    /// Clears the live session, if any. Idempotent.
    pub async fn clear(&self) {
        self.0.lock().await.take();
    }
}

impl Default for ActionCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_begin_is_rejected_while_active() {
        let action = ActionCell::new();
        action.try_begin("42".to_owned()).await.expect("first begin succeeds");
        let err = action
            .try_begin("43".to_owned())
            .await
            .expect_err("second begin must fail");
        assert!(matches!(err, SessionError::AlreadyInProgress));
        assert_eq!(action.current().await, Some("42".to_owned()));
    }

    #[tokio::test]
    async fn clear_then_begin_succeeds() {
        let action = ActionCell::new();
        action.try_begin("42".to_owned()).await.expect("begin succeeds");
        action.clear().await;
        assert!(!action.is_active().await);
        action.try_begin("43".to_owned()).await.expect("begin after clear succeeds");
        assert_eq!(action.current().await, Some("43".to_owned()));
    }
}
