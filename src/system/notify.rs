//! Optional systemd `sd_notify` readiness/watchdog integration.
//!
//! A no-op unless the process is actually supervised by systemd
//! (`NOTIFY_SOCKET` set in the environment) and `--systemd-notify` was
//! passed. Neither notification is allowed to fail the caller: a missing
//! socket or a send error is logged and swallowed, since readiness
//! notification is an optimization for the supervisor, not a correctness
//! requirement of the agent itself.

pub fn notify_ready(enabled: bool) {
    if !enabled {
        return;
    }
    if let Err(err) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
        tracing::debug!(%err, "sd_notify READY=1 failed (not running under systemd?)");
    }
}

pub fn notify_stopping(enabled: bool) {
    if !enabled {
        return;
    }
    if let Err(err) = sd_notify::notify(false, &[sd_notify::NotifyState::Stopping]) {
        tracing::debug!(%err, "sd_notify STOPPING=1 failed (not running under systemd?)");
    }
}

pub fn notify_watchdog(enabled: bool) {
    if !enabled {
        return;
    }
    if let Err(err) = sd_notify::notify(false, &[sd_notify::NotifyState::Watchdog]) {
        tracing::debug!(%err, "sd_notify WATCHDOG=1 failed");
    }
}
