//! The poll loop: ticks once a second, running a base poll whenever
//! the configured interval has elapsed, while concurrently draining
//! installer events and watching for shutdown.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;

use crate::installer::InstallerEvent;
use crate::system;

use super::SessionContext;
use super::bridge::handle_event;
use super::intake::base_poll;

/// How `run_poll_loop` ended. Only meaningful in `--run-once` mode, where
/// it becomes the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollLoopOutcome {
    Success,
    Failure,
}

/// `service::WATCHDOG_SEC / 3`: systemd recommends pinging at least twice
/// per `WatchdogSec`; this leaves margin for a slow tick.
const WATCHDOG_PING_SEC: u64 = 20;

/// Drives the poll loop until shutdown, or — in `--run-once` mode — until
/// the first tick completes.
pub async fn run_poll_loop(
    ctx: SessionContext,
    mut events_rx: mpsc::UnboundedReceiver<InstallerEvent>,
    mut shutdown_rx: broadcast::Receiver<u16>,
) -> PollLoopOutcome {
    let mut interval_sec = ctx.config.retry_wait_sec.max(1);
    let mut elapsed_sec: u64 = interval_sec;
    let mut watchdog_elapsed_sec: u64 = 0;

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                watchdog_elapsed_sec = watchdog_elapsed_sec.saturating_add(1);
                if watchdog_elapsed_sec >= WATCHDOG_PING_SEC {
                    watchdog_elapsed_sec = 0;
                    system::notify::notify_watchdog(ctx.config.systemd_notify);
                }

                elapsed_sec = elapsed_sec.saturating_add(1);
                if elapsed_sec < interval_sec {
                    continue;
                }
                elapsed_sec = 0;

                match base_poll(&ctx).await {
                    Ok(next_interval) => {
                        interval_sec = next_interval.as_secs().max(1);
                        if ctx.config.run_once {
                            return PollLoopOutcome::Success;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%err, "base poll tick failed");
                        interval_sec = ctx.config.retry_wait_sec.max(1);
                        if ctx.config.run_once {
                            return PollLoopOutcome::Failure;
                        }
                    }
                }
            }
            Some(event) = events_rx.recv() => {
                handle_event(&ctx, event).await;
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("shutdown signal received; stopping poll loop");
                return PollLoopOutcome::Success;
            }
        }
    }
}
