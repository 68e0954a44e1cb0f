use tokio::sync::broadcast;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Installs Ctrl-C/SIGTERM handling and returns a task that resolves once a
/// shutdown signal has been observed. The poller's main loop selects on the
/// returned handle's broadcast receiver alongside its 1-second tick so that
/// it stops scheduling new polls without aborting an in-flight download
/// worker.
pub fn setup_signal_shutdown_handler(
    shutdown_tx: &broadcast::Sender<u16>,
) -> tokio::task::JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_tx.subscribe();

        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                eprintln!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                _ = shutdown_rx.recv() => {}
                _ = tokio::signal::ctrl_c() => {
                    drop(shutdown_tx.send(1));
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    drop(shutdown_tx.send(1));
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = shutdown_rx.recv() => {}
                _ = tokio::signal::ctrl_c() => {
                    drop(shutdown_tx.send(1));
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::time::Duration;

    fn run_async_test<F>(future: F) -> Result<(), String>
    where
        F: Future<Output = Result<(), String>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| format!("Failed to build runtime: {}", err))?;
        runtime.block_on(future)
    }

    #[test]
    fn signal_handler_exits_on_shutdown() -> Result<(), String> {
        run_async_test(async {
            let (shutdown_tx, _) = broadcast::channel::<u16>(1);
            let handle = setup_signal_shutdown_handler(&shutdown_tx);

            tokio::time::sleep(Duration::from_millis(10)).await;
            if shutdown_tx.send(1).is_err() {
                return Err("Failed to send shutdown".to_owned());
            }

            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .map_err(|err| format!("Timed out waiting for shutdown handler: {}", err))?
                .map_err(|err| format!("Shutdown task join error: {}", err))?;
            Ok(())
        })
    }
}
