use tracing::{info, warn};

use crate::shutdown::StopSignal;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Triggers `interrupt` on Ctrl+C or SIGTERM. Exits quietly once `finished`
/// fires.
pub fn setup_signal_shutdown_handler(
    interrupt: &StopSignal,
    finished: &StopSignal,
) -> tokio::task::JoinHandle<()> {
    let interrupt = interrupt.clone();
    let finished = finished.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                warn!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                () = finished.wait() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, stopping the test.");
                    interrupt.trigger();
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    info!("SIGTERM received, stopping the test.");
                    interrupt.trigger();
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = finished.wait() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, stopping the test.");
                    interrupt.trigger();
                }
            }
        }
    })
}
