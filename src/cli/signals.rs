//! Interrupt handling for uploads
//!
//! One background task listens for Ctrl-C (and SIGTERM on Unix) for the rest
//! of the run. The first signal is latched in a watch channel, so a signal
//! that arrives between two uploads is still seen by the next wait.

use std::future::Future;

use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

/// Latched interrupt flag shared by every wait in a command
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    /// Starts listening for Ctrl-C and, on Unix, SIGTERM
    ///
    /// Once this is called the default Ctrl-C behaviour no longer applies,
    /// so call it only after interactive prompts are done.
    pub fn listen() -> Self {
        Self::from_signal(wait_for_signal())
    }

    /// Latches the outcome of `signal`
    ///
    /// `signal` resolving to `false` means no interrupt will ever arrive.
    pub fn from_signal<F>(signal: F) -> Self
    where
        F: Future<Output = bool> + Send + 'static,
    {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            if signal.await {
                let _ = tx.send(true);
            }
        });
        Self { rx }
    }

    /// Whether an interrupt has been received
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once an interrupt has been received
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|flag| *flag).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Runs `future` unless an interrupt comes first; `None` if interrupted
    pub async fn guard<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.triggered() => None,
            output = future => Some(output),
        }
    }
}

async fn wait_for_signal() -> bool {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C signal received");
                true
            }
            Err(e) => {
                warn!("Cannot listen for Ctrl+C: {}", e);
                false
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                let received = stream.recv().await.is_some();
                if received {
                    info!("SIGTERM signal received");
                }
                received
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                false
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<bool>();

    tokio::select! {
        true = ctrl_c => true,
        true = terminate => true,
        else => false,
    }
}
