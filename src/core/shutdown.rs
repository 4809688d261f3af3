//! Signal-driven Shutdown Coordination
//!
//! Turns termination signals into escalating requests on a
//! [`CancellationFlag`]: the first asks the scan to drain, the second makes
//! workers stop between files, the third exits immediately with status 130.

use crate::scanner::cancel::CancellationFlag;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Exit status used when the process is interrupted
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// What a shutdown request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// No new batches; in-flight batches finish
    Drain,
    /// Workers stop after their current file
    Abort,
    /// Leave now
    Exit,
}

/// Coordinates graceful shutdown across the application
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<Escalation>,
    cancel: CancellationFlag,
    requests: Arc<AtomicUsize>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> (Self, broadcast::Receiver<Escalation>) {
        // Use a larger channel to avoid dropping bursts of shutdown signals
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);

        let coordinator = Self {
            shutdown_tx,
            cancel: CancellationFlag::new(),
            requests: Arc::new(AtomicUsize::new(0)),
        };

        (coordinator, shutdown_rx)
    }

    /// Flag handed to the scan engine
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Escalate one step and notify subscribers
    pub fn trigger_shutdown(&self) -> Escalation {
        escalate(&self.requests, &self.cancel, &self.shutdown_tx)
    }

    /// Route SIGINT, SIGTERM, SIGHUP and SIGQUIT (or Ctrl-C) into [`trigger_shutdown`](Self::trigger_shutdown)
    ///
    /// Must be called from within a tokio runtime.
    pub fn install_signal_handlers(&self) {
        setup_signal_handlers(
            self.shutdown_tx.clone(),
            self.cancel.clone(),
            self.requests.clone(),
        );
    }
}

fn escalate(
    requests: &AtomicUsize,
    cancel: &CancellationFlag,
    tx: &broadcast::Sender<Escalation>,
) -> Escalation {
    let escalation = match requests.fetch_add(1, Ordering::AcqRel) {
        0 => {
            cancel.cancel();
            Escalation::Drain
        }
        1 => {
            cancel.abort();
            Escalation::Abort
        }
        _ => Escalation::Exit,
    };
    let _ = tx.send(escalation);
    escalation
}

fn on_signal(
    requests: &AtomicUsize,
    cancel: &CancellationFlag,
    tx: &broadcast::Sender<Escalation>,
) {
    if escalate(requests, cancel, tx) == Escalation::Exit {
        log::warn!("Interrupted again; exiting");
        crate::core::logging::flush_logging();
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(
    shutdown_tx: broadcast::Sender<Escalation>,
    cancel: CancellationFlag,
    requests: Arc<AtomicUsize>,
) {
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        use tokio::signal::unix::{signal, SignalKind};
        let signals = [
            SignalKind::interrupt(),
            SignalKind::terminate(),
            SignalKind::hangup(),
            SignalKind::quit(),
        ];

        for kind in signals {
            let tx = shutdown_tx.clone();
            let cancel = cancel.clone();
            let requests = requests.clone();

            tokio::spawn(async move {
                match signal(kind) {
                    Ok(mut sig) => {
                        while sig.recv().await.is_some() {
                            on_signal(&requests, &cancel, &tx);
                        }
                    }
                    Err(e) => log::debug!("Cannot install handler for {:?}: {}", kind, e),
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                on_signal(&requests, &cancel, &shutdown_tx);
            }
        });
    }
}
