//! Event loop that feeds engine signals and scheduled drains into the
//! orchestrator.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{Orchestrator, Wake};
use crate::engine::SignalReceiver;

/// Drives an [`Orchestrator`].
///
/// Either spawn [`run`](Self::run) on the runtime, or call
/// [`turn`](Self::turn) to process everything that is ready right now.
pub struct OrchestratorDriver {
    orchestrator: Orchestrator,
    signals: SignalReceiver,
    wake: mpsc::UnboundedReceiver<Wake>,
}

impl OrchestratorDriver {
    pub(crate) fn new(
        orchestrator: Orchestrator,
        signals: SignalReceiver,
        wake: mpsc::UnboundedReceiver<Wake>,
    ) -> Self {
        Self {
            orchestrator,
            signals,
            wake,
        }
    }

    /// Processes signals and drains until the task is aborted.
    pub async fn run(mut self) {
        debug!("Orchestrator driver started");
        loop {
            tokio::select! {
                Some(signal) = self.signals.recv() => {
                    self.orchestrator.handle_signal(signal).await;
                }
                Some(wake) = self.wake.recv() => {
                    self.orchestrator.handle_wake(wake).await;
                }
                else => break,
            }
        }
        debug!("Orchestrator driver stopped");
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Processes every message that is ready without waiting for more.
    ///
    /// Signals are handled before scheduled drains. Returns the number of
    /// messages processed.
    pub async fn turn(&mut self) -> usize {
        let mut processed = 0;
        loop {
            if let Ok(signal) = self.signals.try_recv() {
                self.orchestrator.handle_signal(signal).await;
            } else if let Ok(wake) = self.wake.try_recv() {
                self.orchestrator.handle_wake(wake).await;
            } else {
                return processed;
            }
            processed += 1;
        }
    }
}

impl std::fmt::Debug for OrchestratorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorDriver").finish_non_exhaustive()
    }
}
