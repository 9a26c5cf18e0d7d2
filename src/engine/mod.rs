//! Playback engine.
//!
//! Drives one audio handle at a time through its lifecycle and translates
//! backend events into a small signal set (`Started`, `Ended`, `Failed`).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  PlaybackEngine  │ ← create / play / stop, watchdog
//! └────────┬─────────┘
//!          │ ClipBackend
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │   RodioBackend   │────▶│   audio thread   │──▶ EngineSignal
//! ├──────────────────┤     └──────────────────┘
//! │ MockClipBackend  │──────────────────────────▶ EngineSignal
//! └──────────────────┘
//! ```
//!
//! `play` never fails to the caller: it resolves `true` once audible and
//! `false` when the platform refused to start, the asset could not be
//! loaded, or the start did not settle within the timeout. The timeout
//! runs from the moment `play` is entered and bounds the start and the
//! playback together.

mod error;
mod handle;
mod mock;
mod rodio_backend;
mod signal;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub use error::PlaybackError;
pub use handle::PlaybackHandle;
pub use mock::{MockClipBackend, MockStart};
pub use rodio_backend::{try_create_backend, RodioBackend};
pub use signal::{EndCause, EngineSignal, HandleId, SignalKind, SignalReceiver, SignalSender};

use crate::catalog::ClipDescriptor;

/// Result of asking a backend to start a clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Playback has audibly begun
    Started,
    /// The platform refused to start playback (no device, muted)
    Blocked(String),
    /// The asset could not be opened or decoded
    LoadFailed(String),
}

impl From<PlaybackError> for StartOutcome {
    fn from(err: PlaybackError) -> Self {
        if err.is_device_error() {
            StartOutcome::Blocked(err.to_string())
        } else {
            StartOutcome::LoadFailed(err.to_string())
        }
    }
}

/// Pending answer to a start request.
pub type StartTicket = oneshot::Receiver<StartOutcome>;

/// Trait for audio backends.
///
/// Backends own the actual voices. They report completion and late failures
/// through the signal sender handed to `start`.
pub trait ClipBackend: Send + Sync {
    /// Begins starting `clip` for `handle`. The ticket resolves once the
    /// backend knows whether the clip is audible.
    fn start(&self, handle: HandleId, clip: &ClipDescriptor, signals: &SignalSender) -> StartTicket;

    /// Stops the voice of `handle`. Must be a no-op for unknown handles.
    fn stop(&self, handle: HandleId);

    /// Returns true if the backend refuses to start playback.
    fn is_muted(&self) -> bool;

    /// Mutes or unmutes the backend.
    fn set_muted(&self, muted: bool);
}

/// Engine wrapping a backend with handle allocation and the watchdog.
#[derive(Clone)]
pub struct PlaybackEngine {
    backend: Arc<dyn ClipBackend>,
    signals: SignalSender,
    next_id: Arc<AtomicU64>,
    timeout: Duration,
}

impl PlaybackEngine {
    /// Hard limit for one clip unless configured otherwise.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates an engine and the receiver its signals arrive on.
    pub fn new(backend: Arc<dyn ClipBackend>, timeout: Duration) -> (Self, SignalReceiver) {
        let (signals, rx) = mpsc::unbounded_channel();
        let engine = Self {
            backend,
            signals,
            next_id: Arc::new(AtomicU64::new(1)),
            timeout,
        };
        (engine, rx)
    }

    /// Allocates a new handle bound to `clip`. Does not start playback.
    #[must_use]
    pub fn create(&self, clip: &ClipDescriptor) -> Arc<PlaybackHandle> {
        let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(handle = %id, key = %clip.key, "Created playback handle");
        Arc::new(PlaybackHandle::new(id, clip.clone()))
    }

    /// Attempts playback of `handle`.
    ///
    /// Resolves `true` once playback has audibly begun and arms the watchdog
    /// for the rest of the timeout. Resolves `false` if the handle was
    /// stopped meanwhile, if the platform blocked playback, if the asset
    /// failed to load, or if the backend did not answer before the timeout.
    pub async fn play(&self, handle: &PlaybackHandle) -> bool {
        if handle.is_stopped() {
            debug!(handle = %handle.id(), "Handle already stopped, not playing");
            return false;
        }

        let deadline = Instant::now() + self.timeout;
        let ticket = self.backend.start(handle.id(), handle.clip(), &self.signals);
        let outcome = match tokio::time::timeout_at(deadline, ticket).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                StartOutcome::Blocked("audio backend dropped the start request".to_string())
            }
            Err(_) => {
                warn!(
                    handle = %handle.id(),
                    key = %handle.key(),
                    timeout = ?self.timeout,
                    "Clip did not start in time, giving up"
                );
                self.stop(handle);
                return false;
            }
        };

        match outcome {
            StartOutcome::Started if handle.is_stopped() => {
                // Stopped while the start was in flight; the voice may exist now.
                self.backend.stop(handle.id());
                debug!(handle = %handle.id(), "Handle stopped while starting");
                false
            }
            StartOutcome::Started => {
                self.arm_watchdog(handle, deadline);
                let _ = self
                    .signals
                    .send(EngineSignal::started(handle.id(), handle.key()));
                info!(handle = %handle.id(), key = %handle.key(), "Clip started");
                true
            }
            StartOutcome::Blocked(reason) => {
                info!(handle = %handle.id(), key = %handle.key(), %reason, "Playback blocked");
                false
            }
            StartOutcome::LoadFailed(reason) => {
                warn!(
                    handle = %handle.id(),
                    key = %handle.key(),
                    locator = %handle.clip().locator.display(),
                    %reason,
                    "Clip asset failed to load"
                );
                false
            }
        }
    }

    /// Stops `handle`. Idempotent.
    pub fn stop(&self, handle: &PlaybackHandle) {
        handle.disarm_watchdog();
        if handle.mark_stopped() {
            self.backend.stop(handle.id());
            debug!(handle = %handle.id(), key = %handle.key(), "Stopped playback handle");
        }
    }

    /// Returns the watchdog timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn ClipBackend> {
        &self.backend
    }

    fn arm_watchdog(&self, handle: &PlaybackHandle, deadline: Instant) {
        let id = handle.id();
        let key = handle.key().to_string();
        let signals = self.signals.clone();
        let backend = Arc::clone(&self.backend);
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            warn!(handle = %id, key = %key, ?timeout, "Clip timed out, forcing completion");
            backend.stop(id);
            let _ = signals.send(EngineSignal::ended(id, key, EndCause::Timeout));
        });
        handle.arm_watchdog(task.abort_handle());
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("timeout", &self.timeout)
            .field("muted", &self.backend.is_muted())
            .finish_non_exhaustive()
    }
}
