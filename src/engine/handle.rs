//! Playback handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::task::AbortHandle;

use super::signal::HandleId;
use crate::catalog::ClipDescriptor;

/// One playable instance of a clip.
///
/// A handle is created idle, started at most once, and stopped at most once.
/// The lanes of the orchestrator hold handles behind `Arc`.
#[derive(Debug)]
pub struct PlaybackHandle {
    id: HandleId,
    clip: ClipDescriptor,
    stopped: AtomicBool,
    watchdog: Mutex<Option<AbortHandle>>,
}

impl PlaybackHandle {
    pub(crate) fn new(id: HandleId, clip: ClipDescriptor) -> Self {
        Self {
            id,
            clip,
            stopped: AtomicBool::new(false),
            watchdog: Mutex::new(None),
        }
    }

    /// Returns the handle id.
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Returns the clip this handle plays.
    #[must_use]
    pub fn clip(&self) -> &ClipDescriptor {
        &self.clip
    }

    /// Returns the clip key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.clip.key
    }

    /// Returns true once the handle has been stopped or released.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Marks the handle stopped. Returns true if this call did the transition.
    pub(crate) fn mark_stopped(&self) -> bool {
        !self.stopped.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn arm_watchdog(&self, abort: AbortHandle) {
        let previous = self
            .watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(abort);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub(crate) fn disarm_watchdog(&self) {
        if let Some(abort) = self
            .watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            abort.abort();
        }
    }

    /// Returns true while a watchdog is armed for this handle.
    #[must_use]
    pub fn has_watchdog(&self) -> bool {
        self.watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
