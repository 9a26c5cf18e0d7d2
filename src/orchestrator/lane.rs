//! Playback lanes.
//!
//! Each lane is a small state machine:
//!
//! ```text
//! Idle ──begin──▶ Starting ──confirm──▶ Playing
//!   ▲                │                     │
//!   └────release─────┴───────release───────┘
//! ```
//!
//! Every transition that reacts to an asynchronous result names the handle
//! it is about; a transition for a handle that is no longer active is a
//! no-op.

use std::sync::Arc;

use super::queue::QueueEntry;
use crate::engine::{HandleId, PlaybackHandle};
use crate::types::{LaneKind, LanePhase};

/// Where the active clip came from.
#[derive(Debug, Clone)]
pub(crate) enum Origin {
    /// Direct request from a caller
    Immediate,
    /// Dequeued entry, kept for the retry policy
    Queued(QueueEntry),
}

/// The clip occupying a lane.
#[derive(Debug)]
pub(crate) struct ActiveClip {
    pub handle: Arc<PlaybackHandle>,
    pub ledger_key: String,
    pub origin: Origin,
    playing: bool,
}

impl ActiveClip {
    pub fn new(handle: Arc<PlaybackHandle>, ledger_key: impl Into<String>, origin: Origin) -> Self {
        Self {
            handle,
            ledger_key: ledger_key.into(),
            origin,
            playing: false,
        }
    }

    pub fn id(&self) -> HandleId {
        self.handle.id()
    }
}

/// One lane of the orchestrator.
#[derive(Debug)]
pub(crate) struct Lane {
    kind: LaneKind,
    active: Option<ActiveClip>,
}

impl Lane {
    pub fn new(kind: LaneKind) -> Self {
        Self { kind, active: None }
    }

    pub fn kind(&self) -> LaneKind {
        self.kind
    }

    pub fn phase(&self) -> LanePhase {
        match &self.active {
            None => LanePhase::Idle,
            Some(clip) if clip.playing => LanePhase::Playing,
            Some(_) => LanePhase::Starting,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn clip_key(&self) -> Option<&str> {
        self.active.as_ref().map(|clip| clip.handle.key())
    }

    pub fn ledger_key(&self) -> Option<&str> {
        self.active.as_ref().map(|clip| clip.ledger_key.as_str())
    }

    pub fn holds(&self, id: HandleId) -> bool {
        self.active.as_ref().is_some_and(|clip| clip.id() == id)
    }

    /// Idle/any -> Starting. Returns the clip it displaced.
    pub fn begin(&mut self, clip: ActiveClip) -> Option<ActiveClip> {
        self.active.replace(clip)
    }

    /// Starting -> Playing, only for the active handle.
    pub fn confirm(&mut self, id: HandleId) -> Option<&ActiveClip> {
        match &mut self.active {
            Some(clip) if clip.id() == id => {
                clip.playing = true;
                Some(&*clip)
            }
            _ => None,
        }
    }

    /// Any -> Idle, only for the active handle.
    pub fn release(&mut self, id: HandleId) -> Option<ActiveClip> {
        if self.holds(id) {
            self.active.take()
        } else {
            None
        }
    }

    /// Any -> Idle unconditionally.
    pub fn take(&mut self) -> Option<ActiveClip> {
        self.active.take()
    }
}
