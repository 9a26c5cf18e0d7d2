//! Global interaction interceptor.
//!
//! Any user interaction silences regular narration. The interceptor sits in
//! the capture stage, never suppresses anything, and asks the orchestrator
//! for the current lane phases on every event.

use std::fmt;

use tracing::debug;

use super::event::{CaptureObserver, Disposition, InputEvent};
use crate::orchestrator::Orchestrator;
use crate::types::LanePhase;

/// Whether the next interaction would stop regular playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorState {
    /// Regular lane is active and protected playback is not
    Armed,
    /// Nothing to silence
    Disarmed,
}

impl fmt::Display for InterceptorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptorState::Armed => write!(f, "armed"),
            InterceptorState::Disarmed => write!(f, "disarmed"),
        }
    }
}

/// Silences regular playback on user interaction.
#[derive(Debug, Clone)]
pub struct InteractionInterceptor {
    orchestrator: Orchestrator,
}

impl InteractionInterceptor {
    pub fn new(orchestrator: &Orchestrator) -> Self {
        Self {
            orchestrator: orchestrator.clone(),
        }
    }

    /// Current state, computed from the orchestrator.
    pub fn state(&self) -> InterceptorState {
        let snapshot = self.orchestrator.snapshot();
        if snapshot.regular == LanePhase::Idle || snapshot.is_protected_playing() {
            InterceptorState::Disarmed
        } else {
            InterceptorState::Armed
        }
    }

    /// Reacts to one interaction. Returns true if regular playback was stopped.
    pub fn observe(&self, event: &InputEvent) -> bool {
        if self.state() == InterceptorState::Disarmed {
            return false;
        }
        debug!(%event, "Interaction while narrating, stopping regular playback");
        self.orchestrator.stop_regular();
        true
    }
}

impl CaptureObserver for InteractionInterceptor {
    fn name(&self) -> &'static str {
        "interceptor"
    }

    fn capture(&self, event: &InputEvent) -> Disposition {
        self.observe(event);
        Disposition::Continue
    }
}
