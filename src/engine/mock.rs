//! Mock backend for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use super::signal::{EndCause, EngineSignal, HandleId, SignalSender};
use super::{ClipBackend, StartOutcome, StartTicket};
use crate::catalog::ClipDescriptor;

/// A start request seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockStart {
    /// Handle that was started
    pub handle: HandleId,
    /// Clip key
    pub key: String,
}

#[derive(Debug, Default)]
struct MockState {
    starts: Vec<MockStart>,
    stops: Vec<HandleId>,
    scripted: VecDeque<StartOutcome>,
    holds: usize,
    pending: HashMap<HandleId, oneshot::Sender<StartOutcome>>,
    voices: HashMap<HandleId, (String, SignalSender)>,
}

/// Scriptable backend that records every call.
///
/// By default every start succeeds immediately. Outcomes can be scripted
/// with [`push_outcome`](Self::push_outcome), and starts can be held open
/// with [`hold_next_start`](Self::hold_next_start) and settled later with
/// [`resolve`](Self::resolve).
#[derive(Debug, Default)]
pub struct MockClipBackend {
    state: Mutex<MockState>,
    muted: AtomicBool,
}

impl MockClipBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues the outcome of a future start.
    pub fn push_outcome(&self, outcome: StartOutcome) {
        self.lock().scripted.push_back(outcome);
    }

    /// Keeps the next start pending until [`resolve`](Self::resolve) is called.
    pub fn hold_next_start(&self) {
        self.lock().holds += 1;
    }

    /// Settles a held start. Returns false if `handle` has no pending start.
    pub fn resolve(&self, handle: HandleId, outcome: StartOutcome) -> bool {
        let mut state = self.lock();
        let Some(reply) = state.pending.remove(&handle) else {
            return false;
        };
        if outcome != StartOutcome::Started {
            state.voices.remove(&handle);
        }
        reply.send(outcome).is_ok()
    }

    /// Emits a natural `Ended` signal for an active voice.
    pub fn complete(&self, handle: HandleId) -> bool {
        self.finish(handle, |key| EngineSignal::ended(handle, key, EndCause::Natural))
    }

    /// Emits an `Ended` signal as if the voice reached its reported duration.
    pub fn complete_at_final_position(&self, handle: HandleId) -> bool {
        self.finish(handle, |key| {
            EngineSignal::ended(handle, key, EndCause::FinalPosition)
        })
    }

    /// Emits a `Failed` signal for an active voice.
    pub fn fail(&self, handle: HandleId, reason: &str) -> bool {
        self.finish(handle, |key| EngineSignal::failed(handle, key, reason))
    }

    fn finish(&self, handle: HandleId, signal: impl FnOnce(String) -> EngineSignal) -> bool {
        let voice = self.lock().voices.remove(&handle);
        match voice {
            Some((key, signals)) => signals.send(signal(key)).is_ok(),
            None => false,
        }
    }

    /// Returns every start request in order.
    #[must_use]
    pub fn starts(&self) -> Vec<MockStart> {
        self.lock().starts.clone()
    }

    /// Returns the keys of every start request in order.
    #[must_use]
    pub fn started_keys(&self) -> Vec<String> {
        self.lock().starts.iter().map(|s| s.key.clone()).collect()
    }

    /// Number of start requests.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.lock().starts.len()
    }

    /// Handle of the latest start for `key`.
    #[must_use]
    pub fn last_handle(&self, key: &str) -> Option<HandleId> {
        self.lock()
            .starts
            .iter()
            .rev()
            .find(|s| s.key == key)
            .map(|s| s.handle)
    }

    /// Number of stop calls for `handle`.
    #[must_use]
    pub fn stop_count(&self, handle: HandleId) -> usize {
        self.lock().stops.iter().filter(|h| **h == handle).count()
    }

    /// Returns true if a voice for `handle` is currently audible.
    #[must_use]
    pub fn is_active(&self, handle: HandleId) -> bool {
        let state = self.lock();
        state.voices.contains_key(&handle) && !state.pending.contains_key(&handle)
    }

    /// Forgets all recorded calls.
    pub fn clear_calls(&self) {
        let mut state = self.lock();
        state.starts.clear();
        state.stops.clear();
    }
}

impl ClipBackend for MockClipBackend {
    fn start(&self, handle: HandleId, clip: &ClipDescriptor, signals: &SignalSender) -> StartTicket {
        let (reply, ticket) = oneshot::channel();
        let mut state = self.lock();
        state.starts.push(MockStart {
            handle,
            key: clip.key.clone(),
        });

        if self.muted.load(Ordering::SeqCst) {
            let _ = reply.send(StartOutcome::Blocked("mock backend muted".to_string()));
            return ticket;
        }

        if state.holds > 0 {
            state.holds -= 1;
            state.pending.insert(handle, reply);
            state.voices.insert(handle, (clip.key.clone(), signals.clone()));
            return ticket;
        }

        let outcome = state.scripted.pop_front().unwrap_or(StartOutcome::Started);
        if outcome == StartOutcome::Started {
            state.voices.insert(handle, (clip.key.clone(), signals.clone()));
        }
        let _ = reply.send(outcome);
        ticket
    }

    fn stop(&self, handle: HandleId) {
        let mut state = self.lock();
        state.stops.push(handle);
        state.voices.remove(&handle);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }
}
