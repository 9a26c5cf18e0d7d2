//! Playback orchestrator.
//!
//! The single source of truth for what is audible. It owns:
//! - the regular (interruptible) lane
//! - the protected (uninterruptible) lane
//! - the priority queue of pending regular requests
//! - the de-dup ledger
//!
//! All state lives behind one mutex that is never held across an `.await`.
//! `PlaybackEngine::play` is the only suspension point; its result is always
//! checked against the lane's active handle before it is acted on, so a
//! late result for a replaced handle cannot resurrect it.
//!
//! Engine signals and scheduled queue drains are processed by the
//! [`OrchestratorDriver`] returned from [`Orchestrator::new`].

mod driver;
mod lane;
mod ledger;
mod queue;
mod scope;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub use driver::OrchestratorDriver;
pub use ledger::PlayedLedger;
pub use queue::{PendingQueue, QueueEntry};
pub use scope::PlaybackScope;

use lane::{ActiveClip, Lane, Origin};

use crate::catalog::ClipCatalog;
use crate::engine::{EngineSignal, PlaybackEngine, PlaybackHandle, SignalKind, SignalReceiver};
use crate::types::{
    LaneKind, LanePhase, PlaybackConfig, PlaybackSnapshot, RequestOptions, RequestOutcome,
};

/// Internal messages that ask the driver for work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    /// Try to start the next queued entry
    Drain,
}

#[derive(Debug)]
struct State {
    regular: Lane,
    protected: Lane,
    queue: PendingQueue,
    ledger: PlayedLedger,
    enabled: bool,
    drain_scheduled: bool,
}

impl State {
    fn lane_mut(&mut self, kind: LaneKind) -> &mut Lane {
        match kind {
            LaneKind::Regular => &mut self.regular,
            LaneKind::Protected => &mut self.protected,
        }
    }

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            regular: self.regular.phase(),
            protected: self.protected.phase(),
            regular_clip: self.regular.clip_key().map(str::to_string),
            protected_clip: self.protected.clip_key().map(str::to_string),
            queue_length: self.queue.len(),
        }
    }
}

struct Inner {
    state: Mutex<State>,
    engine: PlaybackEngine,
    catalog: ClipCatalog,
    max_retries: u32,
    published: watch::Sender<PlaybackSnapshot>,
    wake: mpsc::UnboundedSender<Wake>,
}

/// Cheaply cloneable handle to the orchestrator.
///
/// Construct one per application session at the composition root and pass
/// clones to the interceptor, the overlay and the callers.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

/// What the drain loop should do after a queued start settled.
enum DrainStep {
    /// The lane is occupied or nothing more can start
    Done,
    /// Try the next entry
    Continue,
}

impl Orchestrator {
    /// Creates an orchestrator and the driver that must run alongside it.
    pub fn new(
        catalog: ClipCatalog,
        engine: PlaybackEngine,
        signals: SignalReceiver,
        config: &PlaybackConfig,
    ) -> (Self, OrchestratorDriver) {
        let (wake, wake_rx) = mpsc::unbounded_channel();
        let (published, _) = watch::channel(PlaybackSnapshot::default());
        let state = State {
            regular: Lane::new(LaneKind::Regular),
            protected: Lane::new(LaneKind::Protected),
            queue: PendingQueue::new(),
            ledger: PlayedLedger::new(),
            enabled: config.enabled,
            drain_scheduled: false,
        };

        let orchestrator = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                engine,
                catalog,
                max_retries: config.max_retries,
                published,
                wake,
            }),
        };
        let driver = OrchestratorDriver::new(orchestrator.clone(), signals, wake_rx);
        (orchestrator, driver)
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    /// Plays `key` on the regular lane now, replacing whatever is playing there.
    pub async fn request_regular(&self, key: &str, opts: RequestOptions) -> RequestOutcome {
        let ledger_key = opts.ledger_key(key).to_string();
        let begun = self.update(|state| {
            if let Some(outcome) = self.admit(state, key, &ledger_key, opts.force, false) {
                return Err(outcome);
            }
            // The ledger only holds clips that have started.
            if !opts.force && state.regular.ledger_key() == Some(ledger_key.as_str()) {
                debug!(key, ledger_key = %ledger_key, "Clip already starting, skipping");
                return Err(RequestOutcome::Skipped);
            }
            let handle = self.create_handle(key)?;
            let displaced = state.regular.begin(ActiveClip::new(
                Arc::clone(&handle),
                ledger_key.as_str(),
                Origin::Immediate,
            ));
            Ok((handle, displaced))
        });
        let (handle, displaced) = match begun {
            Ok(begun) => begun,
            Err(outcome) => return outcome,
        };

        if let Some(displaced) = displaced {
            debug!(
                from = %displaced.handle.key(),
                to = %key,
                "Preempting regular playback"
            );
            self.inner.engine.stop(&displaced.handle);
        }

        let started = self.inner.engine.play(&handle).await;
        self.settle(LaneKind::Regular, &handle, started)
    }

    /// Adds `key` to the pending queue without preempting.
    ///
    /// If the regular lane is idle, a drain is scheduled for the driver's
    /// next turn, so entries enqueued together are ordered by priority
    /// before the first one starts.
    pub fn enqueue_regular(&self, key: &str, opts: RequestOptions) -> RequestOutcome {
        let ledger_key = opts.ledger_key(key).to_string();
        self.update(|state| {
            if let Some(outcome) = self.admit(state, key, &ledger_key, opts.force, true) {
                return outcome;
            }
            state
                .queue
                .push(QueueEntry::new(key, ledger_key.as_str(), opts.priority));
            debug!(key, priority = opts.priority, pending = state.queue.len(), "Queued clip");
            if !state.regular.is_busy() {
                self.schedule_drain(state);
            }
            RequestOutcome::Queued
        })
    }

    /// Plays `key` on the protected lane.
    ///
    /// Refused while another protected clip is active; protected requests are
    /// never queued.
    pub async fn request_protected(&self, key: &str, opts: RequestOptions) -> RequestOutcome {
        let ledger_key = opts.ledger_key(key).to_string();
        let begun = self.update(|state| {
            if !state.enabled {
                return Err(RequestOutcome::Disabled);
            }
            if state.protected.is_busy() {
                warn!(
                    key,
                    active = ?state.protected.clip_key(),
                    "Protected playback already active, request refused"
                );
                return Err(RequestOutcome::Refused);
            }
            if let Some(outcome) = self.admit(state, key, &ledger_key, opts.force, false) {
                return Err(outcome);
            }
            let handle = self.create_handle(key)?;
            state.protected.begin(ActiveClip::new(
                Arc::clone(&handle),
                ledger_key.as_str(),
                Origin::Immediate,
            ));
            Ok(handle)
        });
        let handle = match begun {
            Ok(handle) => handle,
            Err(outcome) => return outcome,
        };

        let started = self.inner.engine.play(&handle).await;
        self.settle(LaneKind::Protected, &handle, started)
    }

    // ------------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------------

    /// Stops the regular lane. Idempotent; never touches the protected lane.
    ///
    /// If something was stopped and entries are pending, the next one is
    /// started on the driver's next turn.
    pub fn stop_regular(&self) {
        let stopped = self.update(|state| {
            let stopped = state.regular.take();
            if stopped.is_some() && !state.queue.is_empty() {
                self.schedule_drain(state);
            }
            stopped
        });
        if let Some(clip) = stopped {
            self.inner.engine.stop(&clip.handle);
            info!(key = %clip.handle.key(), "Regular playback stopped");
        }
    }

    /// Stops the protected lane. Idempotent.
    pub fn stop_protected(&self) {
        let stopped = self.update(|state| state.protected.take());
        if let Some(clip) = stopped {
            self.inner.engine.stop(&clip.handle);
            info!(key = %clip.handle.key(), "Protected playback stopped manually");
        }
    }

    // ------------------------------------------------------------------------
    // Read-only state
    // ------------------------------------------------------------------------

    /// Returns true while a regular clip is audible.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.read(|state| state.regular.phase() == LanePhase::Playing)
    }

    /// Returns true while a protected clip is audible.
    #[must_use]
    pub fn is_protected_playing(&self) -> bool {
        self.read(|state| state.protected.phase() == LanePhase::Playing)
    }

    /// Phase of the regular lane.
    #[must_use]
    pub fn regular_phase(&self) -> LanePhase {
        self.read(|state| state.regular.phase())
    }

    /// Phase of the protected lane.
    #[must_use]
    pub fn protected_phase(&self) -> LanePhase {
        self.read(|state| state.protected.phase())
    }

    /// Number of pending queue entries.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.read(|state| state.queue.len())
    }

    /// Clip keys of the pending entries in dequeue order.
    #[must_use]
    pub fn queued_keys(&self) -> Vec<String> {
        self.read(|state| state.queue.keys())
    }

    /// Returns true if the ledger holds `ledger_key`.
    #[must_use]
    pub fn has_played(&self, ledger_key: &str) -> bool {
        self.read(|state| state.ledger.contains(ledger_key))
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.read(State::snapshot)
    }

    /// Subscribes to published state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.inner.published.subscribe()
    }

    /// Returns the clip catalog.
    #[must_use]
    pub fn catalog(&self) -> &ClipCatalog {
        &self.inner.catalog
    }

    /// Returns true unless the kill switch is off.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.read(|state| state.enabled)
    }

    // ------------------------------------------------------------------------
    // Session controls
    // ------------------------------------------------------------------------

    /// Turns the kill switch on or off. Active clips keep playing.
    pub fn set_enabled(&self, enabled: bool) {
        self.update(|state| state.enabled = enabled);
        info!(enabled, "Playback kill switch changed");
    }

    /// Removes ledger keys, e.g. when their scope is torn down.
    pub fn forget<'a>(&self, ledger_keys: impl IntoIterator<Item = &'a str>) {
        self.update(|state| state.ledger.forget(ledger_keys));
    }

    /// Removes every ledger key.
    pub fn clear_ledger(&self) {
        self.update(|state| state.ledger.clear());
        debug!("Played ledger cleared");
    }

    // ------------------------------------------------------------------------
    // Driver entry points
    // ------------------------------------------------------------------------

    /// Applies an engine signal.
    pub(crate) async fn handle_signal(&self, signal: EngineSignal) {
        let id = signal.handle;
        let reason = match signal.kind {
            SignalKind::Started => {
                debug!(handle = %id, key = %signal.key, "Engine reported start");
                return;
            }
            SignalKind::Ended(cause) => {
                debug!(handle = %id, key = %signal.key, ?cause, "Engine reported end");
                None
            }
            SignalKind::Failed(reason) => Some(reason),
        };

        let released = self.update(|state| {
            [&mut state.regular, &mut state.protected]
                .into_iter()
                .find_map(|lane| lane.release(id).map(|clip| (lane.kind(), clip)))
        });
        let Some((lane, clip)) = released else {
            debug!(handle = %id, key = %signal.key, "Ignoring signal for inactive handle");
            return;
        };

        self.inner.engine.stop(&clip.handle);
        match reason {
            Some(reason) => warn!(lane = %lane, key = %signal.key, %reason, "Clip failed"),
            None => info!(lane = %lane, key = %signal.key, "Clip finished"),
        }

        if lane == LaneKind::Regular {
            self.drain_queue().await;
        }
    }

    /// Handles a wake message.
    pub(crate) async fn handle_wake(&self, wake: Wake) {
        match wake {
            Wake::Drain => {
                self.update(|state| state.drain_scheduled = false);
                self.drain_queue().await;
            }
        }
    }

    /// Starts queued entries until one plays, the lane is taken or the
    /// queue is empty.
    async fn drain_queue(&self) {
        loop {
            let next = self.update(|state| {
                if !state.enabled || state.regular.is_busy() {
                    return None;
                }
                while let Some(entry) = state.queue.pop() {
                    let Some(clip) = self.inner.catalog.get(&entry.key) else {
                        warn!(key = %entry.key, "Dropping queued entry for unknown clip");
                        continue;
                    };
                    let handle = self.inner.engine.create(clip);
                    let ledger_key = entry.ledger_key.clone();
                    state.regular.begin(ActiveClip::new(
                        Arc::clone(&handle),
                        ledger_key,
                        Origin::Queued(entry),
                    ));
                    return Some(handle);
                }
                None
            });
            let Some(handle) = next else {
                return;
            };

            let started = self.inner.engine.play(&handle).await;
            match self.settle_queued(&handle, started) {
                DrainStep::Done => return,
                DrainStep::Continue => {}
            }
        }
    }

    fn settle_queued(&self, handle: &Arc<PlaybackHandle>, started: bool) -> DrainStep {
        let id = handle.id();
        let max_retries = self.inner.max_retries;
        let (step, superseded) = self.update(|state| {
            if started {
                return match state.regular.confirm(id) {
                    Some(clip) => {
                        let ledger_key = clip.ledger_key.clone();
                        state.ledger.record(&ledger_key);
                        (DrainStep::Done, false)
                    }
                    None => (DrainStep::Continue, true),
                };
            }

            let Some(clip) = state.regular.release(id) else {
                // Someone else owns the lane now.
                return (DrainStep::Done, false);
            };
            if let Origin::Queued(entry) = clip.origin {
                if entry.retry_count < max_retries {
                    debug!(
                        key = %entry.key,
                        retry = entry.retry_count + 1,
                        "Re-queueing entry that failed to start"
                    );
                    state.queue.push(entry.retried());
                } else {
                    warn!(
                        key = %entry.key,
                        retries = entry.retry_count,
                        "Dropping queued entry after repeated start failures"
                    );
                }
            }
            (DrainStep::Continue, false)
        });
        if superseded {
            self.inner.engine.stop(handle);
        }
        step
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Settles an immediate request after `play` resolved.
    fn settle(&self, kind: LaneKind, handle: &Arc<PlaybackHandle>, started: bool) -> RequestOutcome {
        let id = handle.id();
        let outcome = self.update(|state| {
            if started {
                let lane = match kind {
                    LaneKind::Regular => &mut state.regular,
                    LaneKind::Protected => &mut state.protected,
                };
                return match lane.confirm(id) {
                    Some(clip) => {
                        let ledger_key = clip.ledger_key.clone();
                        state.ledger.record(&ledger_key);
                        RequestOutcome::Played
                    }
                    None => RequestOutcome::Superseded,
                };
            }

            if state.lane_mut(kind).release(id).is_none() {
                return RequestOutcome::Superseded;
            }
            if kind == LaneKind::Regular && !state.queue.is_empty() {
                self.schedule_drain(state);
            }
            RequestOutcome::NotStarted
        });

        if outcome == RequestOutcome::Superseded {
            self.inner.engine.stop(handle);
            debug!(lane = %kind, key = %handle.key(), "Request superseded before it started");
        }
        outcome
    }

    /// Checks the kill switch, the catalog and the ledger.
    fn admit(
        &self,
        state: &State,
        key: &str,
        ledger_key: &str,
        force: bool,
        check_queue: bool,
    ) -> Option<RequestOutcome> {
        if !state.enabled {
            debug!(key, "Playback disabled, ignoring request");
            return Some(RequestOutcome::Disabled);
        }
        if !self.inner.catalog.contains(key) {
            warn!(key, "Unknown clip requested");
            return Some(RequestOutcome::UnknownClip);
        }
        if !force
            && (state.ledger.contains(ledger_key)
                || (check_queue && state.queue.contains(ledger_key)))
        {
            debug!(key, ledger_key, "Clip already played or queued, skipping");
            return Some(RequestOutcome::Skipped);
        }
        None
    }

    fn create_handle(&self, key: &str) -> Result<Arc<PlaybackHandle>, RequestOutcome> {
        self.inner
            .catalog
            .get(key)
            .map(|clip| self.inner.engine.create(clip))
            .ok_or(RequestOutcome::UnknownClip)
    }

    fn schedule_drain(&self, state: &mut State) {
        if !state.drain_scheduled {
            state.drain_scheduled = true;
            let _ = self.inner.wake.send(Wake::Drain);
        }
    }

    fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn update<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut state);
        let snapshot = state.snapshot();
        drop(state);

        self.inner.published.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        result
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
