//! Interaction-blocking overlay.
//!
//! Shown only while protected playback is audible. While shown it discards
//! pointer, touch and non-Tab key events and offers a single close control
//! that ends protected playback. Visibility is always read from the
//! orchestrator.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use super::event::{CaptureObserver, Disposition, InputEvent};
use crate::orchestrator::Orchestrator;
use crate::types::PlaybackSnapshot;

/// Element id of the overlay's close control.
pub const CLOSE_CONTROL_ID: &str = "voicecue-overlay-close";

/// What the host should render while the overlay is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    /// Key of the protected clip
    pub clip_key: String,
    /// Transcript of the clip, if the catalog has one
    pub caption: Option<String>,
    /// Element id the host must give the close control
    pub close_control: &'static str,
}

/// Host hook that suspends and restores background scrolling.
pub trait ScrollControl: Send + Sync {
    fn suspend(&self);
    fn restore(&self);
}

/// Scroll control that only counts calls. Used by tests and the CLI.
#[derive(Debug, Default)]
pub struct MockViewport {
    suspended: AtomicBool,
    suspends: AtomicUsize,
    restores: AtomicUsize,
}

impl MockViewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    pub fn suspend_count(&self) -> usize {
        self.suspends.load(Ordering::SeqCst)
    }

    pub fn restore_count(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }
}

impl ScrollControl for MockViewport {
    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
        self.suspends.fetch_add(1, Ordering::SeqCst);
    }

    fn restore(&self) {
        self.suspended.store(false, Ordering::SeqCst);
        self.restores.fetch_add(1, Ordering::SeqCst);
    }
}

/// Full-viewport barrier during protected playback.
pub struct BlockingOverlay {
    orchestrator: Orchestrator,
    scroll: Arc<dyn ScrollControl>,
    // Whether `scroll` is currently suspended by us, not whether we are shown.
    scroll_held: AtomicBool,
}

impl BlockingOverlay {
    pub fn new(orchestrator: &Orchestrator, scroll: Arc<dyn ScrollControl>) -> Self {
        Self {
            orchestrator: orchestrator.clone(),
            scroll,
            scroll_held: AtomicBool::new(false),
        }
    }

    /// Returns true while protected playback is audible.
    pub fn is_visible(&self) -> bool {
        self.orchestrator.is_protected_playing()
    }

    /// Returns the view to render, or None when nothing should be shown.
    pub fn render(&self) -> Option<OverlayView> {
        let snapshot = self.orchestrator.snapshot();
        if !snapshot.is_protected_playing() {
            return None;
        }
        let clip_key = snapshot.protected_clip?;
        let caption = self
            .orchestrator
            .catalog()
            .get(&clip_key)
            .map(|clip| clip.text.clone())
            .filter(|text| !text.is_empty());
        Some(OverlayView {
            clip_key,
            caption,
            close_control: CLOSE_CONTROL_ID,
        })
    }

    /// Activates the close control.
    pub fn close(&self) {
        info!("Overlay closed manually");
        self.orchestrator.stop_protected();
        self.sync_scroll(&self.orchestrator.snapshot());
    }

    /// Brings the scroll lock in line with `snapshot`.
    pub fn sync_scroll(&self, snapshot: &PlaybackSnapshot) {
        let shown = snapshot.is_protected_playing();
        if self.scroll_held.swap(shown, Ordering::SeqCst) == shown {
            return;
        }
        if shown {
            debug!("Suspending background scroll");
            self.scroll.suspend();
        } else {
            debug!("Restoring background scroll");
            self.scroll.restore();
        }
    }

    /// Follows published snapshots until the orchestrator goes away.
    pub async fn run(self: Arc<Self>, mut updates: watch::Receiver<PlaybackSnapshot>) {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            self.sync_scroll(&snapshot);
            if updates.changed().await.is_err() {
                break;
            }
        }
        let idle = PlaybackSnapshot::default();
        self.sync_scroll(&idle);
    }
}

impl CaptureObserver for BlockingOverlay {
    fn name(&self) -> &'static str {
        "overlay"
    }

    fn capture(&self, event: &InputEvent) -> Disposition {
        if !self.is_visible() {
            return Disposition::Continue;
        }
        if event.targets(CLOSE_CONTROL_ID) && event.is_activation() {
            self.close();
            return Disposition::Suppress;
        }
        if event.is_tab() {
            return Disposition::Continue;
        }
        Disposition::Suppress
    }
}

impl std::fmt::Debug for BlockingOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingOverlay")
            .field("visible", &self.is_visible())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClipCatalog, ClipResolver};
    use crate::engine::{MockClipBackend, PlaybackEngine};
    use crate::input::event::Key;
    use crate::orchestrator::OrchestratorDriver;
    use crate::types::{PlaybackConfig, RequestOptions};

    fn create_overlay() -> (
        Orchestrator,
        OrchestratorDriver,
        Arc<MockClipBackend>,
        BlockingOverlay,
        Arc<MockViewport>,
    ) {
        let backend = Arc::new(MockClipBackend::new());
        let (engine, signals) =
            PlaybackEngine::new(backend.clone(), PlaybackEngine::DEFAULT_TIMEOUT);
        let catalog = ClipCatalog::from_entries(
            &ClipResolver::default(),
            [("welcome", "Welcome to the feedback session")],
        )
        .unwrap();
        let (orch, driver) = Orchestrator::new(catalog, engine, signals, &PlaybackConfig::default());
        let viewport = Arc::new(MockViewport::new());
        let overlay = BlockingOverlay::new(&orch, viewport.clone());
        (orch, driver, backend, overlay, viewport)
    }

    mod render_tests {
        use super::*;

        #[tokio::test]
        async fn test_hidden_when_idle() {
            let (_orch, _driver, _backend, overlay, _viewport) = create_overlay();
            assert!(overlay.render().is_none());
            assert!(!overlay.is_visible());
        }

        #[tokio::test]
        async fn test_shown_during_protected() {
            let (orch, _driver, _backend, overlay, _viewport) = create_overlay();
            orch.request_protected("welcome", RequestOptions::default()).await;

            let view = overlay.render().unwrap();
            assert_eq!(view.clip_key, "welcome");
            assert_eq!(view.caption.as_deref(), Some("Welcome to the feedback session"));
            assert_eq!(view.close_control, CLOSE_CONTROL_ID);
        }

        #[tokio::test]
        async fn test_hidden_after_completion() {
            let (orch, mut driver, backend, overlay, _viewport) = create_overlay();
            orch.request_protected("welcome", RequestOptions::default()).await;

            backend.complete(backend.last_handle("welcome").unwrap());
            driver.turn().await;

            assert!(overlay.render().is_none());
        }
    }

    mod capture_tests {
        use super::*;

        #[tokio::test]
        async fn test_passes_everything_when_hidden() {
            let (_orch, _driver, _backend, overlay, _viewport) = create_overlay();
            assert_eq!(overlay.capture(&InputEvent::pointer()), Disposition::Continue);
            assert_eq!(overlay.capture(&InputEvent::key(Key::Enter)), Disposition::Continue);
        }

        #[tokio::test]
        async fn test_suppresses_all_but_tab() {
            let (orch, _driver, _backend, overlay, _viewport) = create_overlay();
            orch.request_protected("welcome", RequestOptions::default()).await;

            assert_eq!(overlay.capture(&InputEvent::pointer()), Disposition::Suppress);
            assert_eq!(overlay.capture(&InputEvent::touch()), Disposition::Suppress);
            assert_eq!(overlay.capture(&InputEvent::key(Key::Escape)), Disposition::Suppress);
            assert_eq!(overlay.capture(&InputEvent::key(Key::Enter)), Disposition::Suppress);
            assert_eq!(overlay.capture(&InputEvent::key(Key::Tab)), Disposition::Continue);
            assert!(orch.is_protected_playing());
        }

        #[tokio::test]
        async fn test_close_control_by_pointer() {
            let (orch, _driver, _backend, overlay, _viewport) = create_overlay();
            orch.request_protected("welcome", RequestOptions::default()).await;

            let event = InputEvent::pointer().on(CLOSE_CONTROL_ID);
            assert_eq!(overlay.capture(&event), Disposition::Suppress);
            assert!(!orch.is_protected_playing());
        }

        #[tokio::test]
        async fn test_close_control_by_keyboard() {
            let (orch, _driver, _backend, overlay, _viewport) = create_overlay();
            orch.request_protected("welcome", RequestOptions::default()).await;

            overlay.capture(&InputEvent::key(Key::Char('x')).on(CLOSE_CONTROL_ID));
            assert!(orch.is_protected_playing());

            overlay.capture(&InputEvent::key(Key::Space).on(CLOSE_CONTROL_ID));
            assert!(!orch.is_protected_playing());
        }
    }

    mod scroll_tests {
        use super::*;

        #[tokio::test]
        async fn test_sync_scroll_suspends_once_and_restores() {
            let (orch, _driver, _backend, overlay, viewport) = create_overlay();
            orch.request_protected("welcome", RequestOptions::default()).await;

            overlay.sync_scroll(&orch.snapshot());
            overlay.sync_scroll(&orch.snapshot());
            assert!(viewport.is_suspended());
            assert_eq!(viewport.suspend_count(), 1);

            overlay.close();
            assert!(!viewport.is_suspended());
            assert_eq!(viewport.restore_count(), 1);
        }

        #[tokio::test]
        async fn test_run_follows_snapshots() {
            let (orch, _driver, _backend, overlay, viewport) = create_overlay();
            let overlay = Arc::new(overlay);
            let task = tokio::spawn(Arc::clone(&overlay).run(orch.subscribe()));

            orch.request_protected("welcome", RequestOptions::default()).await;
            tokio::task::yield_now().await;
            assert!(viewport.is_suspended());

            orch.stop_protected();
            tokio::task::yield_now().await;
            assert!(!viewport.is_suspended());

            task.abort();
        }
    }
}
