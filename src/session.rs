//! Composition root.
//!
//! Wires one application session together: engine, orchestrator and its
//! driver, the overlay, the interceptor and the input router. Callers get
//! the orchestrator by reference from here; nothing in the crate is global.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::catalog::{CatalogError, ClipCatalog};
use crate::engine::{ClipBackend, PlaybackEngine};
use crate::flow::FeedbackNarrator;
use crate::input::{
    BlockingOverlay, Disposition, InputEvent, InputRouter, InteractionInterceptor, ScrollControl,
};
use crate::orchestrator::{Orchestrator, OrchestratorDriver};
use crate::types::PlaybackConfig;

/// One running playback session.
pub struct PlaybackSession {
    orchestrator: Orchestrator,
    overlay: Arc<BlockingOverlay>,
    interceptor: Arc<InteractionInterceptor>,
    router: InputRouter,
    tasks: Vec<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Builds a session and spawns its driver and overlay watcher.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured catalog file cannot be loaded.
    pub fn start(
        config: &PlaybackConfig,
        backend: Arc<dyn ClipBackend>,
        scroll: Arc<dyn ScrollControl>,
    ) -> Result<Self, CatalogError> {
        let catalog = ClipCatalog::from_config(config)?;
        let (mut session, driver) = Self::assemble(catalog, config, backend, scroll);

        let watcher = Arc::clone(&session.overlay).run(session.orchestrator.subscribe());
        session.tasks.push(driver.spawn());
        session.tasks.push(tokio::spawn(watcher));
        debug!(clips = session.orchestrator.catalog().len(), "Playback session started");
        Ok(session)
    }

    /// Builds a session without spawning anything.
    ///
    /// The caller owns the returned driver and decides how to run it.
    pub fn assemble(
        catalog: ClipCatalog,
        config: &PlaybackConfig,
        backend: Arc<dyn ClipBackend>,
        scroll: Arc<dyn ScrollControl>,
    ) -> (Self, OrchestratorDriver) {
        let timeout = Duration::from_secs(config.playback_timeout_secs);
        let (engine, signals) = PlaybackEngine::new(backend, timeout);
        let (orchestrator, driver) = Orchestrator::new(catalog, engine, signals, config);

        let overlay = Arc::new(BlockingOverlay::new(&orchestrator, scroll));
        let interceptor = Arc::new(InteractionInterceptor::new(&orchestrator));

        // Overlay first: events it suppresses never reach the interceptor.
        let mut router = InputRouter::new();
        router.add_observer(overlay.clone());
        router.add_observer(interceptor.clone());

        let session = Self {
            orchestrator,
            overlay,
            interceptor,
            router,
            tasks: Vec::new(),
        };
        (session, driver)
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn overlay(&self) -> &BlockingOverlay {
        &self.overlay
    }

    pub fn interceptor(&self) -> &InteractionInterceptor {
        &self.interceptor
    }

    /// Registers a page handler behind the capture stage.
    pub fn add_page_handler(&mut self, handler: impl Fn(&InputEvent) + Send + Sync + 'static) {
        self.router.add_handler(handler);
    }

    /// Routes a user interaction.
    pub fn dispatch(&self, event: &InputEvent) -> Disposition {
        self.router.dispatch(event)
    }

    /// Creates a narrator for the page `page_id`.
    pub fn narrator(&self, page_id: impl Into<String>) -> FeedbackNarrator {
        FeedbackNarrator::new(&self.orchestrator, page_id)
    }

    /// Stops both lanes and the background tasks.
    pub fn shutdown(mut self) {
        self.stop_all();
    }

    fn stop_all(&mut self) {
        self.orchestrator.stop_regular();
        self.orchestrator.stop_protected();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("orchestrator", &self.orchestrator)
            .field("router", &self.router)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}
