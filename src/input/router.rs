//! Two-stage event delivery: capture observers, then page handlers.

use std::sync::Arc;

use tracing::debug;

use super::event::{CaptureObserver, Disposition, InputEvent};

/// Callback for events that survive the capture stage.
pub type PageHandler = Box<dyn Fn(&InputEvent) + Send + Sync>;

/// Routes events through the capture stage and on to page handlers.
///
/// Observers run in registration order and the first `Suppress` ends
/// delivery. Register the overlay before the interceptor so that
/// suppressed events never reach the interceptor.
#[derive(Default)]
pub struct InputRouter {
    observers: Vec<Arc<dyn CaptureObserver>>,
    handlers: Vec<PageHandler>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a capture observer.
    pub fn add_observer(&mut self, observer: Arc<dyn CaptureObserver>) {
        self.observers.push(observer);
    }

    /// Appends a page handler.
    pub fn add_handler(&mut self, handler: impl Fn(&InputEvent) + Send + Sync + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Delivers `event`. Returns `Suppress` if an observer discarded it.
    pub fn dispatch(&self, event: &InputEvent) -> Disposition {
        for observer in &self.observers {
            if observer.capture(event) == Disposition::Suppress {
                debug!(%event, observer = observer.name(), "Event suppressed");
                return Disposition::Suppress;
            }
        }
        for handler in &self.handlers {
            handler(event);
        }
        Disposition::Continue
    }

    /// Number of capture observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl std::fmt::Debug for InputRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.observers.iter().map(|o| o.name()).collect();
        f.debug_struct("InputRouter")
            .field("observers", &names)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
