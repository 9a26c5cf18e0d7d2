//! Interaction layer.
//!
//! This module handles:
//! - The platform-independent event model
//! - Two-stage routing (capture observers, then page handlers)
//! - The interceptor that silences regular narration on interaction
//! - The overlay that blocks interaction during protected playback
//!
//! The host UI translates native events into [`InputEvent`] values and
//! passes them to [`InputRouter::dispatch`].

mod event;
mod interceptor;
mod overlay;
mod router;

pub use event::{CaptureObserver, Disposition, InputEvent, InputKind, Key};
pub use interceptor::{InteractionInterceptor, InterceptorState};
pub use overlay::{BlockingOverlay, MockViewport, OverlayView, ScrollControl, CLOSE_CONTROL_ID};
pub use router::{InputRouter, PageHandler};
