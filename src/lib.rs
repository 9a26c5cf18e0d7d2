//! voicecue library
//!
//! Audio playback orchestration for a voice-feedback collection tool.
//! It includes:
//! - Clip catalog and asset resolution
//! - Playback engine with a rodio backend, a 30 s watchdog and a mock backend
//! - Orchestrator with a regular and a protected lane, a priority queue and
//!   a de-dup ledger
//! - Interaction interceptor and blocking overlay
//! - Feedback-flow narration adapters
//! - CLI command parsing and display utilities

pub mod catalog;
pub mod cli;
pub mod engine;
pub mod flow;
pub mod input;
pub mod orchestrator;
pub mod session;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    LaneKind, LanePhase, PlaybackConfig, PlaybackSnapshot, RequestOptions, RequestOutcome,
};

pub use catalog::{CatalogError, ClipCatalog, ClipDescriptor, ClipResolver};

pub use engine::{
    try_create_backend, ClipBackend, EndCause, EngineSignal, HandleId, MockClipBackend,
    PlaybackEngine, PlaybackError, PlaybackHandle, RodioBackend, StartOutcome,
};

pub use orchestrator::{Orchestrator, OrchestratorDriver, PlaybackScope};

pub use input::{
    BlockingOverlay, Disposition, InputEvent, InputRouter, InteractionInterceptor,
    InterceptorState, Key, MockViewport, ScrollControl,
};

pub use flow::{FeedbackNarrator, FeedbackStep, HelpTopic};

pub use session::PlaybackSession;
