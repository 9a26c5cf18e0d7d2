//! Engine-agnostic playback signals.

use std::fmt;

use tokio::sync::mpsc;

/// Identifier of one playback handle. Unique for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a clip ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCause {
    /// The backend reported the end of the stream
    Natural,
    /// The voice reached the asset's reported duration with frames left
    FinalPosition,
    /// The watchdog fired before any other signal
    Timeout,
}

/// Signal kinds emitted for a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    /// Playback has audibly begun
    Started,
    /// Playback completed
    Ended(EndCause),
    /// Playback failed after it had started
    Failed(String),
}

/// A signal for one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSignal {
    /// Handle the signal belongs to
    pub handle: HandleId,
    /// Clip key, for logging
    pub key: String,
    /// What happened
    pub kind: SignalKind,
}

impl EngineSignal {
    /// Creates a `Started` signal.
    pub fn started(handle: HandleId, key: impl Into<String>) -> Self {
        Self {
            handle,
            key: key.into(),
            kind: SignalKind::Started,
        }
    }

    /// Creates an `Ended` signal.
    pub fn ended(handle: HandleId, key: impl Into<String>, cause: EndCause) -> Self {
        Self {
            handle,
            key: key.into(),
            kind: SignalKind::Ended(cause),
        }
    }

    /// Creates a `Failed` signal.
    pub fn failed(handle: HandleId, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            handle,
            key: key.into(),
            kind: SignalKind::Failed(reason.into()),
        }
    }

    /// Returns true if the signal ends the handle's playback.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, SignalKind::Started)
    }
}

/// Sending half of the engine signal channel.
pub type SignalSender = mpsc::UnboundedSender<EngineSignal>;

/// Receiving half of the engine signal channel.
pub type SignalReceiver = mpsc::UnboundedReceiver<EngineSignal>;
