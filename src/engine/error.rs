//! Playback engine error types.
//!
//! These errors never cross the orchestrator API; the engine folds them into
//! a `bool` from `play` and a log line. They exist so backends can describe
//! what went wrong.

use thiserror::Error;

/// Errors that can occur while starting a clip.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No audio output device could be opened.
    #[error("audio output device not available: {0}")]
    DeviceNotAvailable(String),

    /// The clip asset does not exist or cannot be opened.
    #[error("clip asset not found: {0}")]
    AssetNotFound(String),

    /// The clip asset could not be decoded.
    #[error("failed to decode clip asset: {0}")]
    DecodeError(String),

    /// A sink could not be attached to the output stream.
    #[error("failed to create audio sink: {0}")]
    StreamError(String),

    /// The audio thread has exited.
    #[error("audio thread is not running")]
    ThreadGone,
}

impl PlaybackError {
    /// Returns true if this error is related to device availability.
    ///
    /// Device errors are treated as "platform refused to start", not as
    /// asset failures.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotAvailable(_) | Self::StreamError(_) | Self::ThreadGone
        )
    }

    /// Returns true if this error is related to the clip asset.
    #[must_use]
    pub fn is_asset_error(&self) -> bool {
        matches!(self, Self::AssetNotFound(_) | Self::DecodeError(_))
    }
}
