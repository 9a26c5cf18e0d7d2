//! Core data types for voicecue.
//!
//! This module defines the data structures used for:
//! - Playback configuration with validation
//! - Request options and outcomes of the orchestrator API
//! - Lane phases and the published playback snapshot

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// PlaybackConfig
// ============================================================================

fn default_audio_dir() -> PathBuf {
    PathBuf::from("/audio")
}

fn default_extension() -> String {
    "mp3".to_string()
}

fn default_playback_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_priority() -> i32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_enabled() -> bool {
    true
}

/// Configuration for the playback subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Directory that holds the pre-rendered clips
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
    /// File extension of the clips (without the dot)
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Watchdog timeout per handle in seconds (1-600)
    #[serde(default = "default_playback_timeout_secs")]
    pub playback_timeout_secs: u64,
    /// Maximum retries for a queued entry that fails to start (0-10)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Priority used when a caller does not specify one
    #[serde(default = "default_priority")]
    pub default_priority: i32,
    /// How often the audio thread checks for finished voices (5-1000 ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Global kill switch; requests are no-ops when false
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Optional JSON file that overrides the built-in clip catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<PathBuf>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            extension: default_extension(),
            playback_timeout_secs: default_playback_timeout_secs(),
            max_retries: default_max_retries(),
            default_priority: default_priority(),
            poll_interval_ms: default_poll_interval_ms(),
            enabled: default_enabled(),
            catalog_file: None,
        }
    }
}

impl PlaybackConfig {
    /// Returns a copy of the configuration with a different audio directory.
    pub fn with_audio_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audio_dir = dir.into();
        self
    }

    /// Returns a copy of the configuration with a different watchdog timeout.
    pub fn with_playback_timeout_secs(mut self, secs: u64) -> Self {
        self.playback_timeout_secs = secs;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.extension.is_empty() || self.extension.contains(['.', '/']) {
            return Err(format!("invalid clip extension: {:?}", self.extension));
        }
        if !(1..=600).contains(&self.playback_timeout_secs) {
            return Err("playback timeout must be between 1 and 600 seconds".to_string());
        }
        if self.max_retries > 10 {
            return Err("max retries must be between 0 and 10".to_string());
        }
        if !(5..=1000).contains(&self.poll_interval_ms) {
            return Err("poll interval must be between 5 and 1000 ms".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Request types
// ============================================================================

/// Options accepted by the request entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// Queue priority; higher plays first
    pub priority: i32,
    /// Bypass the de-dup ledger for this one invocation
    pub force: bool,
    /// Ledger key to check and record instead of the clip key
    pub dedup_key: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            force: false,
            dedup_key: None,
        }
    }
}

impl RequestOptions {
    /// Options with the given priority.
    pub fn priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    /// Options that bypass the ledger.
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    /// Sets the ledger key.
    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }

    /// Returns the key the ledger should use for `clip_key`.
    pub fn ledger_key<'a>(&'a self, clip_key: &'a str) -> &'a str {
        self.dedup_key.as_deref().unwrap_or(clip_key)
    }
}

/// Result of a request to the orchestrator.
///
/// Playback failures are routine; they are reported here instead of as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Playback has audibly begun
    Played,
    /// Entry was added to the pending queue
    Queued,
    /// Key was already played in this scope (or already queued)
    Skipped,
    /// Request was rejected, e.g. protected playback already active
    Refused,
    /// Platform refused to start or the asset failed to load
    NotStarted,
    /// A newer request replaced this one before it started
    Superseded,
    /// The kill switch is off
    Disabled,
    /// No clip is registered under the key
    UnknownClip,
}

impl RequestOutcome {
    /// Returns the string representation of the outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Played => "played",
            RequestOutcome::Queued => "queued",
            RequestOutcome::Skipped => "skipped",
            RequestOutcome::Refused => "refused",
            RequestOutcome::NotStarted => "not_started",
            RequestOutcome::Superseded => "superseded",
            RequestOutcome::Disabled => "disabled",
            RequestOutcome::UnknownClip => "unknown_clip",
        }
    }

    /// Returns true if the request resulted in audible playback.
    pub fn did_play(&self) -> bool {
        matches!(self, RequestOutcome::Played)
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Lane types
// ============================================================================

/// The two playback lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneKind {
    /// Interruptible lane, silenced by any interaction
    Regular,
    /// Uninterruptible lane, ends by completion, error, timeout or manual close
    Protected,
}

impl LaneKind {
    /// Returns the string representation of the lane.
    pub fn as_str(&self) -> &'static str {
        match self {
            LaneKind::Regular => "regular",
            LaneKind::Protected => "protected",
        }
    }
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a single lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanePhase {
    /// Nothing active
    #[default]
    Idle,
    /// A handle was created and `play` has not settled yet
    Starting,
    /// Audible
    Playing,
}

impl LanePhase {
    /// Returns true if a handle occupies the lane.
    pub fn is_busy(&self) -> bool {
        !matches!(self, LanePhase::Idle)
    }
}

/// Published view of the orchestrator state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Phase of the regular lane
    pub regular: LanePhase,
    /// Phase of the protected lane
    pub protected: LanePhase,
    /// Key of the clip on the regular lane
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_clip: Option<String>,
    /// Key of the clip on the protected lane
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected_clip: Option<String>,
    /// Number of pending queue entries
    pub queue_length: usize,
}

impl PlaybackSnapshot {
    /// Returns true if protected playback is audible.
    pub fn is_protected_playing(&self) -> bool {
        self.protected == LanePhase::Playing
    }

    /// Returns true if nothing is active and nothing is pending.
    pub fn is_quiet(&self) -> bool {
        !self.regular.is_busy() && !self.protected.is_busy() && self.queue_length == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod config_tests {
        use super::*;

        #[test]
        fn test_default_config() {
            let config = PlaybackConfig::default();
            assert_eq!(config.audio_dir, PathBuf::from("/audio"));
            assert_eq!(config.extension, "mp3");
            assert_eq!(config.playback_timeout_secs, 30);
            assert_eq!(config.max_retries, 2);
            assert_eq!(config.default_priority, 5);
            assert!(config.enabled);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_deserialize_with_defaults() {
            let config: PlaybackConfig =
                serde_json::from_str(r#"{"audio_dir": "/srv/clips"}"#).unwrap();
            assert_eq!(config.audio_dir, PathBuf::from("/srv/clips"));
            assert_eq!(config.extension, "mp3");
            assert_eq!(config.playback_timeout_secs, 30);
        }

        #[test]
        fn test_validate_rejects_bad_extension() {
            let config = PlaybackConfig {
                extension: ".mp3".to_string(),
                ..PlaybackConfig::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_validate_rejects_zero_timeout() {
            let config = PlaybackConfig::default().with_playback_timeout_secs(0);
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_validate_rejects_many_retries() {
            let config = PlaybackConfig {
                max_retries: 11,
                ..PlaybackConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.contains("retries"));
        }
    }

    mod request_tests {
        use super::*;

        #[test]
        fn test_default_options() {
            let opts = RequestOptions::default();
            assert_eq!(opts.priority, 5);
            assert!(!opts.force);
            assert_eq!(opts.ledger_key("welcome"), "welcome");
        }

        #[test]
        fn test_dedup_key_overrides_ledger_key() {
            let opts = RequestOptions::priority(9).with_dedup_key("page:welcome");
            assert_eq!(opts.priority, 9);
            assert_eq!(opts.ledger_key("welcome"), "page:welcome");
        }

        #[test]
        fn test_outcome_serialization() {
            let json = serde_json::to_string(&RequestOutcome::NotStarted).unwrap();
            assert_eq!(json, "\"not_started\"");
            assert_eq!(RequestOutcome::UnknownClip.to_string(), "unknown_clip");
            assert!(RequestOutcome::Played.did_play());
            assert!(!RequestOutcome::Queued.did_play());
        }
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn test_default_snapshot_is_quiet() {
            let snapshot = PlaybackSnapshot::default();
            assert!(snapshot.is_quiet());
            assert!(!snapshot.is_protected_playing());
        }

        #[test]
        fn test_starting_protected_is_not_playing() {
            let snapshot = PlaybackSnapshot {
                protected: LanePhase::Starting,
                ..PlaybackSnapshot::default()
            };
            assert!(!snapshot.is_protected_playing());
            assert!(!snapshot.is_quiet());
        }
    }
}
