//! Display utilities for the voicecue CLI.
//!
//! This module provides formatted output for:
//! - The clip listing
//! - Request outcomes
//! - Asset checks
//! - Error messages

use crate::catalog::{ClipCatalog, ClipDescriptor};
use crate::types::{PlaybackConfig, RequestOutcome};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the clip catalog as a table.
    pub fn show_clips(catalog: &ClipCatalog) {
        let width = catalog.iter().map(|c| c.key.len()).max().unwrap_or(0);
        for clip in catalog.iter() {
            println!("{:<width$}  {}", clip.key, Self::excerpt(&clip.text, 60), width = width);
        }
        println!("{} clips", catalog.len());
    }

    /// Shows the clip catalog as JSON.
    pub fn show_clips_json(catalog: &ClipCatalog) -> serde_json::Result<()> {
        let clips: Vec<&ClipDescriptor> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&clips)?);
        Ok(())
    }

    /// Shows the outcome of one request.
    pub fn show_outcome(key: &str, outcome: RequestOutcome) {
        println!("{} {}: {}", Self::outcome_marker(outcome), key, Self::describe(outcome));
    }

    /// Shows the keys in the order they were started.
    pub fn show_play_order(keys: &[String]) {
        if keys.is_empty() {
            println!("Nothing played");
        } else {
            println!("Played: {}", keys.join(", "));
        }
    }

    /// Shows the result of an asset check.
    pub fn show_check(missing: &[&ClipDescriptor], total: usize) {
        for clip in missing {
            println!("missing  {}  {}", clip.key, clip.locator.display());
        }
        if missing.is_empty() {
            println!("* All {} clip assets found", total);
        } else {
            println!("{} of {} clip assets missing", missing.len(), total);
        }
    }

    /// Shows the effective configuration.
    pub fn show_config(config: &PlaybackConfig) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(config)?);
        Ok(())
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    fn outcome_marker(outcome: RequestOutcome) -> &'static str {
        match outcome {
            RequestOutcome::Played => ">",
            RequestOutcome::Queued => "+",
            RequestOutcome::Skipped | RequestOutcome::Superseded => "-",
            _ => "!",
        }
    }

    fn describe(outcome: RequestOutcome) -> &'static str {
        match outcome {
            RequestOutcome::Played => "playing",
            RequestOutcome::Queued => "queued",
            RequestOutcome::Skipped => "already played",
            RequestOutcome::Refused => "refused, protected playback is active",
            RequestOutcome::NotStarted => "not started (no output device, muted, or missing asset)",
            RequestOutcome::Superseded => "replaced by a newer request",
            RequestOutcome::Disabled => "playback is disabled",
            RequestOutcome::UnknownClip => "unknown clip",
        }
    }

    /// Shortens `text` to at most `max` characters.
    fn excerpt(text: &str, max: usize) -> String {
        if text.chars().count() <= max {
            return text.to_string();
        }
        let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
        short.push_str("...");
        short
    }
}

// ============================================================================
// Tests
// ============================================================================
