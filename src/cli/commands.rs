//! Command definitions for the voicecue CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::catalog::validate_key;

// ============================================================================
// CLI Structure
// ============================================================================

/// voicecue - instructional audio playback for voice-feedback sessions
#[derive(Parser, Debug)]
#[command(
    name = "voicecue",
    version,
    about = "Instructional audio playback for voice-feedback sessions",
    long_about = "Plays the pre-rendered instructional clips of a voice-feedback session.\n\
                  Regular clips are interruptible and queued by priority; protected clips\n\
                  play to the end.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the clip assets
    #[arg(long, global = true, value_name = "DIR")]
    pub audio_dir: Option<PathBuf>,

    /// Refuse to start playback (every request reports not_started)
    #[arg(long, global = true)]
    pub mute: bool,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the clips of the catalog
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Play one clip and wait for it to finish
    Play(PlayArgs),

    /// Queue clips and play them in priority order
    Queue(QueueArgs),

    /// Report clips whose asset file is missing
    Check,

    /// Print the effective configuration as JSON
    Config,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments for the play command
#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
    /// Clip key
    #[arg(value_parser = parse_clip_key)]
    pub key: String,

    /// Play on the protected lane (cannot be interrupted)
    #[arg(short, long)]
    pub protected: bool,
}

/// Arguments for the queue command
#[derive(Args, Debug, Clone)]
pub struct QueueArgs {
    /// Clips as KEY or KEY:PRIORITY (higher plays first)
    #[arg(required = true, value_parser = parse_queue_item)]
    pub items: Vec<QueueItem>,
}

/// One clip of the queue command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub key: String,
    pub priority: Option<i32>,
}

// ============================================================================
// Validation Functions
// ============================================================================

fn parse_clip_key(s: &str) -> Result<String, String> {
    validate_key(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

/// Parses `KEY` or `KEY:PRIORITY`.
fn parse_queue_item(s: &str) -> Result<QueueItem, String> {
    let (key, priority) = match s.split_once(':') {
        Some((key, priority)) => {
            let priority = priority
                .parse::<i32>()
                .map_err(|_| format!("invalid priority: {:?}", priority))?;
            (key, Some(priority))
        }
        None => (s, None),
    };
    Ok(QueueItem {
        key: parse_clip_key(key)?,
        priority,
    })
}

// ============================================================================
// Tests
// ============================================================================
