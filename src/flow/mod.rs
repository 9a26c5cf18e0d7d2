//! Feedback flow narration.
//!
//! Maps the steps of the voice-feedback flow to catalog clips and to the
//! lane each one is delivered on: the welcome plays protected once per
//! page, status confirmations are queued, instructions and help interrupt.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::orchestrator::{Orchestrator, PlaybackScope};
use crate::types::{RequestOptions, RequestOutcome};

// ============================================================================
// FeedbackStep
// ============================================================================

/// How a clip reaches the speakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Protected lane, blocks interaction
    Protected,
    /// Regular lane, replaces whatever is playing
    Immediate,
    /// Regular lane, waits its turn at the given priority
    Queued(i32),
}

/// Steps of the feedback flow that have narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackStep {
    Welcome,
    RecordInstructions,
    RecordingStarted,
    RecordingStopped,
    TranscriptionReady,
    RatingPrompt,
    ThankYou,
    Error,
}

impl FeedbackStep {
    /// All steps in flow order.
    pub const ALL: [FeedbackStep; 8] = [
        FeedbackStep::Welcome,
        FeedbackStep::RecordInstructions,
        FeedbackStep::RecordingStarted,
        FeedbackStep::RecordingStopped,
        FeedbackStep::TranscriptionReady,
        FeedbackStep::RatingPrompt,
        FeedbackStep::ThankYou,
        FeedbackStep::Error,
    ];

    /// Catalog key of the step's clip.
    pub fn clip_key(&self) -> &'static str {
        match self {
            FeedbackStep::Welcome => "welcome",
            FeedbackStep::RecordInstructions => "record_instructions",
            FeedbackStep::RecordingStarted => "recording_started",
            FeedbackStep::RecordingStopped => "recording_stopped",
            FeedbackStep::TranscriptionReady => "transcription_ready",
            FeedbackStep::RatingPrompt => "rating_prompt",
            FeedbackStep::ThankYou => "thank_you",
            FeedbackStep::Error => "error_retry",
        }
    }

    /// Lane and priority of the step's clip.
    pub fn delivery(&self) -> Delivery {
        match self {
            FeedbackStep::Welcome => Delivery::Protected,
            FeedbackStep::RecordInstructions | FeedbackStep::Error => Delivery::Immediate,
            FeedbackStep::RecordingStarted | FeedbackStep::RecordingStopped => Delivery::Queued(8),
            FeedbackStep::TranscriptionReady => Delivery::Queued(6),
            FeedbackStep::RatingPrompt => Delivery::Queued(5),
            FeedbackStep::ThankYou => Delivery::Queued(7),
        }
    }

    /// Returns true if the step may repeat within one page.
    pub fn repeats(&self) -> bool {
        matches!(self, FeedbackStep::Error)
    }
}

impl fmt::Display for FeedbackStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.clip_key())
    }
}

// ============================================================================
// HelpTopic
// ============================================================================

/// Topics behind the help buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Recording,
    Rating,
}

impl HelpTopic {
    pub fn clip_key(&self) -> &'static str {
        match self {
            HelpTopic::Recording => "help_recording",
            HelpTopic::Rating => "help_rating",
        }
    }
}

impl FromStr for HelpTopic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recording" => Ok(HelpTopic::Recording),
            "rating" => Ok(HelpTopic::Rating),
            other => Err(format!("unknown help topic: {}", other)),
        }
    }
}

// ============================================================================
// FeedbackNarrator
// ============================================================================

/// Narrates one feedback page.
#[derive(Debug)]
pub struct FeedbackNarrator {
    orchestrator: Orchestrator,
    scope: PlaybackScope,
}

impl FeedbackNarrator {
    /// Creates a narrator whose de-dup scope is `page_id`.
    pub fn new(orchestrator: &Orchestrator, page_id: impl Into<String>) -> Self {
        Self {
            orchestrator: orchestrator.clone(),
            scope: PlaybackScope::new(orchestrator, page_id),
        }
    }

    /// Plays the clip for `step`.
    pub async fn announce(&self, step: FeedbackStep) -> RequestOutcome {
        let key = step.clip_key();
        let outcome = if step.repeats() {
            self.orchestrator
                .request_regular(key, RequestOptions::forced())
                .await
        } else {
            match step.delivery() {
                Delivery::Protected => self.scope.request_protected(key).await,
                Delivery::Immediate => {
                    self.scope
                        .request_regular(key, RequestOptions::default().priority)
                        .await
                }
                Delivery::Queued(priority) => self.scope.enqueue(key, priority),
            }
        };
        debug!(step = %step, outcome = %outcome, "Narrated feedback step");
        outcome
    }

    /// Help button: always plays now, even if heard before.
    pub async fn help(&self, topic: HelpTopic) -> RequestOutcome {
        self.orchestrator
            .request_regular(topic.clip_key(), RequestOptions::forced())
            .await
    }

    /// Starts a fresh page: every step may narrate again.
    pub fn reset(&self) {
        self.scope.reset();
    }

    /// Returns the page scope.
    pub fn scope(&self) -> &PlaybackScope {
        &self.scope
    }
}
