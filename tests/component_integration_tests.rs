//! Component integration tests.
//!
//! These tests wire the session the way an application does and verify:
//! - TC-I-010..013: watchdog timeouts on both lanes
//! - TC-I-020..023: routing through the overlay and the interceptor
//! - TC-I-030..031: feedback narration across pages

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use voicecue::catalog::ClipCatalog;
use voicecue::engine::MockClipBackend;
use voicecue::flow::{FeedbackStep, HelpTopic};
use voicecue::input::{Disposition, InputEvent, Key, MockViewport, CLOSE_CONTROL_ID};
use voicecue::orchestrator::OrchestratorDriver;
use voicecue::session::PlaybackSession;
use voicecue::types::{LanePhase, PlaybackConfig, RequestOptions, RequestOutcome};

// ============================================================================
// Test Helpers
// ============================================================================

fn create_session_with_config(
    config: PlaybackConfig,
) -> (PlaybackSession, OrchestratorDriver, Arc<MockClipBackend>, Arc<MockViewport>) {
    let backend = Arc::new(MockClipBackend::new());
    let viewport = Arc::new(MockViewport::new());
    let catalog = ClipCatalog::from_config(&config).unwrap();
    let (session, driver) =
        PlaybackSession::assemble(catalog, &config, backend.clone(), viewport.clone());
    (session, driver, backend, viewport)
}

fn create_session() -> (PlaybackSession, OrchestratorDriver, Arc<MockClipBackend>, Arc<MockViewport>) {
    create_session_with_config(PlaybackConfig::default())
}

/// Advances paused time and lets the woken tasks run.
async fn advance(secs: u64) {
    tokio::time::advance(Duration::from_secs(secs)).await;
    tokio::task::yield_now().await;
}

// ============================================================================
// Watchdog
// ============================================================================

mod watchdog_integration {
    use super::*;

    /// TC-I-010: a stalled protected clip is released after the timeout.
    #[tokio::test(start_paused = true)]
    async fn tc_i_010_protected_timeout_releases_overlay() {
        let (session, mut driver, _backend, _viewport) = create_session();
        let orch = session.orchestrator().clone();
        orch.request_protected("welcome", RequestOptions::default())
            .await;
        assert!(session.overlay().is_visible());

        advance(29).await;
        driver.turn().await;
        assert!(orch.is_protected_playing());

        advance(2).await;
        driver.turn().await;
        assert!(!orch.is_protected_playing());
        assert!(session.overlay().render().is_none());
    }

    /// TC-I-011: a stalled regular clip times out and the queue advances.
    #[tokio::test(start_paused = true)]
    async fn tc_i_011_regular_timeout_drains_queue() {
        let (session, mut driver, backend, _viewport) = create_session();
        let orch = session.orchestrator().clone();
        orch.request_regular("record_instructions", RequestOptions::default())
            .await;
        orch.enqueue_regular("rating_prompt", RequestOptions::default());
        let stalled = backend.last_handle("record_instructions").unwrap();

        advance(31).await;
        driver.turn().await;

        assert!(!backend.is_active(stalled));
        assert_eq!(
            orch.snapshot().regular_clip.as_deref(),
            Some("rating_prompt")
        );
    }

    /// TC-I-012: the timeout follows the configuration.
    #[tokio::test(start_paused = true)]
    async fn tc_i_012_configured_timeout() {
        let config = PlaybackConfig::default().with_playback_timeout_secs(5);
        let (session, mut driver, _backend, _viewport) = create_session_with_config(config);
        let orch = session.orchestrator().clone();
        orch.request_protected("welcome", RequestOptions::default())
            .await;

        advance(6).await;
        driver.turn().await;

        assert_eq!(orch.protected_phase(), LanePhase::Idle);
    }

    /// TC-I-013: a start that never settles does not keep the overlay up.
    #[tokio::test(start_paused = true)]
    async fn tc_i_013_stalled_protected_start_times_out() {
        let (session, _driver, backend, _viewport) = create_session();
        let orch = session.orchestrator().clone();
        backend.hold_next_start();

        let pending = {
            let orch = orch.clone();
            tokio::spawn(async move {
                orch.request_protected("welcome", RequestOptions::default())
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(orch.protected_phase(), LanePhase::Starting);

        advance(31).await;

        assert_eq!(pending.await.unwrap(), RequestOutcome::NotStarted);
        assert_eq!(orch.protected_phase(), LanePhase::Idle);
        assert!(session.overlay().render().is_none());
        assert_eq!(
            orch.request_protected("welcome", RequestOptions::default())
                .await,
            RequestOutcome::Played
        );
        assert_eq!(backend.start_count(), 2);
    }
}

// ============================================================================
// Input routing
// ============================================================================

mod routing_integration {
    use super::*;

    /// TC-I-020: any interaction silences regular narration and reaches the page.
    #[tokio::test]
    async fn tc_i_020_interaction_silences_regular() {
        let (mut session, _driver, _backend, _viewport) = create_session();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        session.add_page_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let orch = session.orchestrator().clone();
        orch.request_regular("help_recording", RequestOptions::forced())
            .await;

        let result = session.dispatch(&InputEvent::touch().on("record-button"));

        assert_eq!(result, Disposition::Continue);
        assert!(!orch.is_playing());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    /// TC-I-021: while protected plays, only Tab reaches the page.
    #[tokio::test]
    async fn tc_i_021_overlay_blocks_page() {
        let (mut session, _driver, _backend, viewport) = create_session();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        session.add_page_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let orch = session.orchestrator().clone();
        orch.request_protected("welcome", RequestOptions::default())
            .await;
        session.overlay().sync_scroll(&orch.snapshot());
        assert!(viewport.is_suspended());

        for event in [
            InputEvent::pointer().on("record-button"),
            InputEvent::touch(),
            InputEvent::key(Key::Char('r')),
            InputEvent::key(Key::Escape),
        ] {
            assert_eq!(session.dispatch(&event), Disposition::Suppress);
        }
        assert_eq!(session.dispatch(&InputEvent::key(Key::Tab)), Disposition::Continue);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(orch.is_protected_playing());
    }

    /// TC-I-022: the close control ends protected playback and restores scroll.
    #[tokio::test]
    async fn tc_i_022_close_control() {
        let (session, _driver, backend, viewport) = create_session();
        let orch = session.orchestrator().clone();
        orch.request_protected("welcome", RequestOptions::default())
            .await;
        session.overlay().sync_scroll(&orch.snapshot());
        let welcome = backend.last_handle("welcome").unwrap();

        session.dispatch(&InputEvent::key(Key::Tab).on(CLOSE_CONTROL_ID));
        assert!(orch.is_protected_playing());

        let result = session.dispatch(&InputEvent::key(Key::Enter).on(CLOSE_CONTROL_ID));

        assert_eq!(result, Disposition::Suppress);
        assert!(!orch.is_protected_playing());
        assert!(!backend.is_active(welcome));
        assert!(!viewport.is_suspended());
        assert_eq!(viewport.restore_count(), 1);
    }

    /// TC-I-023: after protected ends, interactions silence regular again.
    #[tokio::test]
    async fn tc_i_023_interceptor_rearms_after_protected() {
        let (session, mut driver, backend, _viewport) = create_session();
        let orch = session.orchestrator().clone();
        orch.request_regular("help_rating", RequestOptions::default())
            .await;
        orch.request_protected("welcome", RequestOptions::default())
            .await;

        session.dispatch(&InputEvent::pointer());
        assert!(orch.is_playing());

        backend.complete(backend.last_handle("welcome").unwrap());
        driver.turn().await;
        session.dispatch(&InputEvent::pointer());

        assert!(!orch.is_playing());
    }
}

// ============================================================================
// Narration
// ============================================================================

mod narration_integration {
    use super::*;

    /// TC-I-030: a full page of narration.
    #[tokio::test]
    async fn tc_i_030_feedback_page() {
        let (session, mut driver, backend, _viewport) = create_session();
        let narrator = session.narrator("page-1");

        assert_eq!(narrator.announce(FeedbackStep::Welcome).await, RequestOutcome::Played);
        backend.complete(backend.last_handle("welcome").unwrap());
        driver.turn().await;

        narrator.announce(FeedbackStep::RecordInstructions).await;
        // The user presses record: narration stops, the page reacts.
        session.dispatch(&InputEvent::pointer().on("record-button"));
        narrator.announce(FeedbackStep::RecordingStarted).await;
        driver.turn().await;
        backend.complete(backend.last_handle("recording_started").unwrap());
        driver.turn().await;

        narrator.announce(FeedbackStep::RecordingStopped).await;
        narrator.announce(FeedbackStep::TranscriptionReady).await;
        narrator.announce(FeedbackStep::RatingPrompt).await;
        driver.turn().await;
        for key in ["recording_stopped", "transcription_ready", "rating_prompt"] {
            backend.complete(backend.last_handle(key).unwrap());
            driver.turn().await;
        }

        assert_eq!(
            backend.started_keys(),
            vec![
                "welcome",
                "record_instructions",
                "recording_started",
                "recording_stopped",
                "transcription_ready",
                "rating_prompt",
            ]
        );
        assert!(orch_is_quiet(&session));
    }

    /// TC-I-031: a new page narrates again, help ignores the ledger.
    #[tokio::test]
    async fn tc_i_031_pages_and_help() {
        let (session, _driver, backend, _viewport) = create_session();
        {
            let first = session.narrator("page-1");
            first.announce(FeedbackStep::Welcome).await;
            session.orchestrator().stop_protected();
            assert_eq!(first.announce(FeedbackStep::Welcome).await, RequestOutcome::Skipped);
        }

        let second = session.narrator("page-2");
        assert_eq!(second.announce(FeedbackStep::Welcome).await, RequestOutcome::Played);
        session.orchestrator().stop_protected();

        assert_eq!(second.help(HelpTopic::Recording).await, RequestOutcome::Played);
        assert_eq!(second.help(HelpTopic::Recording).await, RequestOutcome::Played);
        assert_eq!(backend.start_count(), 4);
    }

    fn orch_is_quiet(session: &PlaybackSession) -> bool {
        session.orchestrator().snapshot().is_quiet()
    }
}
