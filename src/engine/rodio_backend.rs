//! Audio backend using rodio.
//!
//! The rodio output stream is owned by a dedicated audio thread. The backend
//! forwards commands to it over a crossbeam channel; the thread answers start
//! requests through a oneshot and polls its voices for completion.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::PlaybackError;
use super::signal::{EndCause, EngineSignal, HandleId, SignalSender};
use super::{ClipBackend, StartOutcome, StartTicket};
use crate::catalog::ClipDescriptor;

enum AudioCommand {
    Start {
        handle: HandleId,
        key: String,
        locator: PathBuf,
        signals: SignalSender,
        reply: oneshot::Sender<StartOutcome>,
    },
    Stop(HandleId),
    Shutdown,
}

/// Backend that plays clips through the default output device.
pub struct RodioBackend {
    commands: Sender<AudioCommand>,
    muted: AtomicBool,
}

impl RodioBackend {
    /// Spawns the audio thread.
    ///
    /// A missing output device is not an error here: the thread keeps
    /// running and answers every start with `StartOutcome::Blocked`.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::ThreadGone` if the thread cannot be spawned.
    pub fn spawn(poll_interval: Duration, muted: bool) -> Result<Self, PlaybackError> {
        let (commands, rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("voicecue-audio".to_string())
            .spawn(move || audio_thread(rx, poll_interval))
            .map_err(|_| PlaybackError::ThreadGone)?;

        Ok(Self {
            commands,
            muted: AtomicBool::new(muted),
        })
    }
}

impl ClipBackend for RodioBackend {
    fn start(&self, handle: HandleId, clip: &ClipDescriptor, signals: &SignalSender) -> StartTicket {
        let (reply, ticket) = oneshot::channel();
        if self.muted.load(Ordering::Relaxed) {
            let _ = reply.send(StartOutcome::Blocked("playback muted".to_string()));
            return ticket;
        }

        let command = AudioCommand::Start {
            handle,
            key: clip.key.clone(),
            locator: clip.locator.clone(),
            signals: signals.clone(),
            reply,
        };
        if let Err(err) = self.commands.send(command) {
            if let AudioCommand::Start { reply, .. } = err.into_inner() {
                let _ = reply.send(PlaybackError::ThreadGone.into());
            }
        }
        ticket
    }

    fn stop(&self, handle: HandleId) {
        let _ = self.commands.send(AudioCommand::Stop(handle));
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
        debug!(muted, "Audio backend mute changed");
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        let _ = self.commands.send(AudioCommand::Shutdown);
    }
}

impl std::fmt::Debug for RodioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioBackend")
            .field("muted", &self.muted.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Creates a rodio backend, returning None if the audio thread cannot start.
#[must_use]
pub fn try_create_backend(poll_interval: Duration, muted: bool) -> Option<Arc<RodioBackend>> {
    match RodioBackend::spawn(poll_interval, muted) {
        Ok(backend) => Some(Arc::new(backend)),
        Err(e) => {
            warn!("Audio not available, playback disabled: {}", e);
            None
        }
    }
}

struct Voice {
    sink: Sink,
    key: String,
    total: Option<Duration>,
    signals: SignalSender,
}

impl Voice {
    fn completion(&self) -> Option<EndCause> {
        completion_cause(self.sink.empty(), self.sink.get_pos(), self.total)
    }
}

/// Decides whether a voice has finished.
///
/// Decoders report the duration of the audible content, but a sink can still
/// hold trailing frames (MP3 encoder padding, resampler tail) once its
/// position has passed it. Reaching the reported duration counts as
/// completion so the lane is not held by silence.
fn completion_cause(empty: bool, position: Duration, total: Option<Duration>) -> Option<EndCause> {
    if empty {
        return Some(EndCause::Natural);
    }
    match total {
        Some(total) if position >= total => Some(EndCause::FinalPosition),
        _ => None,
    }
}

fn audio_thread(commands: Receiver<AudioCommand>, poll_interval: Duration) {
    let output = match OutputStream::try_default() {
        Ok(pair) => {
            debug!("Audio output stream initialized");
            Some(pair)
        }
        Err(e) => {
            warn!("No audio output device, clips will be blocked: {}", e);
            None
        }
    };
    let mut voices: HashMap<HandleId, Voice> = HashMap::new();

    loop {
        match commands.recv_timeout(poll_interval) {
            Ok(AudioCommand::Start {
                handle,
                key,
                locator,
                signals,
                reply,
            }) => {
                let outcome = match &output {
                    None => StartOutcome::Blocked("no audio output device".to_string()),
                    Some((_stream, stream_handle)) => match open_voice(stream_handle, &locator) {
                        Ok((sink, total)) => {
                            voices.insert(
                                handle,
                                Voice {
                                    sink,
                                    key,
                                    total,
                                    signals,
                                },
                            );
                            StartOutcome::Started
                        }
                        Err(e) => e.into(),
                    },
                };
                if reply.send(outcome).is_err() {
                    // Requester went away; nobody will ever stop this voice.
                    if let Some(voice) = voices.remove(&handle) {
                        voice.sink.stop();
                    }
                }
            }
            Ok(AudioCommand::Stop(handle)) => {
                if let Some(voice) = voices.remove(&handle) {
                    voice.sink.stop();
                    debug!(handle = %handle, key = %voice.key, "Voice stopped");
                }
            }
            Ok(AudioCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        voices.retain(|handle, voice| match voice.completion() {
            Some(cause) => {
                debug!(handle = %handle, key = %voice.key, ?cause, "Voice finished");
                let _ = voice
                    .signals
                    .send(EngineSignal::ended(*handle, voice.key.clone(), cause));
                false
            }
            None => true,
        });
    }

    for voice in voices.into_values() {
        voice.sink.stop();
    }
    debug!("Audio thread exited");
}

fn open_voice(
    stream: &OutputStreamHandle,
    locator: &Path,
) -> Result<(Sink, Option<Duration>), PlaybackError> {
    let file = File::open(locator)
        .map_err(|e| PlaybackError::AssetNotFound(format!("{}: {}", locator.display(), e)))?;
    let decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| PlaybackError::DecodeError(e.to_string()))?;
    let total = decoder.total_duration();

    let sink = Sink::try_new(stream).map_err(|e| PlaybackError::StreamError(e.to_string()))?;
    sink.append(decoder);
    Ok((sink, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests run without audio hardware: a missing device makes the
    // thread answer `Blocked`, a present one fails on the missing file.

    fn clip(locator: &str) -> ClipDescriptor {
        ClipDescriptor {
            key: "missing".to_string(),
            locator: PathBuf::from(locator),
            text: String::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_asset_never_starts() {
        let Ok(backend) = RodioBackend::spawn(Duration::from_millis(10), false) else {
            return;
        };
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        let outcome = backend
            .start(HandleId(1), &clip("/nonexistent/missing.mp3"), &tx)
            .await
            .unwrap();
        assert_ne!(outcome, StartOutcome::Started);
    }

    #[tokio::test]
    async fn test_muted_backend_blocks() {
        let Ok(backend) = RodioBackend::spawn(Duration::from_millis(10), true) else {
            return;
        };
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        assert!(backend.is_muted());
        let outcome = backend
            .start(HandleId(1), &clip("/nonexistent/missing.mp3"), &tx)
            .await
            .unwrap();
        assert!(matches!(outcome, StartOutcome::Blocked(_)));
    }

    #[test]
    fn test_stop_unknown_handle_is_noop() {
        let Ok(backend) = RodioBackend::spawn(Duration::from_millis(10), false) else {
            return;
        };
        backend.stop(HandleId(99));
        backend.set_muted(true);
        assert!(backend.is_muted());
    }

    mod completion_tests {
        use super::*;

        const TOTAL: Duration = Duration::from_millis(2_400);

        #[test]
        fn test_empty_sink_is_natural_end() {
            assert_eq!(
                completion_cause(true, Duration::ZERO, None),
                Some(EndCause::Natural)
            );
            assert_eq!(
                completion_cause(true, Duration::from_secs(1), Some(TOTAL)),
                Some(EndCause::Natural)
            );
        }

        #[test]
        fn test_position_at_total_is_final_position() {
            assert_eq!(
                completion_cause(false, TOTAL, Some(TOTAL)),
                Some(EndCause::FinalPosition)
            );
            assert_eq!(
                completion_cause(false, TOTAL + Duration::from_millis(30), Some(TOTAL)),
                Some(EndCause::FinalPosition)
            );
        }

        #[test]
        fn test_still_playing() {
            assert_eq!(
                completion_cause(false, Duration::from_millis(2_399), Some(TOTAL)),
                None
            );
            // Streams without a known duration end only when drained.
            assert_eq!(completion_cause(false, Duration::from_secs(600), None), None);
        }
    }

    #[test]
    fn test_debug_impl() {
        let Ok(backend) = RodioBackend::spawn(Duration::from_millis(10), false) else {
            return;
        };
        assert!(format!("{:?}", backend).contains("RodioBackend"));
    }
}
