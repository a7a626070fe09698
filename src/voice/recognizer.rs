//! Microphone speech recognizer
//!
//! One activation records a single utterance from the default input device,
//! transcribes it and reports the result as capture events.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use super::capture::{AudioCapture, SAMPLE_RATE, input_device_available, samples_to_wav};
use super::endpoint::UtteranceDetector;
use super::provider::{CaptureEvent, CaptureEventSender, CaptureSettings, SpeechCapture};
use super::stt::SpeechToText;
use crate::config::Config;
use crate::{Error, Result};

/// Longest wait for microphone audio before re-checking stop and timeouts
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Samples per detector frame (100 ms at 16 kHz)
const FRAME_SAMPLES: usize = SAMPLE_RATE as usize / 10;

/// Records and transcribes one utterance per activation
pub struct MicrophoneCapture {
    shared: Arc<Shared>,
    available: bool,
}

struct Shared {
    stt: Option<SpeechToText>,
    settings: CaptureSettings,
    no_speech_timeout: Duration,
    max_utterance: Duration,
    events: CaptureEventSender,
    active: AtomicBool,
    stop_requested: AtomicBool,
    receiver_gone: AtomicBool,
    runtime: Option<Handle>,
}

impl MicrophoneCapture {
    /// Build the recognizer from configuration
    ///
    /// Must be called from within a tokio runtime; without one, or without an
    /// input device or STT credentials, the recognizer reports unavailable.
    #[must_use]
    pub fn from_config(config: &Config, events: CaptureEventSender) -> Self {
        let stt = if config.capture.enabled {
            SpeechToText::from_config(config)
                .inspect_err(|e| tracing::warn!(error = %e, "speech recognition disabled"))
                .ok()
        } else {
            None
        };

        let runtime = Handle::try_current().ok();
        let available = stt.is_some() && runtime.is_some() && input_device_available();

        tracing::debug!(
            available,
            locale = %config.capture.locale,
            backend = ?config.capture.stt_backend,
            "microphone recognizer initialized"
        );

        Self {
            shared: Arc::new(Shared {
                stt,
                settings: config.capture_settings(),
                no_speech_timeout: config.capture.no_speech_timeout,
                max_utterance: config.capture.max_utterance,
                events,
                active: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                receiver_gone: AtomicBool::new(false),
                runtime,
            }),
            available,
        }
    }

    /// Recognition settings in effect
    #[must_use]
    pub fn settings(&self) -> &CaptureSettings {
        &self.shared.settings
    }
}

impl SpeechCapture for MicrophoneCapture {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&self) -> Result<()> {
        let runtime = match &self.shared.runtime {
            Some(runtime) if self.available => runtime.clone(),
            _ => return Err(Error::Capture("speech recognition unavailable".to_string())),
        };

        if self.shared.active.swap(true, Ordering::SeqCst) {
            tracing::debug!("capture already active");
            return Ok(());
        }

        self.shared.stop_requested.store(false, Ordering::SeqCst);
        self.shared.emit(CaptureEvent::Started);

        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            let recorder = Arc::clone(&shared);
            let recorded = tokio::task::spawn_blocking(move || {
                record_utterance(
                    &recorder.stop_requested,
                    recorder.no_speech_timeout,
                    recorder.max_utterance,
                )
            })
            .await
            .map_err(|e| Error::Capture(format!("recording task failed: {e}")))
            .and_then(|r| r);

            let outcome = match recorded {
                Ok(samples) if samples.is_empty() => {
                    tracing::debug!("capture ended without speech");
                    Ok(None)
                }
                Ok(samples) => shared.transcribe(&samples).await.map(Some),
                Err(e) => Err(e),
            };

            shared.active.store(false, Ordering::SeqCst);

            if let Err(e) = &outcome {
                tracing::warn!(error = %e, "capture failed");
            }
            for event in closing_events(outcome) {
                shared.emit(event);
            }
        });

        Ok(())
    }

    fn stop(&self) {
        if self.shared.active.load(Ordering::SeqCst) {
            tracing::debug!("capture stop requested");
            self.shared.stop_requested.store(true, Ordering::SeqCst);
        }
    }
}

impl Shared {
    /// Deliver an event, noting once if nobody is listening anymore
    fn emit(&self, event: CaptureEvent) {
        if self.events.send(event).is_err() && !self.receiver_gone.swap(true, Ordering::SeqCst) {
            tracing::debug!("capture event receiver closed, dropping events");
        }
    }

    async fn transcribe(&self, samples: &[f32]) -> Result<String> {
        let stt = self
            .stt
            .as_ref()
            .ok_or_else(|| Error::Stt("no STT backend configured".to_string()))?;
        let wav = samples_to_wav(samples, SAMPLE_RATE)?;
        stt.transcribe(&wav).await
    }
}

/// Events that close one activation, in delivery order
///
/// At most one non-blank utterance, or the failure, and always `Ended` last.
fn closing_events(outcome: Result<Option<String>>) -> Vec<CaptureEvent> {
    let mut events = match outcome {
        Ok(Some(transcript)) if !transcript.trim().is_empty() => {
            vec![CaptureEvent::Utterance(transcript)]
        }
        Ok(_) => Vec::new(),
        Err(e) => vec![CaptureEvent::Failed(e.to_string())],
    };
    events.push(CaptureEvent::Ended);
    events
}

/// Record from the microphone until one utterance is complete
///
/// Returns an empty buffer when nothing was said before stopping.
fn record_utterance(
    stop: &AtomicBool,
    no_speech_timeout: Duration,
    max_utterance: Duration,
) -> Result<Vec<f32>> {
    let capture = AudioCapture::open()?;

    let mut detector = UtteranceDetector::new();
    let mut frame = Vec::with_capacity(FRAME_SAMPLES);
    let started = Instant::now();

    'listen: loop {
        if let Some(chunk) = capture.next_chunk(POLL_INTERVAL) {
            frame.extend_from_slice(&chunk);
        }

        // Device callbacks are small; judge energy over whole frames
        while frame.len() >= FRAME_SAMPLES {
            let rest = frame.split_off(FRAME_SAMPLES);
            let complete = detector.process(&frame);
            frame = rest;
            if complete {
                break 'listen;
            }
        }

        if stop.load(Ordering::SeqCst) {
            tracing::debug!("capture stopped by user");
            break;
        }

        let elapsed = started.elapsed();
        if !detector.heard_speech() && elapsed > no_speech_timeout {
            tracing::debug!(?elapsed, "no speech detected");
            break;
        }
        if elapsed > max_utterance {
            tracing::debug!(?elapsed, "utterance length limit reached");
            break;
        }
    }

    drop(capture);

    if detector.heard_speech() {
        Ok(detector.take_speech_buffer())
    } else {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::file::GenieConfigFile;

    #[tokio::test]
    async fn test_unavailable_without_credentials() {
        let config = Config::from_sources(GenieConfigFile::default(), |_| None, None, false).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let capture = MicrophoneCapture::from_config(&config, tx);
        assert!(!capture.is_available());
        assert_eq!(capture.settings().locale, "en-IN");
        assert!(!capture.settings().continuous);

        assert!(matches!(capture.start(), Err(Error::Capture(_))));
        capture.stop();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_transcript_then_end() {
        assert_eq!(
            closing_events(Ok(Some("order paracetamol".to_string()))),
            vec![
                CaptureEvent::Utterance("order paracetamol".to_string()),
                CaptureEvent::Ended,
            ]
        );
    }

    #[test]
    fn test_silence_only_ends() {
        assert_eq!(closing_events(Ok(None)), vec![CaptureEvent::Ended]);
        assert_eq!(
            closing_events(Ok(Some(" \n\t".to_string()))),
            vec![CaptureEvent::Ended]
        );
    }

    #[test]
    fn test_failure_precedes_end() {
        let events = closing_events(Err(Error::Stt("Whisper API error 401".to_string())));

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], CaptureEvent::Failed(reason) if reason.contains("401")));
        assert_eq!(events[1], CaptureEvent::Ended);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_tolerated() {
        let config = Config::from_sources(GenieConfigFile::default(), |_| None, None, false).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let capture = MicrophoneCapture::from_config(&config, tx);
        drop(rx);

        capture.shared.emit(CaptureEvent::Started);
        capture.shared.emit(CaptureEvent::Ended);
        assert!(capture.shared.receiver_gone.load(Ordering::SeqCst));
    }
}
