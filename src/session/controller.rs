//! Interaction controller
//!
//! Drives one voice session: reacts to capture events and typed input,
//! forwards text to the intent service, records the exchange in the
//! transcript and speaks replies. Every failure is turned into transcript or
//! log output here; nothing propagates to the caller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use super::status::{SessionStatus, StatusIndicator, Trigger};
use super::transcript::{Role, Transcript, TranscriptEntry};
use crate::config::{Config, DEFAULT_PITCH, DEFAULT_RATE, DEFAULT_VOICE_PREFIX};
use crate::intent::IntentService;
use crate::voice::{
    CaptureEvent, CaptureEventReceiver, SpeechCapture, SpeechRequest, SpeechSynthesis,
    select_voice,
};

/// Spoken when the intent service cannot be reached
pub const APOLOGY: &str = "Sorry, the backend is not available. Please start the server.";

/// Presentation surface for a session
///
/// Every callback runs while the controller holds its state lock and must not
/// call back into the controller.
pub trait SessionView: Send + Sync {
    /// Displayed status indicator changed
    fn status_changed(&self, indicator: StatusIndicator);

    /// A transcript entry was appended
    fn entry_appended(&self, entry: &TranscriptEntry);

    /// Capture control switched between active and inactive
    fn capture_active(&self, active: bool);

    /// Capture control is disabled for the rest of the session
    fn capture_disabled(&self);
}

/// How replies are spoken
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechPreferences {
    /// Preferred voice language prefix
    pub voice_prefix: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for SpeechPreferences {
    fn default() -> Self {
        Self {
            voice_prefix: DEFAULT_VOICE_PREFIX.to_string(),
            rate: DEFAULT_RATE,
            pitch: DEFAULT_PITCH,
        }
    }
}

impl SpeechPreferences {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            voice_prefix: config.speech.voice_prefix.clone(),
            rate: config.speech.rate,
            pitch: config.speech.pitch,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    status: SessionStatus,
    indicator: StatusIndicator,
    listening: bool,
    capture_enabled: bool,
}

struct Inner {
    capture: Arc<dyn SpeechCapture>,
    synthesis: Arc<dyn SpeechSynthesis>,
    intent: Arc<dyn IntentService>,
    view: Arc<dyn SessionView>,
    speech: SpeechPreferences,
    transcript: Transcript,
    state: Mutex<SessionState>,
}

/// Owns session state and coordinates the collaborators
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct InteractionController {
    inner: Arc<Inner>,
}

impl InteractionController {
    /// Create a controller and run the one-time capture capability check
    ///
    /// If the capture provider is unavailable the indicator shows the
    /// unsupported message and capture stays disabled for the whole session.
    pub fn new(
        capture: Arc<dyn SpeechCapture>,
        synthesis: Arc<dyn SpeechSynthesis>,
        intent: Arc<dyn IntentService>,
        view: Arc<dyn SessionView>,
        speech: SpeechPreferences,
    ) -> Self {
        let capture_enabled = capture.is_available();
        let indicator = if capture_enabled {
            StatusIndicator::default()
        } else {
            tracing::warn!("speech recognition unavailable, voice capture disabled");
            StatusIndicator::Unsupported
        };

        let controller = Self {
            inner: Arc::new(Inner {
                capture,
                synthesis,
                intent,
                view,
                speech,
                transcript: Transcript::new(),
                state: Mutex::new(SessionState {
                    status: SessionStatus::Ready,
                    indicator,
                    listening: false,
                    capture_enabled,
                }),
            }),
        };

        {
            let _state = controller.lock_state();
            if !capture_enabled {
                controller.inner.view.capture_disabled();
            }
            controller.inner.view.status_changed(indicator);
        }

        controller
    }

    /// Current session status
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.lock_state().status
    }

    /// What the status indicator currently displays
    #[must_use]
    pub fn indicator(&self) -> StatusIndicator {
        self.lock_state().indicator
    }

    /// Whether a capture session is active
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.lock_state().listening
    }

    /// Whether capture passed the startup capability check
    #[must_use]
    pub fn capture_enabled(&self) -> bool {
        self.lock_state().capture_enabled
    }

    /// Copy of the transcript so far
    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.transcript.snapshot()
    }

    /// Submit text to the intent service and record the exchange
    ///
    /// Blank input is ignored. Completes once the reply (or failure) has been
    /// recorded and handed to synthesis.
    pub async fn submit_text(&self, text: &str) {
        if let Some(text) = self.accept_submission(text) {
            self.complete_submission(&text).await;
        }
    }

    /// Start capture if idle, stop it if listening
    pub fn toggle_capture(&self) {
        let Some(listening) = self.capture_listening() else {
            return;
        };

        if listening {
            self.inner.capture.stop();
        } else {
            self.start_capture();
        }
    }

    /// Press-and-hold: start capture unless already listening
    pub fn begin_capture(&self) {
        if self.capture_listening() == Some(false) {
            self.start_capture();
        }
    }

    /// Press-and-hold release: stop capture if listening
    pub fn end_capture(&self) {
        if self.capture_listening() == Some(true) {
            self.inner.capture.stop();
        }
    }

    /// React to one event from the capture provider
    pub async fn handle_capture_event(&self, event: CaptureEvent) {
        match event {
            CaptureEvent::Utterance(text) => self.submit_text(&text).await,
            other => self.apply_capture_event(&other),
        }
    }

    /// Drain capture events for the rest of the session
    ///
    /// The user entry and status change for an utterance happen before the
    /// next event is read; the request itself runs on its own task so the
    /// capture end is never held up by the intent service.
    pub fn spawn_capture_pump(&self, mut events: CaptureEventReceiver) -> JoinHandle<()> {
        let controller = self.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    CaptureEvent::Utterance(text) => {
                        if let Some(text) = controller.accept_submission(&text) {
                            let cycle = controller.clone();
                            tokio::spawn(async move { cycle.complete_submission(&text).await });
                        }
                    }
                    other => controller.apply_capture_event(&other),
                }
            }
            tracing::debug!("capture event channel closed");
        })
    }

    /// Record the user entry and enter Processing, or reject blank input
    fn accept_submission(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            tracing::debug!("ignoring blank submission");
            return None;
        }

        self.append(Role::User, trimmed);
        self.transition(Trigger::Submitted);
        Some(trimmed.to_string())
    }

    async fn complete_submission(&self, text: &str) {
        match self.inner.intent.process(text).await {
            Ok(reply) => {
                self.append(Role::Assistant, reply.message.clone());
                self.speak(reply.message);
                self.transition(Trigger::ReplyReceived);
            }
            Err(e) => {
                tracing::error!(error = %e, endpoint = self.inner.intent.endpoint(), "intent request failed");
                self.append(
                    Role::Assistant,
                    format!(
                        "Error: {e}. Make sure the backend is running on {}",
                        self.inner.intent.endpoint()
                    ),
                );
                self.speak(APOLOGY.to_string());
                self.transition(Trigger::RequestFailed);
            }
        }
    }

    fn apply_capture_event(&self, event: &CaptureEvent) {
        match event {
            CaptureEvent::Started => {
                let mut state = self.lock_state();
                state.listening = true;
                self.inner.view.capture_active(true);
                self.transition_locked(&mut state, Trigger::CaptureStarted);
            }
            CaptureEvent::Ended => self.capture_finished(),
            CaptureEvent::Failed(reason) => {
                tracing::warn!(reason = %reason, "speech capture failed");
                self.capture_finished();
            }
            CaptureEvent::Utterance(_) => {}
        }
    }

    fn capture_finished(&self) {
        let mut state = self.lock_state();
        state.listening = false;
        self.inner.view.capture_active(false);

        // A reply cycle may already own the indicator
        if state.indicator.shows_listening() {
            self.transition_locked(&mut state, Trigger::CaptureEnded);
        }
    }

    fn start_capture(&self) {
        if let Err(e) = self.inner.capture.start() {
            tracing::warn!(error = %e, "failed to start speech capture");
        }
    }

    /// Listening flag, or `None` when capture is disabled
    fn capture_listening(&self) -> Option<bool> {
        let state = self.lock_state();
        state.capture_enabled.then_some(state.listening)
    }

    fn speak(&self, text: String) {
        let synthesis = &self.inner.synthesis;
        if !synthesis.is_available() {
            tracing::debug!("speech synthesis unavailable, not speaking");
            return;
        }

        let voices = synthesis.voices();
        let voice = select_voice(&voices, &self.inner.speech.voice_prefix).cloned();

        synthesis.speak(SpeechRequest {
            text,
            rate: self.inner.speech.rate,
            pitch: self.inner.speech.pitch,
            voice,
        });
    }

    fn append(&self, role: Role, content: impl Into<String>) {
        // Under the state lock so the view sees entries in transcript order
        let _state = self.lock_state();
        let entry = self.inner.transcript.append(role, content);
        self.inner.view.entry_appended(&entry);
    }

    fn transition(&self, trigger: Trigger) {
        let mut state = self.lock_state();
        self.transition_locked(&mut state, trigger);
    }

    fn transition_locked(&self, state: &mut SessionState, trigger: Trigger) {
        let next = state.status.on(trigger);
        tracing::debug!(from = ?state.status, to = ?next, ?trigger, "session transition");

        state.status = next;
        state.indicator = StatusIndicator::Session(next);
        self.inner.view.status_changed(state.indicator);
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
