//! Speech capture and synthesis provider interfaces
//!
//! The interaction controller only sees these narrow traits, so the real
//! microphone/speaker backends can be swapped for fakes in tests.

use tokio::sync::mpsc;

use crate::Result;

/// Recognition settings for a capture provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Keep recognizing after the first utterance
    pub continuous: bool,
    /// Deliver partial transcripts while speaking
    pub interim_results: bool,
    /// Recognition locale (e.g. "en-IN")
    pub locale: String,
}

impl CaptureSettings {
    /// One final utterance per activation
    #[must_use]
    pub fn single_utterance(locale: impl Into<String>) -> Self {
        Self {
            continuous: false,
            interim_results: false,
            locale: locale.into(),
        }
    }
}

/// Callback events emitted by a capture provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Capture session began listening
    Started,
    /// A final utterance was recognized
    Utterance(String),
    /// Capture session ended (with or without a result)
    Ended,
    /// Capture session failed
    Failed(String),
}

/// Sender half used by capture providers to deliver events
pub type CaptureEventSender = mpsc::UnboundedSender<CaptureEvent>;

/// Receiver half drained by the interaction controller
pub type CaptureEventReceiver = mpsc::UnboundedReceiver<CaptureEvent>;

/// Converts live audio into a single recognized utterance per activation
pub trait SpeechCapture: Send + Sync {
    /// Whether the host can capture and recognize speech at all
    fn is_available(&self) -> bool;

    /// Begin a capture session
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be started
    fn start(&self) -> Result<()>;

    /// Stop the current capture session, if any
    fn stop(&self);
}

/// A voice offered by a synthesis provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Provider voice identifier
    pub name: String,
    /// BCP 47 language tag (e.g. "en-US")
    pub lang: String,
}

impl Voice {
    /// Create a voice entry
    #[must_use]
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// A single request to speak text
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    /// Text to speak
    pub text: String,
    /// Rate multiplier (1.0 = normal)
    pub rate: f32,
    /// Pitch multiplier (1.0 = normal)
    pub pitch: f32,
    /// Voice to use, `None` for the provider default
    pub voice: Option<Voice>,
}

/// Renders text to audible speech
pub trait SpeechSynthesis: Send + Sync {
    /// Whether the host can synthesize speech at all
    fn is_available(&self) -> bool;

    /// Voices the provider can speak with
    fn voices(&self) -> Vec<Voice>;

    /// Speak without waiting for playback to finish
    fn speak(&self, request: SpeechRequest);
}

/// Pick a voice: first whose language starts with `prefix`, else the first one
#[must_use]
pub fn select_voice<'a>(voices: &'a [Voice], prefix: &str) -> Option<&'a Voice> {
    voices
        .iter()
        .find(|v| v.lang.starts_with(prefix))
        .or_else(|| voices.first())
}
