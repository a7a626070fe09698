//! Voice processing module
//!
//! Speech capture (microphone, endpointing, STT) and speech synthesis
//! (TTS, playback) behind the provider traits the session controller uses.

mod capture;
mod endpoint;
mod playback;
mod provider;
mod recognizer;
mod stt;
mod synthesizer;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, input_device_available, samples_to_wav};
pub use endpoint::{DetectorState, UtteranceDetector, calculate_energy};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3, output_device_available};
pub use provider::{
    CaptureEvent, CaptureEventReceiver, CaptureEventSender, CaptureSettings, SpeechCapture,
    SpeechRequest, SpeechSynthesis, Voice, select_voice,
};
pub use recognizer::MicrophoneCapture;
pub use stt::SpeechToText;
pub use synthesizer::CloudSynthesis;
pub use tts::TextToSpeech;
