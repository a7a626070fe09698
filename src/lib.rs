//! Genie Voice - voice front-end for a remote intent service
//!
//! Captures one spoken utterance at a time, forwards the text to the intent
//! service (`POST /voice/process`), renders the reply into a transcript and
//! speaks it back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   utterance   ┌──────────────────────────┐   text   ┌────────────────┐
//! │ Mic + STT    │ ────────────▶ │  InteractionController   │ ───────▶ │ Intent service │
//! │ (capture)    │               │  Ready/Listening/Process │ ◀─────── │ /voice/process │
//! └──────────────┘               └────────────┬─────────────┘   reply  └────────────────┘
//!                                             │
//!                              ┌──────────────┴──────────────┐
//!                              │ transcript + status (view)  │
//!                              │ TTS + speaker (synthesis)   │
//!                              └─────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod intent;
pub mod session;
pub mod terminal;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use intent::{HttpIntentClient, IntentService, Reply};
pub use session::{
    InteractionController, Role, SessionStatus, SessionView, SpeechPreferences, StatusIndicator,
    Transcript, TranscriptEntry, Trigger,
};
pub use terminal::TerminalView;
pub use voice::{
    CaptureEvent, CaptureSettings, CloudSynthesis, MicrophoneCapture, SpeechCapture,
    SpeechRequest, SpeechSynthesis, Voice, select_voice,
};
