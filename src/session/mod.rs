//! Interaction session
//!
//! Status state machine, transcript, and the controller that ties capture,
//! the intent service and synthesis together.

mod controller;
mod status;
mod transcript;

pub use controller::{APOLOGY, InteractionController, SessionView, SpeechPreferences};
pub use status::{SessionStatus, StatusIndicator, Trigger, UNSUPPORTED_MESSAGE};
pub use transcript::{Role, Transcript, TranscriptEntry};
