//! Session status and the displayed status indicator

use std::fmt;

/// Indicator text shown when the host cannot recognize speech
pub const UNSUPPORTED_MESSAGE: &str = "Speech recognition not supported on this host.";

/// Coarse state of the interaction session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Idle, waiting for input
    #[default]
    Ready,
    /// Capture session active
    Listening,
    /// Waiting on the intent service
    Processing,
}

/// Events that move the session between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Capture provider began listening
    CaptureStarted,
    /// Text was submitted to the intent service
    Submitted,
    /// Capture session ended or failed
    CaptureEnded,
    /// Intent service replied
    ReplyReceived,
    /// Intent request failed
    RequestFailed,
}

impl SessionStatus {
    /// Status after `trigger`
    #[must_use]
    pub const fn on(self, trigger: Trigger) -> Self {
        match (self, trigger) {
            (_, Trigger::CaptureStarted) => Self::Listening,
            (_, Trigger::Submitted) => Self::Processing,
            (Self::Listening, Trigger::CaptureEnded) => Self::Ready,
            (status, Trigger::CaptureEnded) => status,
            (_, Trigger::ReplyReceived | Trigger::RequestFailed) => Self::Ready,
        }
    }

    /// Label shown to the user
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Listening => "Listening...",
            Self::Processing => "Processing...",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the status indicator currently displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    /// Projection of the session status
    Session(SessionStatus),
    /// Fixed message when speech recognition is unavailable
    Unsupported,
}

impl StatusIndicator {
    /// Displayed text
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Session(status) => status.label(),
            Self::Unsupported => UNSUPPORTED_MESSAGE,
        }
    }

    /// Whether the indicator shows the listening label
    #[must_use]
    pub const fn shows_listening(self) -> bool {
        matches!(self, Self::Session(SessionStatus::Listening))
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::Session(SessionStatus::Ready)
    }
}

impl fmt::Display for StatusIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(SessionStatus::Ready.to_string(), "Ready");
        assert_eq!(SessionStatus::Listening.to_string(), "Listening...");
        assert_eq!(SessionStatus::Processing.to_string(), "Processing...");
        assert_eq!(StatusIndicator::Unsupported.text(), UNSUPPORTED_MESSAGE);
    }

    #[test]
    fn test_capture_ended_only_resets_listening() {
        assert_eq!(
            SessionStatus::Listening.on(Trigger::CaptureEnded),
            SessionStatus::Ready
        );
        assert_eq!(
            SessionStatus::Processing.on(Trigger::CaptureEnded),
            SessionStatus::Processing
        );
        assert_eq!(SessionStatus::Ready.on(Trigger::CaptureEnded), SessionStatus::Ready);
    }

    #[test]
    fn test_transitions_from_any_status() {
        for status in [
            SessionStatus::Ready,
            SessionStatus::Listening,
            SessionStatus::Processing,
        ] {
            assert_eq!(status.on(Trigger::CaptureStarted), SessionStatus::Listening);
            assert_eq!(status.on(Trigger::Submitted), SessionStatus::Processing);
            assert_eq!(status.on(Trigger::ReplyReceived), SessionStatus::Ready);
            assert_eq!(status.on(Trigger::RequestFailed), SessionStatus::Ready);
        }
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(SessionStatus::default(), SessionStatus::Ready);
        assert_eq!(StatusIndicator::default().text(), "Ready");
        assert!(!StatusIndicator::Unsupported.shows_listening());
    }
}
