//! Shared test utilities
//!
//! In-memory stand-ins for the capture, synthesis and intent collaborators,
//! plus a view that records everything the controller shows. All of them
//! write into one shared journal so tests can assert on cross-collaborator
//! ordering.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Barrier;

use genie_voice::{
    Error, InteractionController, IntentService, Reply, Result, SessionView, SpeechCapture,
    SpeechPreferences, SpeechRequest, SpeechSynthesis, StatusIndicator, TranscriptEntry, Voice,
};

/// Ordered log of collaborator calls
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, line: impl Into<String>) {
        self.0.lock().unwrap().push(line.into());
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Position of the first line starting with `prefix`
    #[must_use]
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.lines().iter().position(|l| l.starts_with(prefix))
    }
}

/// Capture provider that only records start/stop calls
pub struct FakeCapture {
    available: bool,
    fail_start: bool,
    journal: Journal,
}

impl FakeCapture {
    pub fn available(journal: &Journal) -> Self {
        Self {
            available: true,
            fail_start: false,
            journal: journal.clone(),
        }
    }

    pub fn unavailable(journal: &Journal) -> Self {
        Self {
            available: false,
            ..Self::available(journal)
        }
    }

    pub fn failing(journal: &Journal) -> Self {
        Self {
            fail_start: true,
            ..Self::available(journal)
        }
    }
}

impl SpeechCapture for FakeCapture {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&self) -> Result<()> {
        self.journal.push("capture start");
        if self.fail_start {
            return Err(Error::Capture("microphone busy".to_string()));
        }
        Ok(())
    }

    fn stop(&self) {
        self.journal.push("capture stop");
    }
}

/// Synthesis provider that records requests instead of speaking
pub struct FakeSynthesis {
    available: bool,
    voices: Vec<Voice>,
    spoken: Mutex<Vec<SpeechRequest>>,
    journal: Journal,
}

impl FakeSynthesis {
    pub fn new(journal: &Journal, voices: Vec<Voice>) -> Self {
        Self {
            available: true,
            voices,
            spoken: Mutex::new(Vec::new()),
            journal: journal.clone(),
        }
    }

    pub fn unavailable(journal: &Journal) -> Self {
        Self {
            available: false,
            ..Self::new(journal, Vec::new())
        }
    }

    #[must_use]
    pub fn spoken(&self) -> Vec<SpeechRequest> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechSynthesis for FakeSynthesis {
    fn is_available(&self) -> bool {
        self.available
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&self, request: SpeechRequest) {
        self.journal.push(format!("speak {}", request.text));
        self.spoken.lock().unwrap().push(request);
    }
}

/// Intent service answering from a script of canned replies
pub struct FakeIntent {
    replies: Mutex<VecDeque<Result<Reply>>>,
    requests: Mutex<Vec<String>>,
    barrier: Option<Barrier>,
    journal: Journal,
}

impl FakeIntent {
    pub fn new(journal: &Journal) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            barrier: None,
            journal: journal.clone(),
        }
    }

    /// Hold every request until `parties` requests are in flight
    #[must_use]
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Barrier::new(parties));
        self
    }

    #[must_use]
    pub fn reply(self, message: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(Reply {
            message: message.to_string(),
            success: Some(true),
            data: None,
        }));
        self
    }

    #[must_use]
    pub fn fail(self, detail: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Request(detail.to_string())));
        self
    }

    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntentService for FakeIntent {
    async fn process(&self, text: &str) -> Result<Reply> {
        self.journal.push(format!("request {text}"));
        self.requests.lock().unwrap().push(text.to_string());

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(Reply {
                message: format!("echo {text}"),
                success: None,
                data: None,
            })
        })
    }

    fn endpoint(&self) -> &str {
        "http://localhost:8000"
    }
}

/// View that records what the controller displays
pub struct RecordingView {
    statuses: Mutex<Vec<StatusIndicator>>,
    entries: Mutex<Vec<TranscriptEntry>>,
    capture_states: Mutex<Vec<bool>>,
    disabled: AtomicBool,
    journal: Journal,
}

impl RecordingView {
    pub fn new(journal: &Journal) -> Self {
        Self {
            statuses: Mutex::new(Vec::new()),
            entries: Mutex::new(Vec::new()),
            capture_states: Mutex::new(Vec::new()),
            disabled: AtomicBool::new(false),
            journal: journal.clone(),
        }
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<StatusIndicator> {
        self.statuses.lock().unwrap().clone()
    }

    #[must_use]
    pub fn last_status(&self) -> Option<StatusIndicator> {
        self.statuses.lock().unwrap().last().copied()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries.lock().unwrap().clone()
    }

    #[must_use]
    pub fn capture_states(&self) -> Vec<bool> {
        self.capture_states.lock().unwrap().clone()
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }
}

impl SessionView for RecordingView {
    fn status_changed(&self, indicator: StatusIndicator) {
        self.statuses.lock().unwrap().push(indicator);
    }

    fn entry_appended(&self, entry: &TranscriptEntry) {
        self.journal
            .push(format!("entry {}: {}", entry.role, entry.content));
        self.entries.lock().unwrap().push(entry.clone());
    }

    fn capture_active(&self, active: bool) {
        self.capture_states.lock().unwrap().push(active);
    }

    fn capture_disabled(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }
}

/// A controller wired to fakes, with handles to inspect each of them
pub struct Harness {
    pub controller: InteractionController,
    pub capture: Arc<FakeCapture>,
    pub synthesis: Arc<FakeSynthesis>,
    pub intent: Arc<FakeIntent>,
    pub view: Arc<RecordingView>,
    pub journal: Journal,
}

impl Harness {
    /// Controller with capture available and a single English voice
    pub fn new(intent: impl FnOnce(&Journal) -> FakeIntent) -> Self {
        Self::build(
            FakeCapture::available,
            |j| FakeSynthesis::new(j, vec![Voice::new("nova", "en-US")]),
            intent,
        )
    }

    pub fn build(
        capture: impl FnOnce(&Journal) -> FakeCapture,
        synthesis: impl FnOnce(&Journal) -> FakeSynthesis,
        intent: impl FnOnce(&Journal) -> FakeIntent,
    ) -> Self {
        let journal = Journal::default();
        let capture = Arc::new(capture(&journal));
        let synthesis = Arc::new(synthesis(&journal));
        let intent = Arc::new(intent(&journal));
        let view = Arc::new(RecordingView::new(&journal));

        let controller = InteractionController::new(
            Arc::clone(&capture) as Arc<dyn SpeechCapture>,
            Arc::clone(&synthesis) as Arc<dyn SpeechSynthesis>,
            Arc::clone(&intent) as Arc<dyn IntentService>,
            Arc::clone(&view) as Arc<dyn SessionView>,
            SpeechPreferences::default(),
        );

        Self {
            controller,
            capture,
            synthesis,
            intent,
            view,
            journal,
        }
    }
}
