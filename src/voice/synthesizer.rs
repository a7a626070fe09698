//! Cloud speech synthesis with local playback

use std::sync::{Arc, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::playback::{AudioPlayback, output_device_available};
use super::provider::{SpeechRequest, SpeechSynthesis, Voice};
use super::tts::TextToSpeech;
use crate::config::Config;
use crate::{Error, Result};

/// Speaks text through a cloud TTS backend and the default output device
pub struct CloudSynthesis {
    tts: Option<Arc<TextToSpeech>>,
    voices: Vec<Voice>,
    default_voice: &'static str,
    runtime: Option<Handle>,
    available: bool,
    // Held for the whole synthesize + play so utterances never overlap
    queue: Arc<Mutex<()>>,
    pending: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl CloudSynthesis {
    /// Build the synthesizer from configuration
    ///
    /// Must be called from within a tokio runtime; without one, or without an
    /// output device or TTS credentials, the synthesizer reports unavailable.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let tts = if config.speech.enabled {
            TextToSpeech::from_config(config)
                .inspect_err(|e| tracing::warn!(error = %e, "speech synthesis disabled"))
                .ok()
                .map(Arc::new)
        } else {
            None
        };

        let runtime = Handle::try_current().ok();
        let available = tts.is_some() && runtime.is_some() && output_device_available();

        tracing::debug!(
            available,
            backend = ?config.speech.tts_backend,
            voices = config.speech.voices.len(),
            "speech synthesis initialized"
        );

        Self {
            tts,
            voices: config.speech.voices.clone(),
            default_voice: config.speech.tts_backend.default_voice(),
            runtime,
            available,
            queue: Arc::new(Mutex::new(())),
            pending: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Voice used when a request names none
    #[must_use]
    pub const fn default_voice(&self) -> &'static str {
        self.default_voice
    }

    /// Wait until everything queued so far has been spoken
    pub async fn wait_idle(&self) {
        let pending: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "speech task failed");
            }
        }
    }
}

impl SpeechSynthesis for CloudSynthesis {
    fn is_available(&self) -> bool {
        self.available
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&self, request: SpeechRequest) {
        let (Some(tts), Some(runtime)) = (self.tts.clone(), self.runtime.as_ref()) else {
            return;
        };

        if (request.pitch - 1.0).abs() > f32::EPSILON {
            tracing::debug!(pitch = request.pitch, "pitch not supported by TTS backend, ignoring");
        }

        let voice = request
            .voice
            .map_or_else(|| self.default_voice.to_string(), |v| v.name);
        let queue = Arc::clone(&self.queue);

        let handle = runtime.spawn(async move {
            let _turn = queue.lock().await;
            tracing::debug!(voice = %voice, chars = request.text.len(), "speaking");

            if let Err(e) = speak_now(&tts, &request.text, &voice, request.rate).await {
                tracing::warn!(error = %e, "speech playback failed");
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}

async fn speak_now(tts: &TextToSpeech, text: &str, voice: &str, rate: f32) -> Result<()> {
    let audio = tts.synthesize(text, voice, rate).await?;

    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&audio))
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::GenieConfigFile;

    #[tokio::test]
    async fn test_unavailable_without_credentials() {
        let config = Config::from_sources(GenieConfigFile::default(), |_| None, None, false).unwrap();

        let synthesis = CloudSynthesis::from_config(&config);
        assert!(!synthesis.is_available());
        assert_eq!(synthesis.default_voice(), "alloy");

        // Speaking while unavailable is a silent no-op
        synthesis.speak(SpeechRequest {
            text: "hello".to_string(),
            rate: 0.95,
            pitch: 1.0,
            voice: None,
        });
        synthesis.wait_idle().await;
    }
}
