//! Speech-to-text (STT) processing

use secrecy::{ExposeSecret, SecretString};

use crate::config::{Config, SttBackend, copy_secret};
use crate::{Error, Result};

const OPENAI_API_BASE: &str = "https://api.openai.com";
const DEEPGRAM_API_BASE: &str = "https://api.deepgram.com";

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// STT provider backend
#[derive(Clone, Copy, Debug)]
enum SttProvider {
    Whisper,
    Deepgram,
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    locale: String,
    base_url: String,
    provider: SttProvider,
}

impl SpeechToText {
    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: SecretString, model: String, locale: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            locale,
            base_url: OPENAI_API_BASE.to_string(),
            provider: SttProvider::Whisper,
        })
    }

    /// Create a new STT instance using Deepgram
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepgram(api_key: SecretString, model: String, locale: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            locale,
            base_url: DEEPGRAM_API_BASE.to_string(),
            provider: SttProvider::Deepgram,
        })
    }

    /// Build the client for the backend selected in `config`
    ///
    /// # Errors
    ///
    /// Returns error if the backend's API key is not configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let model = config.capture.stt_model.clone();
        let locale = config.capture.locale.clone();

        match config.capture.stt_backend {
            SttBackend::Whisper => {
                let key = config
                    .api_keys
                    .openai
                    .as_ref()
                    .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".to_string()))?;
                Self::new_whisper(copy_secret(key), model, locale)
            }
            SttBackend::Deepgram => {
                let key = config
                    .api_keys
                    .deepgram
                    .as_ref()
                    .ok_or_else(|| Error::Config("DEEPGRAM_API_KEY not set".to_string()))?;
                Self::new_deepgram(copy_secret(key), model, locale)
            }
        }
    }

    /// Point the client at a different API host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio).await,
            SttProvider::Deepgram => self.transcribe_deepgram(audio).await,
        }
    }

    /// Transcribe using OpenAI Whisper
    async fn transcribe_whisper(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", whisper_language(&self.locale).to_string());

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let response = self
            .client
            .post(format!("{}/v1/listen", self.base_url))
            .query(&[
                ("model", self.model.as_str()),
                ("language", self.locale.as_str()),
                ("punctuate", "true"),
            ])
            .header(
                "Authorization",
                format!("Token {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            e
        })?;

        // First alternative of the first channel only
        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

/// Whisper takes ISO 639-1 codes, not full locales
fn whisper_language(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_language() {
        assert_eq!(whisper_language("en-IN"), "en");
        assert_eq!(whisper_language("pt_BR"), "pt");
        assert_eq!(whisper_language("hi"), "hi");
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = SpeechToText::new_whisper(
            SecretString::from(String::new()),
            "whisper-1".to_string(),
            "en-IN".to_string(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_deepgram_takes_first_alternative() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/listen"))
            .and(wiremock::matchers::query_param("language", "en-IN"))
            .and(wiremock::matchers::header("Authorization", "Token dg-key"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                    "results": { "channels": [
                        { "alternatives": [
                            { "transcript": "order paracetamol" },
                            { "transcript": "order para set a mall" }
                        ]},
                        { "alternatives": [{ "transcript": "second channel" }] }
                    ]}
                }),
            ))
            .mount(&server)
            .await;

        let stt = SpeechToText::new_deepgram(
            SecretString::from("dg-key".to_string()),
            "nova-2".to_string(),
            "en-IN".to_string(),
        )
        .unwrap()
        .with_base_url(server.uri());

        let transcript = stt.transcribe(b"RIFF").await.unwrap();
        assert_eq!(transcript, "order paracetamol");
    }

    #[tokio::test]
    async fn test_whisper_api_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/audio/transcriptions"))
            .respond_with(wiremock::ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let stt = SpeechToText::new_whisper(
            SecretString::from("sk-test".to_string()),
            "whisper-1".to_string(),
            "en-IN".to_string(),
        )
        .unwrap()
        .with_base_url(server.uri());

        let err = stt.transcribe(b"RIFF").await.unwrap_err();
        assert!(matches!(err, Error::Stt(_)));
        assert!(err.to_string().contains("401"));
    }
}
