//! Configuration management for the Genie voice client

pub mod file;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::voice::{CaptureSettings, Voice};
use crate::{Error, Result};

/// Default intent service base address
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Default recognition locale
pub const DEFAULT_LOCALE: &str = "en-IN";

/// Default preferred voice language prefix
pub const DEFAULT_VOICE_PREFIX: &str = "en";

/// Default speech rate
pub const DEFAULT_RATE: f32 = 0.95;

/// Default speech pitch
pub const DEFAULT_PITCH: f32 = 1.0;

/// Rachel, the ElevenLabs premade default
const ELEVENLABS_DEFAULT_VOICE: &str = "21m00Tcm4TlvDq8ikWAM";

/// Genie client configuration
#[derive(Debug)]
pub struct Config {
    /// Intent service base address
    pub api_base: Url,

    /// Speech capture configuration
    pub capture: CaptureConfig,

    /// Speech synthesis configuration
    pub speech: SpeechConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Speech-to-text backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SttBackend {
    /// `OpenAI` Whisper
    #[default]
    Whisper,
    /// Deepgram
    Deepgram,
}

impl SttBackend {
    /// Parse a backend name
    ///
    /// # Errors
    ///
    /// Returns error for unknown backend names
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::Whisper => "whisper-1",
            Self::Deepgram => "nova-2",
        }
    }
}

/// Text-to-speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsBackend {
    /// `OpenAI` speech
    #[default]
    OpenAI,
    /// ElevenLabs
    ElevenLabs,
}

impl TtsBackend {
    /// Parse a backend name
    ///
    /// # Errors
    ///
    /// Returns error for unknown backend names
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "tts-1",
            Self::ElevenLabs => "eleven_multilingual_v2",
        }
    }

    /// Voice used when the voice list is empty
    #[must_use]
    pub const fn default_voice(self) -> &'static str {
        match self {
            Self::OpenAI => "alloy",
            Self::ElevenLabs => ELEVENLABS_DEFAULT_VOICE,
        }
    }

    fn default_voices(self) -> Vec<Voice> {
        let voices: &[(&str, &str)] = match self {
            Self::OpenAI => &[
                ("alloy", "en-US"),
                ("nova", "en-US"),
                ("shimmer", "en-US"),
                ("echo", "en-US"),
                ("fable", "en-GB"),
                ("onyx", "en-US"),
            ],
            Self::ElevenLabs => &[(ELEVENLABS_DEFAULT_VOICE, "en-US")],
        };

        voices
            .iter()
            .map(|(name, lang)| Voice::new(*name, *lang))
            .collect()
    }
}

/// Speech capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Enable microphone capture
    pub enabled: bool,

    /// Recognition locale
    pub locale: String,

    /// STT backend
    pub stt_backend: SttBackend,

    /// STT model identifier
    pub stt_model: String,

    /// Give up on a capture session if no speech starts within this window
    pub no_speech_timeout: Duration,

    /// Hard cap on a single utterance
    pub max_utterance: Duration,
}

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Enable spoken replies
    pub enabled: bool,

    /// TTS backend
    pub tts_backend: TtsBackend,

    /// TTS model identifier
    pub tts_model: String,

    /// Preferred voice language prefix
    pub voice_prefix: String,

    /// Speech rate multiplier
    pub rate: f32,

    /// Speech pitch multiplier
    pub pitch: f32,

    /// Voices offered by the TTS backend, in preference order
    pub voices: Vec<Voice>,
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper and TTS)
    pub openai: Option<SecretString>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,
}

/// Owned copy of a configured key, for handing to an API client
pub(crate) fn copy_secret(key: &SecretString) -> SecretString {
    SecretString::from(key.expose_secret().to_owned())
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// `api_base` (from the command line) takes precedence over both.
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load(api_base: Option<&str>, disable_voice: bool) -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok(), api_base, disable_voice)
    }

    /// Build configuration from explicit sources (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn from_sources(
        fc: file::GenieConfigFile,
        env: impl Fn(&str) -> Option<String>,
        api_base: Option<&str>,
        disable_voice: bool,
    ) -> Result<Self> {
        let api_base = api_base
            .map(ToString::to_string)
            .or_else(|| env("GENIE_API_BASE"))
            .or(fc.service.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(&api_base)?;
        if !matches!(api_base.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "intent service must be http(s), got {api_base}"
            )));
        }

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
            deepgram: env("DEEPGRAM_API_KEY")
                .or(fc.api_keys.deepgram)
                .map(SecretString::from),
            elevenlabs: env("ELEVENLABS_API_KEY")
                .or(fc.api_keys.elevenlabs)
                .map(SecretString::from),
        };

        // Capture config (env > toml > default)
        let stt_backend = env("GENIE_STT_PROVIDER")
            .or(fc.capture.stt_provider)
            .map(|s| SttBackend::parse(&s))
            .transpose()?
            .unwrap_or_default();
        let capture = CaptureConfig {
            enabled: !disable_voice && fc.capture.enabled.unwrap_or(true),
            locale: env("GENIE_LOCALE")
                .or(fc.capture.locale)
                .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            stt_backend,
            stt_model: env("GENIE_STT_MODEL")
                .or(fc.capture.stt_model)
                .unwrap_or_else(|| stt_backend.default_model().to_string()),
            no_speech_timeout: Duration::from_secs(fc.capture.no_speech_timeout_secs.unwrap_or(8)),
            max_utterance: Duration::from_secs(fc.capture.max_utterance_secs.unwrap_or(15)),
        };

        // Speech config (env > toml > default)
        let tts_backend = env("GENIE_TTS_PROVIDER")
            .or(fc.speech.tts_provider)
            .map(|s| TtsBackend::parse(&s))
            .transpose()?
            .unwrap_or_default();
        let voices = fc.speech.voices.map_or_else(
            || tts_backend.default_voices(),
            |voices| {
                voices
                    .into_iter()
                    .map(|v| Voice::new(v.name, v.lang))
                    .collect()
            },
        );
        let speech = SpeechConfig {
            enabled: !disable_voice && fc.speech.enabled.unwrap_or(true),
            tts_backend,
            tts_model: env("GENIE_TTS_MODEL")
                .or(fc.speech.tts_model)
                .unwrap_or_else(|| tts_backend.default_model().to_string()),
            voice_prefix: env("GENIE_VOICE_PREFIX")
                .or(fc.speech.voice_prefix)
                .unwrap_or_else(|| DEFAULT_VOICE_PREFIX.to_string()),
            rate: fc.speech.rate.unwrap_or(DEFAULT_RATE),
            pitch: fc.speech.pitch.unwrap_or(DEFAULT_PITCH),
            voices,
        };

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
        }

        Ok(Self {
            api_base,
            capture,
            speech,
            api_keys,
        })
    }

    /// Recognition settings handed to the capture provider
    #[must_use]
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings::single_utterance(&self.capture.locale)
    }
}
