//! TOML configuration file loading
//!
//! Supports `~/.config/genie/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GenieConfigFile {
    /// Intent service configuration
    #[serde(default)]
    pub service: ServiceFileConfig,

    /// Speech capture configuration
    #[serde(default)]
    pub capture: CaptureFileConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// API keys for the STT/TTS backends
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Intent service configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServiceFileConfig {
    /// Base address of the intent service (e.g. `http://localhost:8000`)
    pub api_base: Option<String>,
}

/// Speech capture configuration
#[derive(Debug, Default, Deserialize)]
pub struct CaptureFileConfig {
    /// Enable microphone capture
    pub enabled: Option<bool>,

    /// Recognition locale (e.g. "en-IN")
    pub locale: Option<String>,

    /// STT backend ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: Option<String>,

    /// Seconds to wait for speech before giving up
    pub no_speech_timeout_secs: Option<u64>,

    /// Hard cap on a single utterance
    pub max_utterance_secs: Option<u64>,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Enable spoken replies
    pub enabled: Option<bool>,

    /// TTS backend ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// Preferred voice language prefix (e.g. "en")
    pub voice_prefix: Option<String>,

    /// Speech rate multiplier
    pub rate: Option<f32>,

    /// Speech pitch multiplier
    pub pitch: Option<f32>,

    /// Voices offered by the TTS backend, in preference order
    pub voices: Option<Vec<VoiceFileConfig>>,
}

/// A single voice entry
#[derive(Debug, Deserialize)]
pub struct VoiceFileConfig {
    pub name: String,
    pub lang: String,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `GenieConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> GenieConfigFile {
    let Some(path) = config_file_path() else {
        return GenieConfigFile::default();
    };

    if !path.exists() {
        return GenieConfigFile::default();
    }

    match load_config_file_from(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            GenieConfigFile::default()
        }
    }
}

/// Read and parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn load_config_file_from(path: &Path) -> Result<GenieConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/genie/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("genie").join("config.toml"))
}
