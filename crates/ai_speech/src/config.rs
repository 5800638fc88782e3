//! Settings for the speech pipeline
//!
//! Settings are read once per request as an immutable snapshot so that a
//! settings change in the middle of a backend call cannot destabilize it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SpeechError;

/// Speech synthesis backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceBackend {
    Koeiromap,
    Voicevox,
    Google,
    Stylebertvits2,
    AivisSpeech,
    Gsvitts,
    Elevenlabs,
    Openai,
    Azure,
    Nijivoice,
}

impl VoiceBackend {
    /// Every supported backend
    pub const ALL: [Self; 10] = [
        Self::Koeiromap,
        Self::Voicevox,
        Self::Google,
        Self::Stylebertvits2,
        Self::AivisSpeech,
        Self::Gsvitts,
        Self::Elevenlabs,
        Self::Openai,
        Self::Azure,
        Self::Nijivoice,
    ];

    /// Settings tag of this backend
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Koeiromap => "koeiromap",
            Self::Voicevox => "voicevox",
            Self::Google => "google",
            Self::Stylebertvits2 => "stylebertvits2",
            Self::AivisSpeech => "aivis_speech",
            Self::Gsvitts => "gsvitts",
            Self::Elevenlabs => "elevenlabs",
            Self::Openai => "openai",
            Self::Azure => "azure",
            Self::Nijivoice => "nijivoice",
        }
    }

    /// Human-readable service name used in user-facing notifications
    #[must_use]
    pub const fn service_name(&self) -> &'static str {
        match self {
            Self::Koeiromap => "Koeiromap",
            Self::Voicevox => "VOICEVOX",
            Self::Google => "Google Text-to-Speech",
            Self::Stylebertvits2 => "Style-Bert-VITS2",
            Self::AivisSpeech => "AivisSpeech",
            Self::Gsvitts => "GSVI TTS",
            Self::Elevenlabs => "ElevenLabs",
            Self::Openai => "OpenAI",
            Self::Azure => "Azure OpenAI",
            Self::Nijivoice => "NijiVoice",
        }
    }
}

impl fmt::Display for VoiceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == tag)
            .ok_or_else(|| format!("unknown voice backend: {s}"))
    }
}

/// Parameters for a single backend
///
/// Only the entry for the selected backend is handed to its adapter.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendParams {
    /// API key or token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Server or API base URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Voice, speaker, actor or style identifier
    #[serde(default)]
    pub voice: Option<String>,

    /// Model identifier
    #[serde(default)]
    pub model: Option<String>,

    /// Speaking speed multiplier
    #[serde(default)]
    pub speed: Option<f32>,

    /// Pitch offset
    #[serde(default)]
    pub pitch: Option<f32>,

    /// Intonation scale
    #[serde(default)]
    pub intonation: Option<f32>,

    /// Vendor-specific extras (e.g. batch size, sdp ratio)
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl fmt::Debug for BackendParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendParams")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("voice", &self.voice)
            .field("model", &self.model)
            .field("speed", &self.speed)
            .field("pitch", &self.pitch)
            .field("intonation", &self.intonation)
            .field("extra", &self.extra)
            .finish()
    }
}

impl BackendParams {
    /// Validate the parameters
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(speed) = self.speed {
            if !(0.25..=4.0).contains(&speed) {
                return Err(format!("Speed must be between 0.25 and 4.0, got {speed}"));
            }
        }

        if let Some(endpoint) = &self.endpoint {
            if endpoint.trim().is_empty() {
                return Err("Endpoint must not be empty when set".to_string());
            }
        }

        Ok(())
    }
}

/// Speech pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// Backend used for synthesis
    #[serde(default = "default_backend")]
    pub backend: VoiceBackend,

    /// Output voice language (ISO 639-1)
    #[serde(default = "default_language")]
    pub language: String,

    /// Captions only: no audio is synthesized or played
    #[serde(default)]
    pub audio_mode: bool,

    /// Rewrite English words into Japanese readings before synthesis
    #[serde(default)]
    pub english_to_japanese: bool,

    /// Minimum spacing between the end of one successful backend call and
    /// the start of the next, in milliseconds
    #[serde(default = "default_min_call_interval_ms")]
    pub min_call_interval_ms: u64,

    /// Upper bound on a single backend call, in milliseconds
    #[serde(default = "default_synthesis_timeout_ms")]
    pub synthesis_timeout_ms: u64,

    /// Quiet period after the queue drains before the avatar returns to a
    /// neutral expression, in milliseconds
    #[serde(default = "default_idle_reset_delay_ms")]
    pub idle_reset_delay_ms: u64,

    /// Per-backend parameters
    #[serde(default)]
    pub backends: HashMap<VoiceBackend, BackendParams>,
}

const fn default_backend() -> VoiceBackend {
    VoiceBackend::Voicevox
}

fn default_language() -> String {
    "ja".to_string()
}

const fn default_min_call_interval_ms() -> u64 {
    1000
}

const fn default_synthesis_timeout_ms() -> u64 {
    30000 // 30 seconds
}

const fn default_idle_reset_delay_ms() -> u64 {
    1500
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            language: default_language(),
            audio_mode: false,
            english_to_japanese: false,
            min_call_interval_ms: default_min_call_interval_ms(),
            synthesis_timeout_ms: default_synthesis_timeout_ms(),
            idle_reset_delay_ms: default_idle_reset_delay_ms(),
            backends: HashMap::new(),
        }
    }
}

impl SpeechSettings {
    /// Load settings from an optional file, then `TALK_SPEECH_*` environment
    /// overrides (nested keys separated by `__`)
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if a source cannot be read or the
    /// result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, SpeechError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TALK_SPEECH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate().map_err(SpeechError::Configuration)?;

        info!(
            backend = %settings.backend,
            language = %settings.language,
            audio_mode = settings.audio_mode,
            "Speech settings loaded"
        );

        Ok(settings)
    }

    /// Validate the settings
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.language.trim().is_empty() {
            return Err("Language must not be empty".to_string());
        }

        if self.synthesis_timeout_ms == 0 {
            return Err("Synthesis timeout must be greater than 0".to_string());
        }

        for (backend, params) in &self.backends {
            params
                .validate()
                .map_err(|e| format!("Invalid parameters for {backend}: {e}"))?;
        }

        Ok(())
    }

    /// Parameters of the selected backend (defaults if none are configured)
    #[must_use]
    pub fn selected_params(&self) -> BackendParams {
        self.backends.get(&self.backend).cloned().unwrap_or_default()
    }

    /// Whether the Japanese reading rewrite applies to the output language
    #[must_use]
    pub fn wants_japanese_reading(&self) -> bool {
        self.english_to_japanese && self.language == "ja"
    }

    #[must_use]
    pub const fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }

    #[must_use]
    pub const fn synthesis_timeout(&self) -> Duration {
        Duration::from_millis(self.synthesis_timeout_ms)
    }

    #[must_use]
    pub const fn idle_reset_delay(&self) -> Duration {
        Duration::from_millis(self.idle_reset_delay_ms)
    }
}

/// Shared, atomically replaceable settings
///
/// Readers take a snapshot per request; writers swap the whole value.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    inner: Arc<ArcSwap<SpeechSettings>>,
}

impl SettingsStore {
    /// Create a store holding the given settings
    #[must_use]
    pub fn new(settings: SpeechSettings) -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(settings))),
        }
    }

    /// Current settings snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<SpeechSettings> {
        self.inner.load_full()
    }

    /// Replace the settings wholesale
    pub fn replace(&self, settings: SpeechSettings) {
        self.inner.store(Arc::new(settings));
    }

    /// Apply an in-place modification to a copy of the settings and publish it
    pub fn update(&self, f: impl Fn(&mut SpeechSettings)) {
        self.inner.rcu(|current| {
            let mut next = SpeechSettings::clone(current);
            f(&mut next);
            next
        });
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(SpeechSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_settings_have_expected_values() {
        let settings = SpeechSettings::default();

        assert_eq!(settings.backend, VoiceBackend::Voicevox);
        assert_eq!(settings.language, "ja");
        assert!(!settings.audio_mode);
        assert!(!settings.english_to_japanese);
        assert_eq!(settings.min_call_interval_ms, 1000);
        assert_eq!(settings.synthesis_timeout_ms, 30000);
        assert_eq!(settings.idle_reset_delay_ms, 1500);
        assert!(settings.backends.is_empty());
    }

    #[test]
    fn durations_follow_millisecond_fields() {
        let settings = SpeechSettings::default();
        assert_eq!(settings.min_call_interval(), Duration::from_secs(1));
        assert_eq!(settings.synthesis_timeout(), Duration::from_secs(30));
        assert_eq!(settings.idle_reset_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn validate_fails_with_zero_timeout() {
        let settings = SpeechSettings {
            synthesis_timeout_ms: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_fails_with_invalid_backend_speed() {
        let mut settings = SpeechSettings::default();
        settings.backends.insert(
            VoiceBackend::Openai,
            BackendParams {
                speed: Some(5.0),
                ..Default::default()
            },
        );

        let err = settings.validate().unwrap_err();
        assert!(err.contains("openai"));
    }

    #[test]
    fn japanese_reading_requires_japanese_output() {
        let mut settings = SpeechSettings {
            english_to_japanese: true,
            ..Default::default()
        };
        assert!(settings.wants_japanese_reading());

        settings.language = "en".to_string();
        assert!(!settings.wants_japanese_reading());
    }

    #[test]
    fn selected_params_defaults_when_missing() {
        let settings = SpeechSettings::default();
        assert_eq!(settings.selected_params(), BackendParams::default());
    }

    #[test]
    fn backend_tags_roundtrip() {
        for backend in VoiceBackend::ALL {
            assert_eq!(backend.as_str().parse::<VoiceBackend>().unwrap(), backend);
            let json = serde_json::to_string(&backend).unwrap();
            assert_eq!(json, format!("\"{}\"", backend.as_str()));
        }
    }

    #[test]
    fn unknown_backend_tag_is_rejected() {
        assert!("festival".parse::<VoiceBackend>().is_err());
    }

    #[test]
    fn params_debug_redacts_api_key() {
        let params = BackendParams {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{params:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn settings_deserialize_from_toml() {
        let toml = r#"
            backend = "openai"
            language = "en"
            audio_mode = false
            min_call_interval_ms = 500

            [backends.openai]
            api_key = "sk-test"
            voice = "alloy"
            model = "tts-1"
            speed = 1.25

            [backends.aivis_speech]
            endpoint = "http://localhost:10101"
            voice = "888753760"
        "#;

        let settings: SpeechSettings = toml::from_str(toml).unwrap();

        assert_eq!(settings.backend, VoiceBackend::Openai);
        assert_eq!(settings.language, "en");
        assert_eq!(settings.min_call_interval_ms, 500);
        assert_eq!(settings.synthesis_timeout_ms, 30000);

        let openai = settings.selected_params();
        assert_eq!(openai.voice.as_deref(), Some("alloy"));
        assert!((openai.speed.unwrap() - 1.25).abs() < f32::EPSILON);
        assert!(settings.backends.contains_key(&VoiceBackend::AivisSpeech));
    }

    #[test]
    fn load_reads_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "backend = \"elevenlabs\"\nlanguage = \"en\"\n\n[backends.elevenlabs]\nvoice = \"rachel\""
        )
        .unwrap();

        let settings = SpeechSettings::load(Some(file.path())).unwrap();

        assert_eq!(settings.backend, VoiceBackend::Elevenlabs);
        assert_eq!(settings.selected_params().voice.as_deref(), Some("rachel"));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let result = SpeechSettings::load(Some(Path::new("/nonexistent/speech.toml")));
        assert!(matches!(result, Err(SpeechError::Configuration(_))));
    }

    #[test]
    fn store_snapshot_is_stable_across_replace() {
        let store = SettingsStore::default();
        let before = store.snapshot();

        store.replace(SpeechSettings {
            backend: VoiceBackend::Google,
            ..Default::default()
        });

        assert_eq!(before.backend, VoiceBackend::Voicevox);
        assert_eq!(store.snapshot().backend, VoiceBackend::Google);
    }

    #[test]
    fn store_update_modifies_a_copy() {
        let store = SettingsStore::default();
        let before = store.snapshot();

        store.update(|s| s.audio_mode = true);

        assert!(!before.audio_mode);
        assert!(store.snapshot().audio_mode);
    }
}
