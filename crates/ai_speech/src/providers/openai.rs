//! OpenAI Speech Provider
//!
//! Implements `SpeechSynthesizer` against the OpenAI `audio/speech` endpoint.
//! The same wire format serves Azure OpenAI deployments, which differ only in
//! URL layout and authentication header.
//!
//! # Parameters used
//!
//! - `api_key` (required)
//! - `endpoint`: API base URL for OpenAI, full deployment URL for Azure
//! - `voice`, `model`, `speed`

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use domain::AudioBuffer;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::BackendParams;
use crate::error::SpeechError;
use crate::ports::{SpeechSynthesizer, SynthesisRequest};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "tts-1";
const DEFAULT_VOICE: &str = "shimmer";
const MAX_INPUT_CHARS: usize = 4096;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which flavour of the API to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    OpenAi,
    Azure,
}

/// OpenAI (or Azure OpenAI) text-to-speech adapter
#[derive(Debug, Clone)]
pub struct OpenAISpeechProvider {
    client: Client,
    flavor: Flavor,
}

/// OpenAI TTS request body
#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    code: Option<String>,
}

impl OpenAISpeechProvider {
    /// Create an adapter for the OpenAI API
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, SpeechError> {
        Self::with_flavor(Flavor::OpenAi)
    }

    /// Create an adapter for an Azure OpenAI deployment
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if the HTTP client cannot be built.
    pub fn azure() -> Result<Self, SpeechError> {
        Self::with_flavor(Flavor::Azure)
    }

    fn with_flavor(flavor: Flavor) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                SpeechError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, flavor })
    }

    /// Build the speech endpoint URL
    fn speech_url(&self, params: &BackendParams) -> Result<String, SpeechError> {
        match self.flavor {
            Flavor::OpenAi => {
                let base = params.endpoint.as_deref().unwrap_or(DEFAULT_BASE_URL);
                Ok(format!("{}/audio/speech", base.trim_end_matches('/')))
            },
            Flavor::Azure => params.endpoint.clone().ok_or_else(|| {
                SpeechError::Configuration("Azure TTS endpoint is not configured".to_string())
            }),
        }
    }

    /// Speed is only sent when it differs from the API default
    fn speed(params: &BackendParams) -> Option<f32> {
        params.speed.filter(|s| (s - 1.0).abs() >= f32::EPSILON)
    }

    fn map_error_status(status: reqwest::StatusCode, body: &str, voice: &str) -> SpeechError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return SpeechError::RateLimited;
        }

        if let Ok(api_error) = serde_json::from_str::<ApiError>(body) {
            return match api_error.error.code.as_deref() {
                Some("rate_limit_exceeded") => SpeechError::RateLimited,
                Some("invalid_voice") => {
                    SpeechError::SynthesisFailed(format!("Voice not found: {voice}"))
                },
                _ => SpeechError::SynthesisFailed(api_error.error.message),
            };
        }

        SpeechError::SynthesisFailed(format!("HTTP {status}: {body}"))
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeechProvider {
    #[instrument(skip(self, request), fields(text_len = request.text.len(), flavor = ?self.flavor))]
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, SpeechError> {
        let text = request.text.as_str();
        if text.is_empty() {
            return Err(SpeechError::SynthesisFailed(
                "Text cannot be empty".to_string(),
            ));
        }

        let char_count = text.chars().count();
        if char_count > MAX_INPUT_CHARS {
            return Err(SpeechError::SynthesisFailed(format!(
                "Text too long: {char_count} characters exceeds {MAX_INPUT_CHARS} limit"
            )));
        }

        let params = &request.params;
        let api_key = params
            .api_key
            .as_deref()
            .ok_or_else(|| SpeechError::Configuration("API key is not configured".to_string()))?;
        let voice = params.voice.as_deref().unwrap_or(DEFAULT_VOICE);

        let body = TtsRequest {
            model: params.model.as_deref().unwrap_or(DEFAULT_MODEL),
            input: text,
            voice,
            response_format: "mp3",
            speed: Self::speed(params),
        };

        let builder = self.client.post(self.speech_url(params)?).json(&body);
        let builder = match self.flavor {
            Flavor::OpenAi => builder.bearer_auth(api_key),
            Flavor::Azure => builder.header("api-key", api_key),
        };

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::map_error_status(status, &error_body, voice));
        }

        let audio_bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::InvalidResponse(format!("Failed to read audio: {e}")))?;

        if audio_bytes.is_empty() {
            return Err(SpeechError::InvalidResponse(
                "Empty audio response".to_string(),
            ));
        }

        debug!(audio_size = audio_bytes.len(), "Speech synthesis complete");

        Ok(AudioBuffer::new(audio_bytes).with_mime_type("audio/mpeg"))
    }

    fn name(&self) -> &str {
        match self.flavor {
            Flavor::OpenAi => "openai",
            Flavor::Azure => "azure",
        }
    }
}
