//! Speech pipeline errors

use thiserror::Error;

use crate::config::VoiceBackend;

/// Errors that can occur while synthesizing or playing speech
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Failed to connect to speech service
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request to speech service failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Synthesis failed
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Invalid response from service
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout during synthesis
    #[error("Speech synthesis timeout after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Settings select a backend with no adapter registered
    #[error("No adapter registered for backend: {0}")]
    BackendNotRegistered(VoiceBackend),

    /// The avatar failed to decode or render a buffer
    #[error("Playback failed: {0}")]
    Playback(String),

    /// Reading conversion of the talk text failed
    #[error("Text conversion failed: {0}")]
    Conversion(String),
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(30000)
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}

impl From<config::ConfigError> for SpeechError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failed_error_message() {
        let err = SpeechError::ConnectionFailed("refused".to_string());
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn synthesis_failed_error_message() {
        let err = SpeechError::SynthesisFailed("invalid text".to_string());
        assert_eq!(err.to_string(), "Synthesis failed: invalid text");
    }

    #[test]
    fn timeout_error_message() {
        let err = SpeechError::Timeout(30000);
        assert_eq!(err.to_string(), "Speech synthesis timeout after 30000ms");
    }

    #[test]
    fn rate_limited_error_message() {
        assert_eq!(SpeechError::RateLimited.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn backend_not_registered_names_the_backend() {
        let err = SpeechError::BackendNotRegistered(VoiceBackend::Voicevox);
        assert_eq!(
            err.to_string(),
            "No adapter registered for backend: voicevox"
        );
    }

    #[test]
    fn playback_error_message() {
        let err = SpeechError::Playback("decode error".to_string());
        assert_eq!(err.to_string(), "Playback failed: decode error");
    }

    #[test]
    fn conversion_error_message() {
        let err = SpeechError::Conversion("dictionary missing".to_string());
        assert_eq!(err.to_string(), "Text conversion failed: dictionary missing");
    }
}
