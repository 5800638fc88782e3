//! Port definitions for the speech pipeline
//!
//! Defines the traits (ports) that the pipeline's external collaborators
//! implement: synthesis backends, the avatar that plays audio, the
//! notification sink, and the English-to-Japanese reading converter.

use async_trait::async_trait;
use domain::{AudioBuffer, Emotion, Talk};

use crate::config::BackendParams;
use crate::error::SpeechError;
use crate::notification::Notification;

/// One backend call: a text snapshot plus the selected backend's parameters
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Text to synthesize, read at the moment the call is issued
    pub text: String,
    /// Emotion of the talk
    pub emotion: Emotion,
    /// Output language (ISO 639-1)
    pub language: String,
    /// Parameters of the selected backend only
    pub params: BackendParams,
}

/// Port for speech synthesis backends
///
/// Every vendor is reached through this single capability so the pipeline
/// treats all backends uniformly.
///
/// # Example
///
/// ```ignore
/// use ai_speech::{SpeechSynthesizer, SynthesisRequest};
///
/// async fn render(backend: &dyn SpeechSynthesizer, request: &SynthesisRequest) {
///     let audio = backend.synthesize(request).await?;
///     println!("{} bytes from {}", audio.len(), backend.name());
/// }
/// ```
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Convert text to audio bytes
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the backend rejects the request.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, SpeechError>;

    /// Name of the backend, for logs
    fn name(&self) -> &str;
}

/// Port for the avatar that renders audio and keeps its mouth in sync
#[async_trait]
pub trait AvatarSync: Send + Sync {
    /// Play a buffer for a talk; resolves once playback has finished
    ///
    /// `needs_decode` is false when the buffer is already directly playable.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Playback` if decoding or rendering fails.
    async fn speak(
        &self,
        buffer: &AudioBuffer,
        talk: &Talk,
        needs_decode: bool,
    ) -> Result<(), SpeechError>;

    /// Return the avatar to a neutral expression
    fn reset_expression(&self) {}
}

/// Port for user-visible notifications (toasts)
pub trait NotificationSink: Send + Sync {
    /// Show a notification
    fn notify(&self, notification: Notification);
}

/// Port for converting English words into Japanese phonetic readings
#[async_trait]
pub trait ReadingConverter: Send + Sync {
    /// Rewrite `text` with English words replaced by their katakana reading
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Conversion` if the conversion fails.
    async fn convert(&self, text: &str) -> Result<String, SpeechError>;
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    struct EchoSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for EchoSynthesizer {
        async fn synthesize(
            &self,
            request: &SynthesisRequest,
        ) -> Result<AudioBuffer, SpeechError> {
            Ok(AudioBuffer::new(request.text.clone().into_bytes()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[derive(Default)]
    struct RecordingAvatar {
        spoken: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AvatarSync for RecordingAvatar {
        async fn speak(
            &self,
            _buffer: &AudioBuffer,
            talk: &Talk,
            _needs_decode: bool,
        ) -> Result<(), SpeechError> {
            self.spoken.lock().push(talk.text());
            Ok(())
        }
    }

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            emotion: Emotion::Neutral,
            language: "ja".to_string(),
            params: BackendParams::default(),
        }
    }

    #[tokio::test]
    async fn synthesizer_is_object_safe() {
        let backend: Box<dyn SpeechSynthesizer> = Box::new(EchoSynthesizer);
        let audio = backend.synthesize(&request("abc")).await.unwrap();

        assert_eq!(audio.data(), b"abc");
        assert_eq!(backend.name(), "echo");
    }

    #[tokio::test]
    async fn avatar_default_reset_is_a_no_op() {
        let avatar = RecordingAvatar::default();
        let talk = Talk::new("hello", Emotion::Happy);

        avatar
            .speak(&AudioBuffer::new(vec![1]), &talk, true)
            .await
            .unwrap();
        avatar.reset_expression();

        assert_eq!(*avatar.spoken.lock(), vec!["hello".to_string()]);
    }
}
