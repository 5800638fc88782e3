//! Speaker - the caller-facing entry point
//!
//! Wires the fetch pipeline, the playback queue and the external
//! collaborators together and exposes fire-and-forget `speak`.

use std::sync::Arc;

use domain::{Emotion, SessionId, Talk};
use tracing::{info, instrument};

use crate::completion::{Completion, SpeakCallbacks};
use crate::config::{SettingsStore, VoiceBackend};
use crate::error::SpeechError;
use crate::notification::TracingNotificationSink;
use crate::pipeline::FetchPipeline;
use crate::playback::PlaybackQueue;
use crate::ports::{
    AvatarSync, NotificationSink, ReadingConverter, SpeechSynthesizer, SynthesisRequest,
};
use crate::registry::BackendRegistry;

/// Builder for [`Speaker`]
pub struct SpeakerBuilder {
    settings: SettingsStore,
    registry: BackendRegistry,
    avatar: Option<Arc<dyn AvatarSync>>,
    notifier: Arc<dyn NotificationSink>,
    converter: Option<Arc<dyn ReadingConverter>>,
}

impl std::fmt::Debug for SpeakerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeakerBuilder")
            .field("registry", &self.registry)
            .field("avatar", &self.avatar.is_some())
            .field("converter", &self.converter.is_some())
            .finish_non_exhaustive()
    }
}

impl SpeakerBuilder {
    /// Use these backend adapters
    #[must_use]
    pub fn registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a single backend adapter
    #[must_use]
    pub fn backend(
        mut self,
        backend: VoiceBackend,
        adapter: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        self.registry.register(backend, adapter);
        self
    }

    /// Avatar that plays audio (required)
    #[must_use]
    pub fn avatar(mut self, avatar: Arc<dyn AvatarSync>) -> Self {
        self.avatar = Some(avatar);
        self
    }

    /// Where synthesis errors are reported (defaults to the log)
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Converter for the English-to-Japanese reading rewrite
    #[must_use]
    pub fn reading_converter(mut self, converter: Arc<dyn ReadingConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Spawn the pipeline and playback workers
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if no avatar was given or the
    /// current settings are invalid.
    pub fn build(self) -> Result<Speaker, SpeechError> {
        let avatar = self
            .avatar
            .ok_or_else(|| SpeechError::Configuration("An avatar is required".to_string()))?;
        self.settings
            .snapshot()
            .validate()
            .map_err(SpeechError::Configuration)?;

        let registry = Arc::new(self.registry);
        let queue = PlaybackQueue::spawn(Arc::clone(&avatar), self.settings.clone());
        let pipeline = FetchPipeline::spawn(
            Arc::clone(&registry),
            queue.clone(),
            self.notifier,
            self.settings.clone(),
            self.converter,
        );

        info!(backends = ?registry.backends(), "Speaker ready");

        Ok(Speaker {
            pipeline,
            queue,
            registry,
            avatar,
            settings: self.settings,
        })
    }
}

/// Speaks talks in order against the configured backend
#[derive(Clone)]
pub struct Speaker {
    pipeline: FetchPipeline,
    queue: PlaybackQueue,
    registry: Arc<BackendRegistry>,
    avatar: Arc<dyn AvatarSync>,
    settings: SettingsStore,
}

impl std::fmt::Debug for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Speaker")
            .field("pipeline", &self.pipeline)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Speaker {
    /// Start building a speaker around shared settings
    #[must_use]
    pub fn builder(settings: SettingsStore) -> SpeakerBuilder {
        SpeakerBuilder {
            settings,
            registry: BackendRegistry::new(),
            avatar: None,
            notifier: Arc::new(TracingNotificationSink),
            converter: None,
        }
    }

    /// Speak a talk within a session
    ///
    /// Never fails; the completion reports what happened.
    pub fn speak(&self, session: SessionId, talk: Talk) -> Completion {
        self.pipeline.submit(session, talk, SpeakCallbacks::new())
    }

    /// Speak a talk with start/complete hooks
    pub fn speak_with(
        &self,
        session: SessionId,
        talk: Talk,
        callbacks: SpeakCallbacks,
    ) -> Completion {
        self.pipeline.submit(session, talk, callbacks)
    }

    /// Make `session` live, cancelling queued audio from older sessions
    pub fn check_session_id(&self, session: &SessionId) {
        self.queue.check_session_id(session);
    }

    /// Stop speaking and drop everything queued
    pub fn stop_all(&self) {
        self.queue.stop_all();
    }

    /// Drop queued audio without stopping
    pub fn clear_queue(&self) {
        self.queue.clear();
    }

    /// Whether an adapter is registered for `backend`
    #[must_use]
    pub fn has_backend(&self, backend: VoiceBackend) -> bool {
        self.registry.contains(backend)
    }

    /// Shared settings
    #[must_use]
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// The playback queue
    #[must_use]
    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    /// Synthesize and play a sample directly, bypassing the queue and the
    /// rate limit (used to try out a backend)
    ///
    /// # Errors
    ///
    /// Returns the backend or avatar error.
    #[instrument(skip(self, text), fields(backend = %backend))]
    pub async fn test_backend(&self, backend: VoiceBackend, text: &str) -> Result<(), SpeechError> {
        let adapter = self
            .registry
            .get(backend)
            .ok_or(SpeechError::BackendNotRegistered(backend))?;
        let settings = self.settings.snapshot();

        let talk = Talk::new(text, Emotion::Neutral);
        let request = SynthesisRequest {
            text: text.to_string(),
            emotion: Emotion::Neutral,
            language: settings.language.clone(),
            params: settings.backends.get(&backend).cloned().unwrap_or_default(),
        };

        let buffer = tokio::time::timeout(settings.synthesis_timeout(), adapter.synthesize(&request))
            .await
            .map_err(|_| SpeechError::Timeout(settings.synthesis_timeout_ms))??;

        self.avatar.speak(&buffer, &talk, true).await
    }
}
