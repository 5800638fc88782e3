//! Rate-limited fetch pipeline
//!
//! Serializes backend calls and hands their audio to the playback queue in
//! submission order.
//!
//! Submission is synchronous: the talk is preprocessed and tagged with its
//! session right away, then queued as a job for a single worker. The worker
//! runs one backend call at a time, so call N+1 never starts before call N
//! has settled, while the caller is free to prepare the next talk.
//!
//! ```text
//! submit ─▶ preprocess ─▶ mpsc ─▶ worker: wait floor ─▶ backend ─▶ PlaybackQueue
//!                │
//!                └─▶ (optional) reading rewrite, fire-and-forget
//! ```

use std::sync::Arc;

use domain::{AudioBuffer, SessionId, Talk};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::completion::{Completion, CompletionSender, SkipReason, SpeakCallbacks, SpeechOutcome};
use crate::config::{SettingsStore, SpeechSettings};
use crate::error::SpeechError;
use crate::notification::Notification;
use crate::playback::{AudioTask, PlaybackQueue};
use crate::ports::{NotificationSink, ReadingConverter, SynthesisRequest};
use crate::preprocess;
use crate::registry::BackendRegistry;

/// One submitted talk waiting for its turn at the backend
struct SynthesisJob {
    talk: Talk,
    session: SessionId,
    settings: Arc<SpeechSettings>,
    completion: CompletionSender,
}

/// How a job's audio was resolved
enum Resolved {
    Task(AudioTask),
    NoAudio(CompletionSender, SpeechOutcome),
}

/// Handle to the fetch pipeline
///
/// Cloning yields another handle feeding the same worker.
#[derive(Clone)]
pub struct FetchPipeline {
    jobs: mpsc::UnboundedSender<SynthesisJob>,
    queue: PlaybackQueue,
    settings: SettingsStore,
    converter: Option<Arc<dyn ReadingConverter>>,
}

impl std::fmt::Debug for FetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPipeline")
            .field("queue", &self.queue)
            .field("converter", &self.converter.is_some())
            .finish()
    }
}

impl FetchPipeline {
    /// Create the pipeline and spawn its fetch worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        registry: Arc<BackendRegistry>,
        queue: PlaybackQueue,
        notifier: Arc<dyn NotificationSink>,
        settings: SettingsStore,
        converter: Option<Arc<dyn ReadingConverter>>,
    ) -> Self {
        let (jobs, receiver) = mpsc::unbounded_channel();

        let worker = FetchWorker {
            registry,
            queue: queue.clone(),
            notifier,
            last_success: None,
        };
        tokio::spawn(worker.run(receiver));

        Self {
            jobs,
            queue,
            settings,
            converter,
        }
    }

    /// Submit a talk for synthesis and playback
    ///
    /// `on_start` runs before anything else. The returned completion
    /// resolves once the talk has played, been skipped, failed, or been
    /// cancelled by a session change.
    #[instrument(skip(self, talk, callbacks), fields(session = %session))]
    pub fn submit(&self, session: SessionId, talk: Talk, callbacks: SpeakCallbacks) -> Completion {
        let settings = self.settings.snapshot();
        let SpeakCallbacks {
            on_start,
            on_complete,
        } = callbacks;

        if let Some(on_start) = on_start {
            on_start();
        }
        let (completion, handle) = CompletionSender::new(on_complete);

        self.queue.check_session_id(&session);

        match preprocess::prepare(&talk.text(), &settings) {
            Some(prepared) => {
                talk.set_text(prepared.text.clone());
                if prepared.needs_reading {
                    self.schedule_reading(&talk, prepared.text);
                }
            },
            None if talk.has_buffer() => talk.set_text(String::new()),
            None => {
                debug!("Nothing speakable in talk, dropping it");
                completion.complete(SpeechOutcome::Skipped(SkipReason::Unspeakable));
                return handle;
            },
        }

        let job = SynthesisJob {
            talk,
            session,
            settings,
            completion,
        };
        if self.jobs.send(job).is_err() {
            // The job comes back inside the error and cancels on drop
            warn!("Fetch worker has stopped, talk cancelled");
        }

        handle
    }

    /// Rewrite English words in the talk into a Japanese reading
    ///
    /// Not awaited: the backend call may read either the original or the
    /// rewritten text, whichever is current when the talk's turn comes.
    fn schedule_reading(&self, talk: &Talk, text: String) {
        let Some(converter) = self.converter.clone() else {
            debug!("No reading converter configured, keeping English text");
            return;
        };

        let talk = talk.clone();
        tokio::spawn(async move {
            match converter.convert(&text).await {
                Ok(converted) => {
                    debug!(from = %text, to = %converted, "Applied Japanese reading");
                    talk.set_text(converted);
                },
                Err(e) => warn!(error = %e, "Reading conversion failed, keeping original text"),
            }
        });
    }
}

/// Owns the pipeline's mutable state; only the worker task touches it
struct FetchWorker {
    registry: Arc<BackendRegistry>,
    queue: PlaybackQueue,
    notifier: Arc<dyn NotificationSink>,
    /// Completion time of the last successful backend call
    last_success: Option<Instant>,
}

impl FetchWorker {
    async fn run(mut self, mut jobs: mpsc::UnboundedReceiver<SynthesisJob>) {
        while let Some(job) = jobs.recv().await {
            self.process(job).await;
        }
        debug!("Fetch pipeline closed");
    }

    #[instrument(skip(self, job), fields(session = %job.session, backend = %job.settings.backend))]
    async fn process(&mut self, job: SynthesisJob) {
        let Some(job) = self.still_live(job) else {
            return;
        };
        self.wait_for_rate_limit(&job.settings).await;
        // The session may have moved on while waiting
        let Some(job) = self.still_live(job) else {
            return;
        };

        match self.resolve(job).await {
            Resolved::Task(task) => self.queue.add_task(task),
            Resolved::NoAudio(completion, outcome) => completion.complete(outcome),
        }
    }

    /// Cancel the job, without calling the backend, if its session is stale
    fn still_live(&self, job: SynthesisJob) -> Option<SynthesisJob> {
        if self.queue.is_live(&job.session) {
            return Some(job);
        }
        debug!("Session changed before the talk's turn, cancelling it");
        job.completion.complete(SpeechOutcome::Cancelled);
        None
    }

    /// Keep the configured spacing after the last successful call
    async fn wait_for_rate_limit(&self, settings: &SpeechSettings) {
        let Some(last) = self.last_success else {
            return;
        };
        let ready_at = last + settings.min_call_interval();
        if Instant::now() < ready_at {
            debug!(
                wait_ms = (ready_at - Instant::now()).as_millis(),
                "Waiting for rate limit"
            );
            tokio::time::sleep_until(ready_at).await;
        }
    }

    async fn resolve(&mut self, job: SynthesisJob) -> Resolved {
        let SynthesisJob {
            talk,
            session,
            settings,
            completion,
        } = job;

        let text = talk.text();

        if text.is_empty() {
            return match AudioTask::prerecorded(talk, session, completion) {
                Ok(task) => Resolved::Task(task),
                Err(completion) => {
                    Resolved::NoAudio(completion, SpeechOutcome::Skipped(SkipReason::Unspeakable))
                },
            };
        }

        if settings.audio_mode {
            return Resolved::NoAudio(completion, SpeechOutcome::Skipped(SkipReason::NoAudio));
        }

        let request = SynthesisRequest {
            text,
            emotion: talk.emotion(),
            language: settings.language.clone(),
            params: settings.selected_params(),
        };

        match self.call_backend(&settings, &request).await {
            Ok(buffer) => {
                self.last_success = Some(Instant::now());
                Resolved::Task(AudioTask::synthesized(buffer, talk, session, completion))
            },
            Err(e) if !self.queue.is_live(&session) => {
                debug!(error = %e, "Synthesis failed for a stale session, not reporting");
                Resolved::NoAudio(completion, SpeechOutcome::Cancelled)
            },
            Err(e) => {
                let service = settings.backend.service_name();
                // The notification sink reports it to the user
                warn!(service, error = %e, "Speech synthesis failed");
                self.notifier.notify(Notification::tts_error(service, &e));
                Resolved::NoAudio(completion, SpeechOutcome::Failed)
            },
        }
    }

    async fn call_backend(
        &self,
        settings: &SpeechSettings,
        request: &SynthesisRequest,
    ) -> Result<AudioBuffer, SpeechError> {
        let adapter = self
            .registry
            .get(settings.backend)
            .ok_or(SpeechError::BackendNotRegistered(settings.backend))?;

        debug!(adapter = adapter.name(), text_len = request.text.len(), "Calling backend");

        tokio::time::timeout(settings.synthesis_timeout(), adapter.synthesize(request))
            .await
            .map_err(|_| SpeechError::Timeout(settings.synthesis_timeout_ms))?
    }
}
