//! Playback queue
//!
//! Plays resolved audio strictly in the order it was added, one task at a
//! time, through the avatar. Tasks from a session that is no longer live are
//! cancelled before they make a sound.
//!
//! # Architecture
//!
//! ```text
//! add_task ──▶ VecDeque<AudioTask> ──▶ worker ──▶ AvatarSync::speak
//!                    ▲                   │
//!     check_session_id (drops stale)     └─ session re-checked before playback
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use domain::{AudioBuffer, SessionId, Talk};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use crate::completion::{CompletionSender, SkipReason, SpeechOutcome};
use crate::config::SettingsStore;
use crate::ports::AvatarSync;

/// A resolved, playable unit of audio
#[derive(Debug)]
pub struct AudioTask {
    buffer: AudioBuffer,
    talk: Talk,
    needs_decode: bool,
    session: SessionId,
    completion: CompletionSender,
}

impl AudioTask {
    /// Task for audio produced by a synthesis backend
    #[must_use]
    pub fn synthesized(
        buffer: AudioBuffer,
        talk: Talk,
        session: SessionId,
        completion: CompletionSender,
    ) -> Self {
        Self {
            buffer,
            talk,
            needs_decode: true,
            session,
            completion,
        }
    }

    /// Task replaying the talk's own pre-existing buffer, which is already
    /// directly playable
    ///
    /// Returns the completion back if the talk carries no buffer.
    pub fn prerecorded(
        talk: Talk,
        session: SessionId,
        completion: CompletionSender,
    ) -> Result<Self, CompletionSender> {
        let Some(buffer) = talk.buffer().cloned() else {
            return Err(completion);
        };
        Ok(Self {
            buffer,
            talk,
            needs_decode: false,
            session,
            completion,
        })
    }

    #[must_use]
    pub fn talk(&self) -> &Talk {
        &self.talk
    }

    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    #[must_use]
    pub const fn needs_decode(&self) -> bool {
        self.needs_decode
    }

    fn complete(self, outcome: SpeechOutcome) {
        self.completion.complete(outcome);
    }
}

#[derive(Debug, Default)]
struct QueueState {
    tasks: VecDeque<AudioTask>,
    current_session: Option<SessionId>,
    /// Cleared by `stop_all`, set again by the next session change
    speaking: bool,
    playing: bool,
    /// Bumped on every accepted task; used to detect a quiet period
    generation: u64,
    closed: bool,
}

impl QueueState {
    fn is_live(&self, session: &SessionId) -> bool {
        self.current_session.as_ref() == Some(session)
    }
}

enum Next {
    Task(AudioTask),
    Suppressed(AudioTask, SpeechOutcome),
    Idle { generation: u64 },
    Closed,
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Notify,
    avatar: Arc<dyn AvatarSync>,
    settings: SettingsStore,
}

impl Shared {
    /// Pop the next task, re-checking it against the live session and the
    /// speaking flag under the same lock
    fn next(&self) -> Next {
        let mut state = self.state.lock();
        if let Some(task) = state.tasks.pop_front() {
            if !state.is_live(&task.session) {
                Next::Suppressed(task, SpeechOutcome::Cancelled)
            } else if !state.speaking {
                Next::Suppressed(task, SpeechOutcome::Skipped(SkipReason::Stopped))
            } else {
                state.playing = true;
                Next::Task(task)
            }
        } else if state.closed {
            Next::Closed
        } else {
            Next::Idle {
                generation: state.generation,
            }
        }
    }

    #[instrument(skip(self, task), fields(session = %task.session, needs_decode = task.needs_decode))]
    async fn play(&self, task: AudioTask) {
        let outcome = match self
            .avatar
            .speak(&task.buffer, &task.talk, task.needs_decode)
            .await
        {
            Ok(()) => SpeechOutcome::Played,
            Err(e) => {
                warn!(error = %e, "Avatar playback failed");
                SpeechOutcome::Failed
            },
        };

        self.state.lock().playing = false;
        task.complete(outcome);
    }

    fn is_quiet_since(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.generation == generation && state.tasks.is_empty() && !state.playing
    }
}

/// Closes the worker once the last queue handle is gone
struct Shutdown(Arc<Shared>);

impl Drop for Shutdown {
    fn drop(&mut self) {
        self.0.state.lock().closed = true;
        self.0.wake.notify_one();
    }
}

/// In-order playback queue
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct PlaybackQueue {
    shared: Arc<Shared>,
    _shutdown: Arc<Shutdown>,
}

impl std::fmt::Debug for PlaybackQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("PlaybackQueue")
            .field("queued", &state.tasks.len())
            .field("current_session", &state.current_session)
            .field("speaking", &state.speaking)
            .field("playing", &state.playing)
            .finish()
    }
}

impl PlaybackQueue {
    /// Create the queue and spawn its playback worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(avatar: Arc<dyn AvatarSync>, settings: SettingsStore) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                speaking: true,
                ..QueueState::default()
            }),
            wake: Notify::new(),
            avatar,
            settings,
        });

        tokio::spawn(run(Arc::clone(&shared)));

        Self {
            _shutdown: Arc::new(Shutdown(Arc::clone(&shared))),
            shared,
        }
    }

    /// Queue a task behind everything already queued
    ///
    /// Tasks from a stale session resolve as cancelled; tasks arriving
    /// after `stop_all` resolve as stopped.
    pub fn add_task(&self, task: AudioTask) {
        let rejected = {
            let mut state = self.shared.state.lock();
            if state.current_session.is_none() {
                state.current_session = Some(task.session.clone());
            }

            if !state.is_live(&task.session) {
                Some((task, SpeechOutcome::Cancelled))
            } else if !state.speaking {
                Some((task, SpeechOutcome::Skipped(SkipReason::Stopped)))
            } else {
                state.tasks.push_back(task);
                state.generation += 1;
                None
            }
        };

        match rejected {
            Some((task, outcome)) => {
                debug!(session = %task.session, ?outcome, "Task rejected by playback queue");
                task.complete(outcome);
            },
            None => self.shared.wake.notify_one(),
        }
    }

    /// Make `session` the live session
    ///
    /// On a change, every queued task from the previous session is cancelled
    /// and speaking resumes if it was stopped. A task that is already playing
    /// finishes.
    pub fn check_session_id(&self, session: &SessionId) {
        let stale = {
            let mut state = self.shared.state.lock();
            if state.is_live(session) {
                return;
            }
            state.current_session = Some(session.clone());
            state.speaking = true;
            std::mem::take(&mut state.tasks)
        };

        if !stale.is_empty() {
            info!(session = %session, cancelled = stale.len(), "Session changed, dropping queued audio");
        }
        for task in stale {
            task.complete(SpeechOutcome::Cancelled);
        }
    }

    /// Drop every queued task
    pub fn clear(&self) {
        let cleared = std::mem::take(&mut self.shared.state.lock().tasks);
        for task in cleared {
            task.complete(SpeechOutcome::Skipped(SkipReason::Stopped));
        }
    }

    /// Stop speaking: clear the queue and ignore new tasks until the session
    /// changes
    pub fn stop_all(&self) {
        self.shared.state.lock().speaking = false;
        self.clear();
        info!("Speech stopped");
    }

    /// Number of tasks waiting (excluding the one playing)
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a task is being played right now
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.shared.state.lock().playing
    }

    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.shared.state.lock().speaking
    }

    /// Whether work tagged with `session` may still produce output
    #[must_use]
    pub fn is_live(&self, session: &SessionId) -> bool {
        let state = self.shared.state.lock();
        state
            .current_session
            .as_ref()
            .is_none_or(|current| current == session)
    }

    #[must_use]
    pub fn current_session(&self) -> Option<SessionId> {
        self.shared.state.lock().current_session.clone()
    }
}

async fn run(shared: Arc<Shared>) {
    let mut played_since_idle = false;

    loop {
        match shared.next() {
            Next::Task(task) => {
                shared.play(task).await;
                played_since_idle = true;
            },
            Next::Suppressed(task, outcome) => {
                debug!(session = %task.session, ?outcome, "Dropping task before playback");
                task.complete(outcome);
            },
            Next::Idle { generation } => {
                if played_since_idle {
                    played_since_idle = false;
                    schedule_idle_reset(Arc::clone(&shared), generation);
                }
                shared.wake.notified().await;
            },
            Next::Closed => {
                debug!("Playback queue closed");
                break;
            },
        }
    }
}

/// Return the avatar to neutral if nothing new arrives during the delay
fn schedule_idle_reset(shared: Arc<Shared>, generation: u64) {
    let delay = shared.settings.snapshot().idle_reset_delay();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if shared.is_quiet_since(generation) {
            debug!("Queue idle, resetting expression");
            shared.avatar.reset_expression();
        }
    });
}
