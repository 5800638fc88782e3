//! Completion signalling for spoken talks
//!
//! Each talk resolves exactly one [`SpeechOutcome`], whether it played, was
//! skipped, failed or was cancelled by a session change.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// Why a talk produced no audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing speakable after preprocessing
    Unspeakable,
    /// Captions-only mode is active
    NoAudio,
    /// Speaking was stopped
    Stopped,
}

/// Final state of a talk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Audio was played to the end
    Played,
    /// No audio was produced
    Skipped(SkipReason),
    /// The talk belonged to a session that is no longer live
    Cancelled,
    /// Synthesis or playback failed
    Failed,
}

impl SpeechOutcome {
    #[must_use]
    pub const fn is_played(&self) -> bool {
        matches!(self, Self::Played)
    }
}

/// Callback receiving a talk's outcome
pub type CompletionCallback = Box<dyn FnOnce(SpeechOutcome) + Send + 'static>;

/// Callback fired synchronously when a talk is submitted
pub type StartCallback = Box<dyn FnOnce() + Send + 'static>;

/// Optional hooks for a single `speak` call
#[derive(Default)]
pub struct SpeakCallbacks {
    pub(crate) on_start: Option<StartCallback>,
    pub(crate) on_complete: Option<CompletionCallback>,
}

impl SpeakCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as soon as the talk is submitted
    #[must_use]
    pub fn on_start(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Run `f` with the talk's outcome
    #[must_use]
    pub fn on_complete(mut self, f: impl FnOnce(SpeechOutcome) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for SpeakCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeakCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Sending half of a completion
///
/// Fires at most once. Dropping it unfired resolves the talk as
/// [`SpeechOutcome::Cancelled`].
pub struct CompletionSender {
    tx: Option<oneshot::Sender<SpeechOutcome>>,
    callback: Option<CompletionCallback>,
}

impl CompletionSender {
    /// Create a sender/receiver pair with an optional callback
    #[must_use]
    pub fn new(callback: Option<CompletionCallback>) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Some(tx),
                callback,
            },
            Completion { rx },
        )
    }

    /// Resolve the talk
    pub fn complete(mut self, outcome: SpeechOutcome) {
        self.fire(outcome);
    }

    fn fire(&mut self, outcome: SpeechOutcome) {
        if let Some(callback) = self.callback.take() {
            callback(outcome);
        }
        if let Some(tx) = self.tx.take() {
            // The caller may have dropped the Completion; that's fine
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for CompletionSender {
    fn drop(&mut self) {
        self.fire(SpeechOutcome::Cancelled);
    }
}

impl fmt::Debug for CompletionSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSender")
            .field("fired", &self.tx.is_none())
            .finish()
    }
}

/// Future resolving to a talk's outcome
#[derive(Debug)]
#[must_use = "a Completion does nothing unless awaited; drop it to fire and forget"]
pub struct Completion {
    rx: oneshot::Receiver<SpeechOutcome>,
}

impl Completion {
    /// Outcome if already resolved, without waiting
    pub fn try_outcome(&mut self) -> Option<SpeechOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(SpeechOutcome::Cancelled),
        }
    }
}

impl Future for Completion {
    type Output = SpeechOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(SpeechOutcome::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn complete_resolves_future() {
        let (sender, completion) = CompletionSender::new(None);
        sender.complete(SpeechOutcome::Played);
        assert_eq!(completion.await, SpeechOutcome::Played);
    }

    #[tokio::test]
    async fn dropping_sender_cancels() {
        let (sender, completion) = CompletionSender::new(None);
        drop(sender);
        assert_eq!(completion.await, SpeechOutcome::Cancelled);
    }

    #[test]
    fn completion_pends_until_fired() {
        let (sender, completion) = CompletionSender::new(None);
        let mut completion = tokio_test::task::spawn(completion);

        tokio_test::assert_pending!(completion.poll());

        sender.complete(SpeechOutcome::Skipped(SkipReason::NoAudio));
        assert!(completion.is_woken());
        tokio_test::assert_ready_eq!(
            completion.poll(),
            SpeechOutcome::Skipped(SkipReason::NoAudio)
        );
    }

    #[test]
    fn callback_fires_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (sender, _completion) = CompletionSender::new(Some(Box::new(move |outcome| {
            assert_eq!(outcome, SpeechOutcome::Failed);
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        sender.complete(SpeechOutcome::Failed);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_receives_cancelled_on_drop() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let slot = Arc::clone(&seen);
        let (sender, _completion) =
            CompletionSender::new(Some(Box::new(move |outcome| *slot.lock() = Some(outcome))));

        drop(sender);

        assert_eq!(*seen.lock(), Some(SpeechOutcome::Cancelled));
    }

    #[test]
    fn try_outcome_before_and_after() {
        let (sender, mut completion) = CompletionSender::new(None);
        assert_eq!(completion.try_outcome(), None);

        sender.complete(SpeechOutcome::Skipped(SkipReason::NoAudio));
        assert_eq!(
            completion.try_outcome(),
            Some(SpeechOutcome::Skipped(SkipReason::NoAudio))
        );
    }

    #[test]
    fn callbacks_builder_records_hooks() {
        let callbacks = SpeakCallbacks::new().on_start(|| {}).on_complete(|_| {});
        let debug = format!("{callbacks:?}");
        assert!(debug.contains("on_start: true"));
        assert!(debug.contains("on_complete: true"));
    }
}
