//! User-facing notifications for synthesis failures

use std::time::Duration;

use tracing::error;

use crate::error::SpeechError;
use crate::ports::NotificationSink;

/// Stable tag so repeated synthesis errors can be deduplicated by the sink
pub const TTS_ERROR_TAG: &str = "tts-error";

/// How long a synthesis error stays on screen
pub const TTS_ERROR_DURATION: Duration = Duration::from_millis(5000);

/// Severity of a notification
///
/// The pipeline only reports failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
}

/// A structured toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Service the notification is about
    pub service: String,
    /// Display text
    pub message: String,
    pub kind: NotificationKind,
    /// How long to show the notification
    pub duration: Duration,
    /// Category tag for deduplication
    pub tag: String,
}

impl Notification {
    /// Build the notification for a failed synthesis call
    #[must_use]
    pub fn tts_error(service: &str, err: &SpeechError) -> Self {
        Self {
            service: service.to_string(),
            message: format!("An error occurred in the {service} speech service: {err}"),
            kind: NotificationKind::Error,
            duration: TTS_ERROR_DURATION,
            tag: TTS_ERROR_TAG.to_string(),
        }
    }
}

/// Sink that only writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, notification: Notification) {
        error!(
            service = %notification.service,
            tag = %notification.tag,
            "{}",
            notification.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tts_error_carries_service_and_tag() {
        let err = SpeechError::RateLimited;
        let notification = Notification::tts_error("ElevenLabs", &err);

        assert_eq!(notification.service, "ElevenLabs");
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.tag, "tts-error");
        assert_eq!(notification.duration, Duration::from_secs(5));
        assert!(notification.message.contains("ElevenLabs"));
        assert!(notification.message.contains("Rate limit exceeded"));
    }

    #[test]
    fn tracing_sink_accepts_notifications() {
        let sink = TracingNotificationSink;
        sink.notify(Notification::tts_error(
            "OpenAI",
            &SpeechError::Timeout(1000),
        ));
    }
}
