//! Console stand-in for the avatar
//!
//! Logs each clip, optionally saves it to disk, and holds the queue for
//! roughly as long as the clip would take to play.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ai_speech::{AvatarSync, SpeechError};
use async_trait::async_trait;
use domain::{AudioBuffer, Talk};
use tracing::{debug, info};

/// Rough byte rate of 128 kbit/s MP3
const BYTES_PER_SECOND: u64 = 16_000;

/// Upper bound for a single simulated clip
const MAX_CLIP: Duration = Duration::from_secs(30);

/// Estimate how long a clip plays
pub fn estimated_duration(buffer: &AudioBuffer) -> Duration {
    let len = u64::try_from(buffer.len()).unwrap_or(u64::MAX);
    Duration::from_millis(len.saturating_mul(1000) / BYTES_PER_SECOND).min(MAX_CLIP)
}

/// File extension for a clip's MIME type
pub fn extension_for(mime_type: Option<&str>) -> &'static str {
    match mime_type {
        Some("audio/mpeg") => "mp3",
        Some("audio/wav" | "audio/x-wav") => "wav",
        Some("audio/ogg") => "ogg",
        _ => "bin",
    }
}

/// Avatar that plays audio into the log
#[derive(Debug, Default)]
pub struct ConsoleAvatar {
    save_dir: Option<PathBuf>,
    clips: AtomicUsize,
}

impl ConsoleAvatar {
    /// Create an avatar, saving clips into `save_dir` when given
    pub fn new(save_dir: Option<PathBuf>) -> Self {
        Self {
            save_dir,
            clips: AtomicUsize::new(0),
        }
    }

    /// Number of clips played so far
    pub fn clips_played(&self) -> usize {
        self.clips.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AvatarSync for ConsoleAvatar {
    async fn speak(
        &self,
        buffer: &AudioBuffer,
        talk: &Talk,
        needs_decode: bool,
    ) -> Result<(), SpeechError> {
        let index = self.clips.fetch_add(1, Ordering::Relaxed) + 1;
        let duration = estimated_duration(buffer);

        info!(
            clip = index,
            emotion = %talk.emotion(),
            text = %talk.text(),
            bytes = buffer.len(),
            needs_decode,
            "Speaking"
        );

        if let Some(dir) = &self.save_dir {
            let path = dir.join(format!(
                "{index:03}.{}",
                extension_for(buffer.mime_type())
            ));
            tokio::fs::write(&path, buffer.data())
                .await
                .map_err(|e| SpeechError::Playback(format!("Failed to save clip: {e}")))?;
            debug!(path = %path.display(), "Saved clip");
        }

        tokio::time::sleep(duration).await;
        Ok(())
    }

    fn reset_expression(&self) {
        debug!("Expression reset to neutral");
    }
}
