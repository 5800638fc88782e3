//! Talk entity - one utterance to be spoken

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::entities::AudioBuffer;
use crate::value_objects::Emotion;

/// One utterance: text, an emotion tag and an optional pre-existing buffer
///
/// A `Talk` is a shared handle. Clones refer to the same utterance, and the
/// text can be rewritten in place (e.g. by a reading conversion that finishes
/// after the talk was queued). Readers always see either the old or the new
/// text, never a torn value.
#[derive(Clone)]
pub struct Talk {
    inner: Arc<TalkInner>,
}

struct TalkInner {
    text: RwLock<String>,
    emotion: Emotion,
    buffer: Option<AudioBuffer>,
}

impl Talk {
    /// Create a talk that needs synthesis
    pub fn new(text: impl Into<String>, emotion: Emotion) -> Self {
        Self::build(text.into(), emotion, None)
    }

    /// Create a talk carrying its own audio alongside the text
    pub fn with_buffer(text: impl Into<String>, emotion: Emotion, buffer: AudioBuffer) -> Self {
        Self::build(text.into(), emotion, Some(buffer))
    }

    /// Create a text-less talk that plays a pre-recorded buffer as is
    pub fn prerecorded(buffer: AudioBuffer, emotion: Emotion) -> Self {
        Self::build(String::new(), emotion, Some(buffer))
    }

    fn build(text: String, emotion: Emotion, buffer: Option<AudioBuffer>) -> Self {
        Self {
            inner: Arc::new(TalkInner {
                text: RwLock::new(text),
                emotion,
                buffer,
            }),
        }
    }

    /// Current text (a snapshot; it may be rewritten afterwards)
    pub fn text(&self) -> String {
        self.inner.text.read().clone()
    }

    /// Overwrite the text in place
    pub fn set_text(&self, text: impl Into<String>) {
        *self.inner.text.write() = text.into();
    }

    /// Emotion tag
    pub fn emotion(&self) -> Emotion {
        self.inner.emotion
    }

    /// Pre-existing audio, if any
    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.inner.buffer.as_ref()
    }

    /// Whether a pre-existing buffer is attached
    pub fn has_buffer(&self) -> bool {
        self.inner.buffer.is_some()
    }

    /// Whether two handles refer to the same utterance
    pub fn same_talk(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Talk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Talk")
            .field("text", &*self.inner.text.read())
            .field("emotion", &self.inner.emotion)
            .field("buffer_len", &self.inner.buffer.as_ref().map(AudioBuffer::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_talk_has_no_buffer() {
        let talk = Talk::new("hello", Emotion::Happy);
        assert_eq!(talk.text(), "hello");
        assert_eq!(talk.emotion(), Emotion::Happy);
        assert!(!talk.has_buffer());
    }

    #[test]
    fn prerecorded_talk_has_empty_text() {
        let talk = Talk::prerecorded(AudioBuffer::new(vec![1, 2]), Emotion::Neutral);
        assert!(talk.text().is_empty());
        assert_eq!(talk.buffer().map(AudioBuffer::len), Some(2));
    }

    #[test]
    fn rewrite_is_visible_through_clones() {
        let talk = Talk::new("hello", Emotion::Neutral);
        let handle = talk.clone();

        handle.set_text("ハロー");

        assert_eq!(talk.text(), "ハロー");
        assert!(talk.same_talk(&handle));
    }

    #[test]
    fn distinct_talks_are_not_the_same() {
        let a = Talk::new("same", Emotion::Neutral);
        let b = Talk::new("same", Emotion::Neutral);
        assert!(!a.same_talk(&b));
    }

    #[test]
    fn debug_shows_text_and_emotion() {
        let talk = Talk::with_buffer("hi", Emotion::Sad, AudioBuffer::new(vec![0; 4]));
        let debug = format!("{talk:?}");
        assert!(debug.contains("hi"));
        assert!(debug.contains("Sad"));
        assert!(debug.contains("buffer_len"));
    }
}
