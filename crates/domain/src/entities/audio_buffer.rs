//! Audio buffer entity

use bytes::Bytes;

/// Encoded or directly playable audio bytes
///
/// Cloning is cheap; the bytes are reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    data: Bytes,
    mime_type: Option<String>,
}

impl AudioBuffer {
    /// Wrap raw audio bytes
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
        }
    }

    /// Attach a MIME type (e.g. `audio/mpeg`)
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Borrow the raw bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a cheap handle to the bytes
    #[must_use]
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// MIME type, if known
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no audio at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for AudioBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_has_no_mime_type() {
        let buffer = AudioBuffer::new(vec![1, 2, 3]);
        assert_eq!(buffer.len(), 3);
        assert!(buffer.mime_type().is_none());
        assert!(!buffer.is_empty());
    }

    #[test]
    fn with_mime_type() {
        let buffer = AudioBuffer::new(vec![0xFF, 0xFB]).with_mime_type("audio/mpeg");
        assert_eq!(buffer.mime_type(), Some("audio/mpeg"));
    }

    #[test]
    fn clones_share_bytes() {
        let buffer = AudioBuffer::new(vec![9; 1024]);
        let cloned = buffer.clone();
        assert_eq!(buffer.data().as_ptr(), cloned.data().as_ptr());
    }

    #[test]
    fn empty_buffer() {
        let buffer = AudioBuffer::from(Vec::new());
        assert!(buffer.is_empty());
    }
}
