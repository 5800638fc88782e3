//! Session identifier scoping a batch of talks

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token for "the current conversation turn"
///
/// Work tagged with a session id that no longer matches the live session
/// must not produce audible output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Arc<str>);

impl SessionId {
    /// Create a session id from any string token
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref()))
    }

    /// Mint a fresh random session id
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Get the raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for SessionId {
    fn from(token: String) -> Self {
        Self(Arc::from(token))
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self::new(uuid.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let id1 = SessionId::generate();
        let id2 = SessionId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn equal_tokens_compare_equal() {
        assert_eq!(SessionId::from("s1"), SessionId::from("s1".to_string()));
        assert_ne!(SessionId::from("s1"), SessionId::from("s2"));
    }

    #[test]
    fn display_is_the_raw_token() {
        let id = SessionId::new("turn-42");
        assert_eq!(id.to_string(), "turn-42");
        assert_eq!(id.as_str(), "turn-42");
    }

    #[test]
    fn from_uuid() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let id = SessionId::from(uuid);
        assert_eq!(id.as_str(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = SessionId::new("s1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"s1\"");

        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn clones_share_the_token() {
        let id = SessionId::new("shared");
        let cloned = id.clone();
        assert_eq!(id, cloned);
    }
}
