//! Emotion tag carried by each talk

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Expression the avatar should wear while a talk is spoken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Angry,
    Sad,
    Relaxed,
    Surprised,
}

impl Emotion {
    /// All known emotions
    pub const ALL: [Self; 6] = [
        Self::Neutral,
        Self::Happy,
        Self::Angry,
        Self::Sad,
        Self::Relaxed,
        Self::Surprised,
    ];

    /// Lowercase tag as used in settings and emotion markup
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Angry => "angry",
            Self::Sad => "sad",
            Self::Relaxed => "relaxed",
            Self::Surprised => "surprised",
        }
    }

    /// Parse a tag, falling back to neutral for anything unknown
    #[must_use]
    pub fn from_tag_lossy(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == tag)
            .ok_or_else(|| format!("unknown emotion: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_neutral() {
        assert_eq!(Emotion::default(), Emotion::Neutral);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Happy".parse::<Emotion>().unwrap(), Emotion::Happy);
        assert_eq!(" SAD ".parse::<Emotion>().unwrap(), Emotion::Sad);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!("furious".parse::<Emotion>().is_err());
    }

    #[test]
    fn lossy_parse_falls_back_to_neutral() {
        assert_eq!(Emotion::from_tag_lossy("furious"), Emotion::Neutral);
        assert_eq!(Emotion::from_tag_lossy("relaxed"), Emotion::Relaxed);
    }

    #[test]
    fn display_matches_tag() {
        for emotion in Emotion::ALL {
            assert_eq!(emotion.to_string(), emotion.as_str());
        }
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Emotion::Surprised).unwrap();
        assert_eq!(json, "\"surprised\"");
    }
}
