//! Property-based tests for domain value objects
//!
//! These tests use proptest to verify invariants across many random inputs.

use domain::value_objects::{Emotion, SessionId};
use proptest::prelude::*;

// ============================================================================
// Emotion Property Tests
// ============================================================================

mod emotion_tests {
    use super::*;

    proptest! {
        #[test]
        fn parse_ignores_case(index in 0usize..Emotion::ALL.len(), upper in any::<bool>()) {
            let emotion = Emotion::ALL[index];
            let tag = if upper {
                emotion.as_str().to_uppercase()
            } else {
                emotion.as_str().to_string()
            };
            prop_assert_eq!(tag.parse::<Emotion>().ok(), Some(emotion));
        }

        #[test]
        fn lossy_parse_falls_back_to_neutral(tag in "[0-9]{1,8}") {
            prop_assert_eq!(Emotion::from_tag_lossy(&tag), Emotion::Neutral);
        }
    }
}

// ============================================================================
// SessionId Property Tests
// ============================================================================

mod session_id_tests {
    use super::*;

    proptest! {
        #[test]
        fn equality_follows_token(a in "[a-z0-9-]{1,16}", b in "[a-z0-9-]{1,16}") {
            prop_assert_eq!(SessionId::new(&a) == SessionId::new(&b), a == b);
        }

        #[test]
        fn display_is_the_token(token in "[a-zA-Z0-9_-]{1,32}") {
            prop_assert_eq!(SessionId::from(token.as_str()).to_string(), token);
        }
    }
}
