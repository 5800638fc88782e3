//! Text preprocessing before synthesis
//!
//! Decides whether an utterance is worth synthesizing and normalizes it:
//! surrounding whitespace is trimmed, emoji are stripped, and text made only
//! of punctuation or symbols is rejected.

use crate::config::SpeechSettings;

/// Punctuation, brackets, quotes and math/currency symbols (ASCII and
/// full-width) that are not worth synthesizing on their own
pub const SYMBOL_CHARS: &[char] = &[
    '!', '?', '.', ',', '。', '、', '．', '，', '\'', '"', '(', ')', '{', '}', '[', ']', '<', '>',
    '+', '=', '-', '*', '/', '\\', '|', ';', ':', '@', '#', '$', '%', '^', '&', '_', '~', '！',
    '？', '（', '）', '「', '」', '『', '』', '【', '】', '〔', '〕', '［', '］', '｛', '｝', '〈',
    '〉', '《', '》', '｢', '｣', '：', '；', '＋', '－', '＊', '／', '＝', '＜', '＞', '％', '＆',
    '＾', '｜', '～', '＠', '＃', '＄', '＿', '＂', '　',
];

/// Text that survived preprocessing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedText {
    /// Normalized text
    pub text: String,
    /// English words should be rewritten into a Japanese reading
    pub needs_reading: bool,
}

/// Whether a code point is pictographic and should be stripped
fn is_emoji(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F300..=0x1F9FF // symbols & pictographs, emoticons, transport, supplemental
            | 0x1F1E0..=0x1F1FF // regional indicators (flags)
            | 0x2600..=0x26FF // miscellaneous symbols
            | 0x2700..=0x27BF // dingbats
            | 0xFE00..=0xFE0F // variation selectors left behind by emoji
            | 0x200D // zero width joiner
    )
}

/// Remove emoji and pictographic code points
#[must_use]
pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|&c| !is_emoji(c)).collect()
}

/// Whether the text consists only of symbols and whitespace
#[must_use]
pub fn is_only_symbols(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_whitespace() || SYMBOL_CHARS.contains(&c))
}

/// Whether the text contains Latin letters
#[must_use]
pub fn contains_english(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic())
}

/// Normalize raw utterance text
///
/// Returns `None` when nothing speakable remains.
#[must_use]
pub fn normalize(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Emoji go first so they are never mistaken for speakable content
    let stripped = strip_emoji(trimmed);
    let processed = stripped.trim();

    if processed.is_empty() || is_only_symbols(processed) {
        return None;
    }

    Some(processed.to_string())
}

/// Normalize a talk's text under the given settings
///
/// The returned text is never itself rewritten into a Japanese reading;
/// `needs_reading` only tells the caller to schedule that rewrite.
#[must_use]
pub fn prepare(text: &str, settings: &SpeechSettings) -> Option<PreparedText> {
    let text = normalize(text)?;
    let needs_reading = settings.wants_japanese_reading() && contains_english(&text);
    Some(PreparedText {
        text,
        needs_reading,
    })
}
