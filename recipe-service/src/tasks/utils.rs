//! Text helpers shared by the normalization stages.

/// Sentence-ending punctuation, full-width and ASCII.
pub const TERMINAL_PUNCTUATION: &[char] = &['。', '！', '？', '.', '!', '?'];

/// Keep at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Keep at most `max` characters, ending in `...` when something was cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

/// Hiragana, katakana, CJK ideographs and full-width forms.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF66}'..='\u{FF9F}'
    )
}

pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

pub fn contains_latin(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic())
}

pub fn ends_with_terminal_punctuation(text: &str) -> bool {
    text.ends_with(TERMINAL_PUNCTUATION)
}

/// Append `。` to CJK text or `.` to Latin text that lacks a sentence ending.
pub fn ensure_terminal_punctuation(text: &str) -> String {
    if text.is_empty() || ends_with_terminal_punctuation(text) {
        return text.to_string();
    }
    if contains_cjk(text) {
        format!("{text}。")
    } else if contains_latin(text) {
        format!("{text}.")
    } else {
        text.to_string()
    }
}
