use regex::Regex;
use std::sync::OnceLock;

fn emphasis_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Lightweight markdown emphasis/heading markers only. Answers are
        // spoken aloud, so `**bold**` and `## heading` must not leak into
        // the TTS input, but link/list syntax is left alone.
        Regex::new(r"\*+|#+").expect("valid emphasis regex")
    })
}

/// Strip markdown emphasis and heading markers from an assistant answer.
///
/// Idempotent: stripping an already-stripped string yields the same string.
pub fn strip_markdown_emphasis(text: &str) -> String {
    emphasis_marker_re().replace_all(text, "").to_string()
}

/// Validates a finalized transcript before any network call.
///
/// Returns `None` for empty or whitespace-only input.
pub fn normalize_utterance(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_emphasis_and_headings() {
        assert_eq!(strip_markdown_emphasis("**It's 3pm**"), "It's 3pm");
        assert_eq!(strip_markdown_emphasis("## Answer\n*ok*"), " Answer\nok");
    }

    #[test]
    fn stripping_is_idempotent() {
        let once = strip_markdown_emphasis("some ***very** important* #note");
        let twice = strip_markdown_emphasis(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_markdown_emphasis("what time is it"), "what time is it");
    }

    #[test]
    fn normalize_rejects_whitespace_only() {
        assert_eq!(normalize_utterance(""), None);
        assert_eq!(normalize_utterance("  \n\t"), None);
        assert_eq!(normalize_utterance(" hello "), Some("hello".to_string()));
    }
}
