//! Field helpers for structured logs.

/// First `max_chars` characters of `content`, with `...` appended when cut.
///
/// Counts characters, not bytes, so multi-byte text is never split.
///
/// ```
/// use switchyard::logging::content_preview;
///
/// assert_eq!(content_preview("short", 10), "short");
/// assert_eq!(content_preview("abcdef", 3), "abc...");
/// ```
pub fn content_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((cut, _)) => format!("{}...", &content[..cut]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_short_content() {
        assert_eq!(content_preview("", 5), "");
        assert_eq!(content_preview("exact", 5), "exact");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(content_preview("héllo wörld", 4), "héll...");
        assert_eq!(content_preview("日本語のテキスト", 3), "日本語...");
    }

    #[test]
    fn zero_length_preview() {
        assert_eq!(content_preview("anything", 0), "...");
    }
}
