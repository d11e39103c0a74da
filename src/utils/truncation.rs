const MAX_ERROR_LENGTH: usize = 2_000;

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn head_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Like [`head_chars`] but marks the cut with an ellipsis.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let head = head_chars(text, max_chars);
    if head.len() == text.len() {
        text.to_string()
    } else {
        format!("{}...", head)
    }
}

pub fn truncate_error(error: &str) -> String {
    truncate_with_ellipsis(error, MAX_ERROR_LENGTH)
}
