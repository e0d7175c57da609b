//! Helpers shared by notification channels.

/// Truncates `s` to at most `max_len` bytes, backing off to the nearest char
/// boundary, and marks the cut.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}
