use std::ops::Range;

pub const MENTION_PREFIX: char = '@';

/// Handles of this length are full public keys and are resolved elsewhere, not searched.
pub const FULL_KEY_MENTION_LEN: usize = 64;

/// Byte range of the `@handle` driving user search, prefix included.
///
/// Only the first `@`-prefixed whitespace-separated token counts; if that one is
/// rejected there is no mention, even when a later token would qualify.
pub fn mention_token_range(text: &str) -> Option<Range<usize>> {
    let handle = text
        .split(char::is_whitespace)
        .find(|token| token.starts_with(MENTION_PREFIX))?;

    // Counted in Unicode scalar values, not grapheme clusters.
    let length = handle.chars().count() - 1;
    if length == 0 || length == FULL_KEY_MENTION_LEN {
        return None;
    }

    let start = handle.as_ptr() as usize - text.as_ptr() as usize;
    Some(start..start + handle.len())
}

/// Partial handle the user is typing, without its `@`.
pub fn extract_mention_token(text: &str) -> Option<&str> {
    mention_token_range(text).map(|range| &text[range.start + MENTION_PREFIX.len_utf8()..range.end])
}
