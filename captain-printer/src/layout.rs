//! Column helpers for the 32-character receipt grid
//!
//! Receipt text is single-width Latin script, so one char is one column.

/// Fit `s` into exactly `width` columns, left aligned
///
/// Longer text is cut at `width`; shorter text is padded with spaces.
pub fn fit_left(s: &str, width: usize) -> String {
    let mut out: String = s.chars().take(width).collect();
    let used = out.chars().count();
    out.extend(std::iter::repeat_n(' ', width - used));
    out
}

/// Break `s` into pieces of at most `width` columns, never splitting a char
pub fn wrap(s: &str, width: usize) -> Vec<String> {
    if s.is_empty() || width == 0 {
        return vec![s.to_string()];
    }
    let chars: Vec<char> = s.chars().collect();
    chars.chunks(width).map(String::from_iter).collect()
}
