//! Unicode-safe helpers for working with UTF-8 strings.

use unicode_width::UnicodeWidthChar;

/// Truncate `s` so that it occupies at most `max` terminal columns.
/// A trailing `…` marks truncated lines.
pub fn truncate_to_width(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut width = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max {
            // Make room for the ellipsis.
            while width + 1 > max {
                match out.pop() {
                    Some(p) => width -= p.width().unwrap_or(0),
                    None => break,
                }
            }
            out.push('…');
            return out;
        }
        width += w;
        out.push(c);
    }
    out
}
