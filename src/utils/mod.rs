//! Utilities (shell quoting, path expansion, redaction, unicode helpers).

use std::path::PathBuf;

use directories::BaseDirs;

pub mod redact;
pub mod unicode;

pub use redact::Redactor;

/// Quote a string for safe interpolation into a POSIX `sh -c` command line.
///
/// Strings made only of safe characters are returned unchanged; everything else
/// is wrapped in single quotes with embedded quotes written as `'\''`.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '=' | '+' | ','));
    if safe {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Expand a leading `~` to the current user's home directory.
pub fn expand_home(input: &str) -> PathBuf {
    let home = || BaseDirs::new().map(|b| b.home_dir().to_path_buf());
    if input == "~" {
        if let Some(h) = home() {
            return h;
        }
    } else if let Some(rest) = input.strip_prefix("~/") {
        if let Some(h) = home() {
            return h.join(rest);
        }
    }
    PathBuf::from(input)
}
