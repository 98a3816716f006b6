//! Logging utilities for keeping player text and stored blobs on a single log line.
//! Escapes control characters that otherwise break log readability.

/// Cap for [`escape_log`] output.
const MAX_PREVIEW: usize = 300;
/// Shorter cap for raw save blobs, which can be large.
const MAX_BLOB_PREVIEW: usize = 120;

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///
/// Truncates long strings with an ellipsis.
pub fn escape_log(s: &str) -> String {
    escape_with_limit(s, MAX_PREVIEW)
}

/// Lossy, escaped and truncated view of raw bytes, for warnings about a save
/// that could not be read.
pub fn preview_blob(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    format!(
        "{} ({} bytes)",
        escape_with_limit(&text, MAX_BLOB_PREVIEW),
        bytes.len()
    )
}

fn escape_with_limit(s: &str, limit: usize) -> String {
    let mut out = String::with_capacity(s.len().min(limit) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= limit {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_newlines_and_tabs() {
        assert_eq!(escape_log("Line1\nLine2\r\tEnd"), "Line1\\nLine2\\r\\tEnd");
    }

    #[test]
    fn blob_preview_is_bounded() {
        let blob = vec![b'x'; 1_000];
        let preview = preview_blob(&blob);
        assert!(preview.starts_with(&"x".repeat(MAX_BLOB_PREVIEW)));
        assert!(preview.ends_with("… (1000 bytes)"));
    }

    #[test]
    fn blob_preview_survives_invalid_utf8() {
        let preview = preview_blob(&[0xff, b'{', 0x00]);
        assert!(preview.contains('{'));
        assert!(preview.contains("\\x00"));
    }
}
