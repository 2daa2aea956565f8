/// Render `bytes` for human-readable debug output.
///
/// Printable ASCII passes through untouched, everything else becomes a
/// `\xNN` hex escape.
///
/// # Examples
///
/// ```
/// use bytediff_scan::escape_bytes;
///
/// assert_eq!(escape_bytes(b"plain"), "plain");
/// assert_eq!(escape_bytes(b"a\tb\x00"), "a\\x09b\\x00");
/// ```
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..=0x7e).contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02x}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain() {
        assert_eq!(escape_bytes(b"hello world"), "hello world");
    }

    #[test]
    fn test_escape_empty() {
        assert_eq!(escape_bytes(b""), "");
    }

    #[test]
    fn test_escape_control_and_high_bytes() {
        assert_eq!(escape_bytes(b"\x00\x1f\x7f\xff"), "\\x00\\x1f\\x7f\\xff");
        assert_eq!(escape_bytes(b"tab\there"), "tab\\x09here");
    }
}
