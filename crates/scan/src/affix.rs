/// Length of the longest byte run shared at the start of `a` and `b`.
///
/// Bounded by `min(a.len(), b.len())`.
///
/// # Examples
///
/// ```
/// use bytediff_scan::common_prefix;
///
/// assert_eq!(common_prefix(b"aaa", b"abc"), 1);
/// assert_eq!(common_prefix(b"aaa", b"aaa"), 3);
/// assert_eq!(common_prefix(b"", b"abc"), 0);
/// ```
pub fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Length of the longest byte run shared at the end of `a` and `b`.
///
/// # Examples
///
/// ```
/// use bytediff_scan::common_suffix;
///
/// assert_eq!(common_suffix(b"trailing", b"failing"), 6);
/// assert_eq!(common_suffix(b"abc", b"xyz"), 0);
/// ```
pub fn common_suffix(a: &[u8], b: &[u8]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}

/// Whether `text` starts with `candidate`.
///
/// A candidate longer than the text never matches.
pub fn has_prefix(text: &[u8], candidate: &[u8]) -> bool {
    text.starts_with(candidate)
}

/// Whether `text` ends with `candidate`.
///
/// A candidate longer than the text never matches.
pub fn has_suffix(text: &[u8], candidate: &[u8]) -> bool {
    text.ends_with(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix() {
        assert_eq!(common_prefix(b"aaa", b"abc"), 1);
        assert_eq!(common_prefix(b"abc", b"aaa"), 1);
        assert_eq!(common_prefix(b"", b"abc"), 0);
        assert_eq!(common_prefix(b"abc", b""), 0);
        assert_eq!(common_prefix(b"aaa", b"aaa"), 3);
    }

    #[test]
    fn test_common_prefix_embedded_nul() {
        assert_eq!(common_prefix(b"aaa\x00bbb", b"aaa\x00bqq"), 5);
    }

    #[test]
    fn test_common_suffix() {
        assert_eq!(common_suffix(b"aaa", b"baa"), 2);
        assert_eq!(common_suffix(b"aaa", b"aaa"), 3);
        assert_eq!(common_suffix(b"", b"aaa"), 0);
        assert_eq!(common_suffix(b"abc", b"xyz"), 0);
        assert_eq!(common_suffix(b"xyzzy", b"zy"), 2);
    }

    #[test]
    fn test_has_prefix() {
        assert!(has_prefix(b"aaa", b"a"));
        assert!(!has_prefix(b"a", b"aaa"));
        assert!(has_prefix(b"aaa\x00bbb", b"aaa\x00b"));
        assert!(!has_prefix(b"abc", b"b"));
        assert!(has_prefix(b"abc", b""));
    }

    #[test]
    fn test_has_suffix() {
        assert!(has_suffix(b"aaa", b"a"));
        assert!(has_suffix(b"aaa\x00q", b"a\x00q"));
        assert!(!has_suffix(b"aaa", b"q"));
        assert!(!has_suffix(b"abcdef", b"qcdef"));
        assert!(!has_suffix(b"a", b"aa"));
        assert!(has_suffix(b"abc", b""));
    }
}
