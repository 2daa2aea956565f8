/// First occurrence of `needle` inside `haystack`, if any.
///
/// Well defined for every needle length: an empty needle matches at
/// position 0, a one-byte needle degenerates to a byte scan. Plain
/// window comparison is fast enough here; the diff driver calls this
/// once per session, not in a loop.
///
/// # Examples
///
/// ```
/// use bytediff_scan::find;
///
/// assert_eq!(find(b"xaxcxabc", b"abc"), Some(5));
/// assert_eq!(find(b"abc", b""), Some(0));
/// assert_eq!(find(b"abc", b"abcd"), None);
/// ```
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    match needle.len() {
        0 => Some(0),
        1 => haystack.iter().position(|&b| b == needle[0]),
        n if n > haystack.len() => None,
        n => haystack.windows(n).position(|w| w == needle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_basic() {
        assert_eq!(find(b"hello world", b"world"), Some(6));
        assert_eq!(find(b"hello world", b"hello"), Some(0));
        assert_eq!(find(b"hello world", b"worlds"), None);
    }

    #[test]
    fn test_find_empty_needle() {
        assert_eq!(find(b"abc", b""), Some(0));
        assert_eq!(find(b"", b""), Some(0));
    }

    #[test]
    fn test_find_single_byte() {
        assert_eq!(find(b"abcabc", b"c"), Some(2));
        assert_eq!(find(b"abc", b"q"), None);
        assert_eq!(find(b"", b"q"), None);
    }

    #[test]
    fn test_find_oversized_needle() {
        assert_eq!(find(b"ab", b"abc"), None);
        assert_eq!(find(b"", b"a"), None);
    }

    #[test]
    fn test_find_first_of_several() {
        assert_eq!(find(b"ababab", b"ab"), Some(0));
        assert_eq!(find(b"xababab", b"ab"), Some(1));
    }

    #[test]
    fn test_find_embedded_nul() {
        assert_eq!(find(b"a\x00b\x00c", b"\x00c"), Some(3));
    }
}
