//! Search primitives shared by `Piece` and `PieceMut`.
//!
//! The sub-range search (`qfind`) is a Boyer-Moore-flavored scan: it aligns
//! the needle's last element first and, on a mismatch after alignment, skips
//! by the distance to the last element's previous occurrence inside the
//! needle. Byte haystacks additionally get table-driven `find_first_of` and
//! plain forward/backward scans that the compiler vectorizes.

/// Find the first occurrence of `needle` in `haystack`.
///
/// An empty needle matches at 0. A needle longer than the haystack never
/// matches.
pub fn qfind<T: PartialEq>(haystack: &[T], needle: &[T]) -> Option<usize> {
    let nlen = needle.len();
    if nlen == 0 {
        return Some(0);
    }
    let hlen = haystack.len();
    if nlen > hlen {
        return None;
    }

    let last = &needle[nlen - 1];
    // Skip distance applied when the window's final element matched but an
    // earlier element did not. Computed lazily on first use.
    let mut skip: Option<usize> = None;

    let mut i = nlen - 1;
    'outer: while i < hlen {
        // Align the needle's last element.
        while &haystack[i] != last {
            i += 1;
            if i >= hlen {
                return None;
            }
        }
        let start = i + 1 - nlen;
        for j in 0..nlen - 1 {
            if haystack[start + j] != needle[j] {
                let s = *skip.get_or_insert_with(|| {
                    match needle[..nlen - 1].iter().rposition(|e| e == last) {
                        Some(p) => nlen - 1 - p,
                        None => nlen,
                    }
                });
                i += s;
                continue 'outer;
            }
        }
        return Some(start);
    }
    None
}

/// Find the first element equal to `e`.
pub fn find_elem<T: PartialEq>(haystack: &[T], e: &T) -> Option<usize> {
    haystack.iter().position(|x| x == e)
}

/// Find the last element equal to `e`.
pub fn rfind_elem<T: PartialEq>(haystack: &[T], e: &T) -> Option<usize> {
    haystack.iter().rposition(|x| x == e)
}

/// Find the first element that occurs anywhere in `needles`.
pub fn qfind_first_of<T: PartialEq>(haystack: &[T], needles: &[T]) -> Option<usize> {
    haystack.iter().position(|x| needles.contains(x))
}

/// Byte fast path for [`find_elem`].
pub fn find_byte(haystack: &[u8], b: u8) -> Option<usize> {
    haystack.iter().position(|&x| x == b)
}

/// Byte fast path for [`rfind_elem`].
pub fn rfind_byte(haystack: &[u8], b: u8) -> Option<usize> {
    haystack.iter().rposition(|&x| x == b)
}

/// Byte fast path for [`qfind_first_of`]: one pass over a 256-entry
/// membership table instead of a scan of `needles` per element.
pub fn find_first_byte_of(haystack: &[u8], needles: &[u8]) -> Option<usize> {
    if needles.len() <= 4 {
        // Table setup doesn't pay off for tiny needle sets.
        return haystack.iter().position(|x| needles.contains(x));
    }
    let mut table = [false; 256];
    for &n in needles {
        table[n as usize] = true;
    }
    haystack.iter().position(|&x| table[x as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive<T: PartialEq>(hay: &[T], needle: &[T]) -> Option<usize> {
        if needle.is_empty() {
            return Some(0);
        }
        if needle.len() > hay.len() {
            return None;
        }
        (0..=hay.len() - needle.len()).find(|&i| &hay[i..i + needle.len()] == needle)
    }

    #[test]
    fn test_qfind_matches_naive_scan() {
        let cases: &[(&[u8], &[u8])] = &[
            (b"", b""),
            (b"", b"a"),
            (b"a", b""),
            (b"abc", b"abc"),
            (b"abcabc", b"cab"),
            (b"aaaaaaa", b"aa"),
            (b"ababab", b"bab"),
            (b"hello world", b"world"),
            (b"hello world", b"worlds"),
            (b"mississippi", b"issip"),
            (b"mississippi", b"ppi"),
            (b"xxxxxxxy", b"xy"),
            (b"ab", b"abc"),
        ];
        for (hay, needle) in cases {
            assert_eq!(qfind(hay, needle), naive(hay, needle), "hay={hay:?} needle={needle:?}");
        }
    }

    #[test]
    fn test_qfind_empty_needle_matches_at_zero() {
        assert_eq!(qfind::<u8>(b"abc", b""), Some(0));
        assert_eq!(qfind::<u8>(b"", b""), Some(0));
    }

    #[test]
    fn test_qfind_needle_longer_than_haystack() {
        assert_eq!(qfind::<u8>(b"ab", b"abc"), None);
    }

    #[test]
    fn test_qfind_generic_elements() {
        let hay = [1, 2, 3, 2, 3, 4];
        assert_eq!(qfind(&hay, &[2, 3, 4]), Some(3));
        assert_eq!(qfind(&hay, &[5]), None);
    }

    #[test]
    fn test_find_byte_and_rfind_byte() {
        assert_eq!(find_byte(b"abcabc", b'c'), Some(2));
        assert_eq!(rfind_byte(b"abcabc", b'c'), Some(5));
        assert_eq!(find_byte(b"abc", b'z'), None);
    }

    #[test]
    fn test_find_first_byte_of_uses_table_consistently() {
        let hay = b"the quick brown fox";
        let needles = b"aeiouxyz"; // > 4, table path
        assert_eq!(
            find_first_byte_of(hay, needles),
            hay.iter().position(|x| needles.contains(x)),
        );
        assert_eq!(find_first_byte_of(hay, b"z"), None);
    }
}
