//! Writable non-owning view over a slice.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::{RangeError, ReplaceError};
use crate::find;
use crate::piece::Piece;

/// Writable view over `&mut [T]`.
///
/// Carries the same bound-moving mutators as [`Piece`] plus in-place element
/// mutation (`replace_at`, `replace_all`). Like the shared view it never
/// grows or shrinks the referent.
pub struct PieceMut<'a, T> {
    data: &'a mut [T],
}

/// Writable view over the bytes of a string buffer
pub type StringPieceMut<'a> = PieceMut<'a, u8>;

impl<'a, T> PieceMut<'a, T> {
    /// Create a writable view over an entire slice
    pub fn new(data: &'a mut [T]) -> Self {
        PieceMut { data }
    }

    /// Number of elements in the view
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the view is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reborrow as a shared view
    pub fn as_piece(&self) -> Piece<'_, T> {
        Piece::new(self.data)
    }

    /// Move the start of the view forward by `n` elements
    pub fn advance(&mut self, n: usize) -> Result<(), RangeError> {
        if n > self.data.len() {
            return Err(RangeError::OutOfRange { index: n, len: self.data.len() });
        }
        let data = std::mem::take(&mut self.data);
        self.data = &mut data[n..];
        Ok(())
    }

    /// Move the end of the view back by `n` elements
    pub fn subtract(&mut self, n: usize) -> Result<(), RangeError> {
        if n > self.data.len() {
            return Err(RangeError::OutOfRange { index: n, len: self.data.len() });
        }
        let data = std::mem::take(&mut self.data);
        let keep = data.len() - n;
        self.data = &mut data[..keep];
        Ok(())
    }

    /// Drop the first element. The view must not be empty.
    pub fn pop_front(&mut self) {
        debug_assert!(!self.data.is_empty());
        let data = std::mem::take(&mut self.data);
        self.data = &mut data[1..];
    }

    /// Drop the last element. The view must not be empty.
    pub fn pop_back(&mut self) {
        debug_assert!(!self.data.is_empty());
        let data = std::mem::take(&mut self.data);
        let keep = data.len() - 1;
        self.data = &mut data[..keep];
    }
}

impl<'a, T: Clone + PartialEq> PieceMut<'a, T> {
    /// Overwrite `replacement.len()` elements starting at `pos`.
    ///
    /// Returns false (and writes nothing) when the replacement does not fit;
    /// the view never grows.
    pub fn replace_at(&mut self, pos: usize, replacement: &[T]) -> bool {
        let end = match pos.checked_add(replacement.len()) {
            Some(e) if e <= self.data.len() => e,
            _ => return false,
        };
        self.data[pos..end].clone_from_slice(replacement);
        true
    }

    /// Replace every occurrence of `source` with `dest`, left to right.
    ///
    /// Returns the number of replacements. `source` and `dest` must have the
    /// same length. Overlapping patterns are rewritten sequentially:
    /// `"aaaaaaa".replace_all("aa", "ba")` gives 3 and `"bababaa"`.
    pub fn replace_all(&mut self, source: &[T], dest: &[T]) -> Result<usize, ReplaceError> {
        if source.len() != dest.len() {
            return Err(ReplaceError { src_len: source.len(), dst_len: dest.len() });
        }
        if dest.is_empty() {
            return Ok(0);
        }

        let mut pos = 0;
        let mut num_replaced = 0;
        while let Some(found) = find::qfind(&self.data[pos..], source) {
            let at = pos + found;
            self.data[at..at + dest.len()].clone_from_slice(dest);
            pos = at + source.len();
            num_replaced += 1;
        }
        Ok(num_replaced)
    }
}

impl<'a, T> Deref for PieceMut<'a, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.data
    }
}

impl<'a, T> DerefMut for PieceMut<'a, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.data
    }
}

impl<'a, T: PartialEq> PartialEq<[T]> for PieceMut<'a, T> {
    fn eq(&self, other: &[T]) -> bool {
        *self.data == *other
    }
}

impl<'a, 'b, T: PartialEq> PartialEq<&'b [T]> for PieceMut<'a, T> {
    fn eq(&self, other: &&'b [T]) -> bool {
        *self.data == **other
    }
}

impl<'a, 'b> PartialEq<&'b str> for PieceMut<'a, u8> {
    fn eq(&self, other: &&'b str) -> bool {
        self.data == other.as_bytes()
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for PieceMut<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PieceMut").field(&self.data).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_at_in_bounds() {
        let mut buf = *b"buffer";
        let mut p = PieceMut::new(&mut buf);
        assert!(p.replace_at(2, b"tt"));
        assert_eq!(p, "butter");
    }

    #[test]
    fn test_replace_at_does_not_fit_leaves_unchanged() {
        let mut buf = *b"butter";
        let mut p = PieceMut::new(&mut buf);
        assert!(!p.replace_at(5, b"rr"));
        assert_eq!(p, "butter");
        // Overflowing pos is rejected, not wrapped.
        assert!(!p.replace_at(usize::MAX, b"r"));
    }

    #[test]
    fn test_replace_all_counts_and_rewrites() {
        let mut buf = *b"buffer";
        let mut p = PieceMut::new(&mut buf);
        assert_eq!(p.replace_all(b"ff", b"tt"), Ok(1));
        assert_eq!(p, "butter");
    }

    #[test]
    fn test_replace_all_overlapping_is_sequential() {
        let mut buf = *b"aaaaaaa";
        let mut p = PieceMut::new(&mut buf);
        assert_eq!(p.replace_all(b"aa", b"ba"), Ok(3));
        assert_eq!(p, "bababaa");
    }

    #[test]
    fn test_replace_all_length_mismatch() {
        let mut buf = *b"abc";
        let mut p = PieceMut::new(&mut buf);
        assert_eq!(
            p.replace_all(b"ab", b"x"),
            Err(ReplaceError { src_len: 2, dst_len: 1 })
        );
        assert_eq!(p, "abc");
    }

    #[test]
    fn test_replace_all_empty_pattern_is_noop() {
        let mut buf = *b"abc";
        let mut p = PieceMut::new(&mut buf);
        assert_eq!(p.replace_all(b"", b""), Ok(0));
    }

    #[test]
    fn test_bound_mutators() {
        let mut buf = *b"abcdef";
        let mut p = PieceMut::new(&mut buf);
        p.advance(1).unwrap();
        p.subtract(1).unwrap();
        p.pop_front();
        p.pop_back();
        assert_eq!(p, "cd");
        assert!(p.advance(3).is_err());
        p[0] = b'X';
        assert_eq!(p, "Xd");
    }
}
