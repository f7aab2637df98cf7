//! Shared (read-only) non-owning view over a slice.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, Index};

use crate::error::RangeError;
use crate::find;

/// Non-owning view over `&[T]` with the search/split operation set.
///
/// The view has reference semantics: all mutators move the bounds, never the
/// referent. `Piece` is `Copy`, so taking a sub-view or splitting never
/// invalidates the original.
pub struct Piece<'a, T> {
    data: &'a [T],
}

/// View over raw bytes
pub type BytePiece<'a> = Piece<'a, u8>;

/// View over the bytes of a string
pub type StringPiece<'a> = Piece<'a, u8>;

impl<'a, T> Piece<'a, T> {
    /// Length used by `subpiece` to mean "to the end of the view"
    pub const NPOS: usize = usize::MAX;

    /// Create a view over an entire slice
    pub const fn new(data: &'a [T]) -> Self {
        Piece { data }
    }

    /// Create a bounds-checked view over `data[first..first + len]`.
    ///
    /// `len == NPOS` means "to the end". Errors if `first` is past the end
    /// or the requested subrange does not fit.
    pub fn of(data: &'a [T], first: usize, len: usize) -> Result<Self, RangeError> {
        if first > data.len() {
            return Err(RangeError::BadSubrange { first, len: data.len() });
        }
        let rest = data.len() - first;
        if len != Self::NPOS && len > rest {
            return Err(RangeError::BadSubrange { first, len: data.len() });
        }
        let take = if len == Self::NPOS { rest } else { len };
        Ok(Piece { data: &data[first..first + take] })
    }

    /// Number of elements in the view
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the view is empty
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The viewed slice, with the view's full lifetime
    pub const fn data(&self) -> &'a [T] {
        self.data
    }

    /// First element, if any
    pub fn front(&self) -> Option<&'a T> {
        self.data.first()
    }

    /// Last element, if any
    pub fn back(&self) -> Option<&'a T> {
        self.data.last()
    }

    /// Element at `i`, if in range
    pub fn get(&self, i: usize) -> Option<&'a T> {
        self.data.get(i)
    }

    /// Element at `i`, erroring when out of range
    pub fn at(&self, i: usize) -> Result<&'a T, RangeError> {
        self.data
            .get(i)
            .ok_or(RangeError::OutOfRange { index: i, len: self.data.len() })
    }

    /// Move the start of the view forward by `n` elements
    pub fn advance(&mut self, n: usize) -> Result<(), RangeError> {
        if n > self.data.len() {
            return Err(RangeError::OutOfRange { index: n, len: self.data.len() });
        }
        self.data = &self.data[n..];
        Ok(())
    }

    /// Move the end of the view back by `n` elements
    pub fn subtract(&mut self, n: usize) -> Result<(), RangeError> {
        if n > self.data.len() {
            return Err(RangeError::OutOfRange { index: n, len: self.data.len() });
        }
        self.data = &self.data[..self.data.len() - n];
        Ok(())
    }

    /// Sub-view starting at `first`, at most `len` elements long.
    ///
    /// The length clamps to the end of the view; `first` past the end is an
    /// error.
    pub fn subpiece(&self, first: usize, len: usize) -> Result<Piece<'a, T>, RangeError> {
        if first > self.data.len() {
            return Err(RangeError::OutOfRange { index: first, len: self.data.len() });
        }
        let rest = self.data.len() - first;
        let take = len.min(rest);
        Ok(Piece { data: &self.data[first..first + take] })
    }

    /// Drop the first element. The view must not be empty.
    pub fn pop_front(&mut self) {
        debug_assert!(!self.data.is_empty());
        self.data = &self.data[1..];
    }

    /// Drop the last element. The view must not be empty.
    pub fn pop_back(&mut self) {
        debug_assert!(!self.data.is_empty());
        self.data = &self.data[..self.data.len() - 1];
    }

    /// Make the view empty
    pub fn clear(&mut self) {
        self.data = &self.data[..0];
    }

    /// Point the view at a different slice
    pub fn reset(&mut self, data: &'a [T]) {
        self.data = data;
    }

    /// Alias for [`reset`](Self::reset), kept from the original API
    pub fn assign(&mut self, data: &'a [T]) {
        self.data = data;
    }

    /// Swap two views
    pub fn swap(&mut self, other: &mut Piece<'a, T>) {
        std::mem::swap(&mut self.data, &mut other.data);
    }
}

impl<'a, T: PartialEq> Piece<'a, T> {
    /// Index of the first occurrence of `needle`, if any.
    ///
    /// An empty needle matches at 0; a needle longer than the view never
    /// matches.
    pub fn find(&self, needle: &[T]) -> Option<usize> {
        find::qfind(self.data, needle)
    }

    /// Index of the first occurrence of `needle` at or after `pos`
    pub fn find_from(&self, pos: usize, needle: &[T]) -> Option<usize> {
        if pos > self.data.len() {
            return None;
        }
        find::qfind(&self.data[pos..], needle).map(|i| i + pos)
    }

    /// Index of the first element equal to `e`
    pub fn find_elem(&self, e: &T) -> Option<usize> {
        find::find_elem(self.data, e)
    }

    /// Index of the first element equal to `e` at or after `pos`
    pub fn find_elem_from(&self, pos: usize, e: &T) -> Option<usize> {
        if pos > self.data.len() {
            return None;
        }
        find::find_elem(&self.data[pos..], e).map(|i| i + pos)
    }

    /// Index of the last element equal to `e`
    pub fn rfind(&self, e: &T) -> Option<usize> {
        find::rfind_elem(self.data, e)
    }

    /// Index of the first element occurring anywhere in `needles`
    pub fn find_first_of(&self, needles: &[T]) -> Option<usize> {
        find::qfind_first_of(self.data, needles)
    }

    /// Index of the first element occurring in `needles` at or after `pos`
    pub fn find_first_of_from(&self, pos: usize, needles: &[T]) -> Option<usize> {
        if pos > self.data.len() {
            return None;
        }
        find::qfind_first_of(&self.data[pos..], needles).map(|i| i + pos)
    }

    /// Whether `needle` occurs in the view
    pub fn contains_piece(&self, needle: &[T]) -> bool {
        self.find(needle).is_some()
    }

    /// Whether the view begins with `prefix`
    pub fn starts_with(&self, prefix: &[T]) -> bool {
        self.data.len() >= prefix.len() && self.data[..prefix.len()] == *prefix
    }

    /// Whether the view ends with `suffix`
    pub fn ends_with(&self, suffix: &[T]) -> bool {
        self.data.len() >= suffix.len() && self.data[self.data.len() - suffix.len()..] == *suffix
    }

    /// Element-wise equality with another slice
    pub fn equals(&self, other: &[T]) -> bool {
        self.data == other
    }

    /// [`starts_with`](Self::starts_with) under a custom element equality
    pub fn starts_with_by(&self, prefix: &[T], mut eq: impl FnMut(&T, &T) -> bool) -> bool {
        self.data.len() >= prefix.len()
            && self.data.iter().zip(prefix).all(|(a, b)| eq(a, b))
    }

    /// [`ends_with`](Self::ends_with) under a custom element equality
    pub fn ends_with_by(&self, suffix: &[T], mut eq: impl FnMut(&T, &T) -> bool) -> bool {
        self.data.len() >= suffix.len()
            && self.data[self.data.len() - suffix.len()..]
                .iter()
                .zip(suffix)
                .all(|(a, b)| eq(a, b))
    }

    /// [`equals`](Self::equals) under a custom element equality
    pub fn equals_by(&self, other: &[T], mut eq: impl FnMut(&T, &T) -> bool) -> bool {
        self.data.len() == other.len() && self.data.iter().zip(other).all(|(a, b)| eq(a, b))
    }

    /// Drop `prefix` from the front. Mutates and returns true iff the view
    /// started with it.
    pub fn remove_prefix(&mut self, prefix: &[T]) -> bool {
        if self.starts_with(prefix) {
            self.data = &self.data[prefix.len()..];
            true
        } else {
            false
        }
    }

    /// Drop `suffix` from the back. Mutates and returns true iff the view
    /// ended with it.
    pub fn remove_suffix(&mut self, suffix: &[T]) -> bool {
        if self.ends_with(suffix) {
            self.data = &self.data[..self.data.len() - suffix.len()];
            true
        } else {
            false
        }
    }

    /// Split off and return the prefix up to the first occurrence of
    /// `delim`, advancing the view past the delimiter (or to the end when
    /// the delimiter is absent).
    pub fn split_step(&mut self, delim: &T) -> Piece<'a, T> {
        match find::find_elem(self.data, delim) {
            Some(i) => {
                let head = &self.data[..i];
                self.data = &self.data[i + 1..];
                Piece { data: head }
            }
            None => {
                let head = self.data;
                self.data = &self.data[self.data.len()..];
                Piece { data: head }
            }
        }
    }

    /// [`split_step`](Self::split_step) with a sub-range delimiter
    pub fn split_step_range(&mut self, delim: &[T]) -> Piece<'a, T> {
        match find::qfind(self.data, delim) {
            Some(i) => {
                let head = &self.data[..i];
                self.data = &self.data[i + delim.len()..];
                Piece { data: head }
            }
            None => {
                let head = self.data;
                self.data = &self.data[self.data.len()..];
                Piece { data: head }
            }
        }
    }

    /// Split a step and hand the prefix to `process`, returning its result
    pub fn split_step_with<R>(
        &mut self,
        delim: &T,
        process: impl FnOnce(Piece<'a, T>) -> R,
    ) -> R {
        process(self.split_step(delim))
    }

    /// Three-way lexicographic comparison
    pub fn compare(&self, other: &[T]) -> Ordering
    where
        T: Ord,
    {
        self.data.cmp(other)
    }
}

impl<'a> Piece<'a, u8> {
    /// Byte fast path for [`find_elem`](Self::find_elem)
    pub fn find_byte(&self, b: u8) -> Option<usize> {
        find::find_byte(self.data, b)
    }

    /// Byte fast path for [`rfind`](Self::rfind)
    pub fn rfind_byte(&self, b: u8) -> Option<usize> {
        find::rfind_byte(self.data, b)
    }

    /// Table-driven fast path for [`find_first_of`](Self::find_first_of)
    pub fn find_first_byte_of(&self, needles: &[u8]) -> Option<usize> {
        find::find_first_byte_of(self.data, needles)
    }

    /// View the bytes as UTF-8, if valid
    pub fn as_str(&self) -> Result<&'a str, std::str::Utf8Error> {
        std::str::from_utf8(self.data)
    }
}

// Manual impls: derive would bound them on T.
impl<'a, T> Clone for Piece<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Piece<'a, T> {}

impl<'a, T> Deref for Piece<'a, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.data
    }
}

impl<'a, T, I: std::slice::SliceIndex<[T]>> Index<I> for Piece<'a, T> {
    type Output = I::Output;

    fn index(&self, i: I) -> &I::Output {
        &self.data[i]
    }
}

impl<'a, T> From<&'a [T]> for Piece<'a, T> {
    fn from(data: &'a [T]) -> Self {
        Piece { data }
    }
}

impl<'a, T, const N: usize> From<&'a [T; N]> for Piece<'a, T> {
    fn from(data: &'a [T; N]) -> Self {
        Piece { data }
    }
}

impl<'a> From<&'a str> for Piece<'a, u8> {
    fn from(s: &'a str) -> Self {
        Piece { data: s.as_bytes() }
    }
}

impl<'a, T: PartialEq> PartialEq for Piece<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<'a, T: Eq> Eq for Piece<'a, T> {}

impl<'a, T: PartialEq> PartialEq<[T]> for Piece<'a, T> {
    fn eq(&self, other: &[T]) -> bool {
        self.data == other
    }
}

impl<'a, 'b, T: PartialEq> PartialEq<&'b [T]> for Piece<'a, T> {
    fn eq(&self, other: &&'b [T]) -> bool {
        self.data == *other
    }
}

impl<'a, 'b> PartialEq<&'b str> for Piece<'a, u8> {
    fn eq(&self, other: &&'b str) -> bool {
        self.data == other.as_bytes()
    }
}

impl<'a, T: PartialOrd> PartialOrd for Piece<'a, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.data.partial_cmp(other.data)
    }
}

impl<'a, T: Ord> Ord for Piece<'a, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.data.cmp(other.data)
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for Piece<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Piece").field(&self.data).finish()
    }
}

impl<'a> fmt::Display for Piece<'a, u8> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.data))
    }
}

/// Create a view over a contiguous container, with type deduction
pub fn range<T>(data: &[T]) -> Piece<'_, T> {
    Piece::new(data)
}
