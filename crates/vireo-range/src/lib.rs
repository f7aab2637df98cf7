//! Non-owning slice views
//!
//! This crate provides `Piece`/`PieceMut`, lightweight views over a borrowed
//! slice with an operation set aimed at destructive parsing and in-place
//! rewriting:
//! - **Search**: `find` (element, sub-range, from an offset), `rfind`,
//!   `find_first_of`, `starts_with`/`ends_with`/`equals` with optional custom
//!   element equality, with byte fast paths on `u8` views
//! - **Bound mutators**: `advance`, `subtract`, `subpiece`, `pop_front`,
//!   `pop_back`, `remove_prefix`, `remove_suffix`
//! - **Destructive parsing**: `split_step` and `split_step_with`
//! - **In-place rewriting** (writable views): `replace_at`, `replace_all`
//! - **Hashing**: byte-image hashing for integer element types
//!
//! # Example
//!
//! ```rust,ignore
//! use vireo_range::StringPiece;
//!
//! let mut line = StringPiece::from("key=value");
//! let key = line.split_step(&b'=');
//! assert_eq!(key, "key");
//! assert_eq!(line, "value");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod error;
mod find;
mod hash;
mod piece;
mod piece_mut;

pub use error::{RangeError, ReplaceError};
pub use find::{find_byte, find_first_byte_of, find_elem, qfind, qfind_first_of, rfind_byte, rfind_elem};
pub use hash::{hash_piece, ByteImage};
pub use piece::{range, BytePiece, Piece, StringPiece};
pub use piece_mut::{PieceMut, StringPieceMut};

/// Create a `StringPiece` from a string literal.
///
/// Stands in for the original's user-defined literal.
#[macro_export]
macro_rules! piece {
    ($s:literal) => {
        $crate::StringPiece::new($s.as_bytes())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_literal_macro() {
        let p = piece!("literal");
        assert_eq!(p, "literal");
        assert_eq!(p.len(), 7);
    }
}
