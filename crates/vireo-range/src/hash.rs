//! Byte-image hashing for views over integer element types.
//!
//! The original hashes the underlying byte image of the view with a 64-bit
//! noncryptographic avalanching hash. Here the byte image is fed to any
//! `std::hash::Hasher` in a single `write`, and [`hash_piece`] provides a
//! ready-made 64-bit value via `FxHasher`.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::piece::Piece;

mod sealed {
    pub trait Sealed {}
}

/// Element types whose views hash by raw byte image.
///
/// Restricted to primitive integers: they have no padding and no interior
/// indirection, so the byte image is the value.
pub trait ByteImage: sealed::Sealed + Copy {}

macro_rules! impl_byte_image {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}
            impl ByteImage for $t {}
        )*
    };
}

impl_byte_image!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, usize, isize);

fn byte_image<T: ByteImage>(data: &[T]) -> &[u8] {
    // Safety: ByteImage types are padding-free primitive integers, so any
    // [T] is a valid [u8] of len * size_of::<T>() bytes.
    unsafe {
        std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data))
    }
}

impl<'a, T: ByteImage> Hash for Piece<'a, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(byte_image(self.data()));
    }
}

/// 64-bit hash of a view's byte image
pub fn hash_piece<T: ByteImage>(piece: Piece<'_, T>) -> u64 {
    let mut hasher = FxHasher::default();
    piece.hash(&mut hasher);
    hasher.finish()
}
