//! Error types for view construction and mutation.

/// Error from a bounds-checked view operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// Index past the end of the view
    #[error("index {index} out of range for view of length {len}")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Length of the view
        len: usize,
    },
    /// Subrange does not fit inside the backing storage
    #[error("subrange at {first} does not fit in storage of length {len}")]
    BadSubrange {
        /// Requested start
        first: usize,
        /// Length of the backing storage
        len: usize,
    },
}

/// Error from `replace_all` when source and replacement lengths differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("replacement length {dst_len} does not match source length {src_len}")]
pub struct ReplaceError {
    /// Length of the pattern being replaced
    pub src_len: usize,
    /// Length of the replacement
    pub dst_len: usize,
}
