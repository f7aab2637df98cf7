//! Error type for the debug-info scan.

/// Anything that can go wrong while reading the source executable
#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    /// Reading or writing a file failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The executable's container format could not be parsed
    #[error("object parse error: {0}")]
    Object(#[from] object::read::Error),
    /// The DWARF data could not be parsed
    #[error("dwarf error: {0}")]
    Dwarf(#[from] gimli::Error),
    /// A scan worker panicked
    #[error("debug-info worker thread panicked")]
    WorkerPanic,
}
