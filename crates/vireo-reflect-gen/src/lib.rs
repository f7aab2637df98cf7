//! Member-reflection code generator
//!
//! Reads DWARF debug info from a built executable and emits a C++ source
//! file with one table mapping reflectable type names to functions that,
//! given a base pointer and an interior pointer, name the member containing
//! the interior pointer.
//!
//! The scan (`dwarf` module) resolves member offsets and recursive type
//! sizes, including base sub-objects; generation (`gen` module) is pure
//! formatting over the resolved layouts, so its output is deterministic.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// DWARF scanning and layout resolution
pub mod dwarf;

/// Error type
pub mod error;

/// C source generation
pub mod gen;

/// The allow-list of reflectable types
pub mod reflectables;

pub use dwarf::scan_reflectables;
pub use error::ReflectError;
pub use gen::{generate, BaseDesc, MemberDesc, ObjectDesc};
pub use reflectables::{MEMBER_REFLECTION_TABLE_NAME, REFLECTABLES};
