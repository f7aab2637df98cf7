//! The compiled-in allow-list of reflectable runtime types.

/// Name of the generated table; the runtime dlsym()s this symbol.
pub const MEMBER_REFLECTION_TABLE_NAME: &str = "g_member_reflection_vtable";

/// Fully qualified names of the runtime types worth reflecting over.
///
/// Only the first complete, externally linked definition of each name found
/// in the debug info is used.
pub const REFLECTABLES: &[&str] = &[
    "vireo::ActivationRecord",
    "vireo::ArrayData",
    "vireo::Class",
    "vireo::Func",
    "vireo::ObjectData",
    "vireo::StringData",
    "vireo::TypedValue",
    "vireo::Unit",
];
