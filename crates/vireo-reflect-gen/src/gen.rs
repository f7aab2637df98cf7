//! C source generation from resolved object layouts.

use std::io::{self, Write};

use crate::reflectables::MEMBER_REFLECTION_TABLE_NAME;

/// One data member with a resolved size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDesc {
    /// Declared name; empty for an anonymous union
    pub name: String,
    /// Offset within the enclosing object; `None` for static members
    pub offset: Option<u64>,
    /// Recursively computed size in bytes
    pub size: u64,
}

/// A non-virtual base sub-object and its direct members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDesc {
    /// Offset of the base sub-object
    pub offset: u64,
    /// The base's direct members
    pub members: Vec<MemberDesc>,
}

/// A reflectable object: bases first, then own members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDesc {
    /// Fully qualified type name
    pub name: String,
    /// Non-virtual bases in declaration order
    pub bases: Vec<BaseDesc>,
    /// Direct members in declaration order
    pub members: Vec<MemberDesc>,
}

fn generate_range_check(
    out: &mut impl Write,
    member: &MemberDesc,
    base_off: u64,
    last_end: u64,
) -> io::Result<u64> {
    let Some(offset) = member.offset else {
        return Ok(0); // static
    };
    let off = base_off + offset;
    let end = off + member.size;

    let name = if member.name.is_empty() {
        format!("union@{off}")
    } else {
        member.name.clone()
    };

    if last_end < off {
        writeln!(out, "      // hole ({})", off - last_end)?;
    }
    writeln!(
        out,
        "      if ({off} <= diff && diff < {end}) return \"{name}\"; // size {}",
        member.size
    )?;
    Ok(end)
}

fn generate_entry(out: &mut impl Write, object: &ObjectDesc) -> io::Result<()> {
    writeln!(out, "  {{")?;
    writeln!(out, "    \"{}\",", object.name)?;
    writeln!(out, "    [](const void* base, const void* internal) -> const char* {{")?;
    writeln!(out, "      auto const diff = reinterpret_cast<const char*>(internal) -")?;
    writeln!(out, "                        reinterpret_cast<const char*>(base);")?;
    writeln!(out, "      (void)diff;")?;

    let mut last_end = 0u64;
    for base in &object.bases {
        for member in &base.members {
            last_end = last_end.max(generate_range_check(out, member, base.offset, last_end)?);
        }
    }
    for member in &object.members {
        last_end = last_end.max(generate_range_check(out, member, 0, last_end)?);
    }

    writeln!(out, "      return nullptr;")?;
    writeln!(out, "    }}")?;
    write!(out, "  }}")?;
    Ok(())
}

/// Write the complete generated C++ source: one externally visible table
/// mapping type names to interior-pointer resolvers
pub fn generate(out: &mut impl Write, objects: &[ObjectDesc]) -> io::Result<()> {
    writeln!(out, "#include <string>")?;
    writeln!(out, "#include <unordered_map>")?;
    writeln!(out)?;
    writeln!(out, "extern \"C\" {{")?;
    writeln!(out)?;
    writeln!(
        out,
        "__attribute__((visibility(\"default\"))) auto {MEMBER_REFLECTION_TABLE_NAME} ="
    )?;
    writeln!(out, "  std::unordered_map<")?;
    writeln!(out, "    std::string,")?;
    writeln!(out, "    const char*(*)(const void*, const void*)")?;
    writeln!(out, "  >")?;
    writeln!(out, "{{")?;

    for (i, object) in objects.iter().enumerate() {
        if i > 0 {
            writeln!(out, ",")?;
        }
        generate_entry(out, object)?;
    }

    writeln!(out)?;
    writeln!(out, "}};")?;
    writeln!(out)?;
    write!(out, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, offset: u64, size: u64) -> MemberDesc {
        MemberDesc { name: name.to_string(), offset: Some(offset), size }
    }

    fn render(objects: &[ObjectDesc]) -> String {
        let mut buf = Vec::new();
        generate(&mut buf, objects).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_empty_table() {
        let text = render(&[]);
        assert!(text.contains("g_member_reflection_vtable"));
        assert!(text.contains("extern \"C\""));
        assert!(text.ends_with("}"));
    }

    #[test]
    fn test_entry_ranges_and_holes() {
        let object = ObjectDesc {
            name: "vireo::Func".to_string(),
            bases: vec![],
            members: vec![member("id", 0, 4), member("flags", 8, 2)],
        };
        let text = render(&[object]);
        assert!(text.contains("\"vireo::Func\","));
        assert!(text.contains("if (0 <= diff && diff < 4) return \"id\"; // size 4"));
        // 4-byte gap before flags
        assert!(text.contains("// hole (4)"));
        assert!(text.contains("if (8 <= diff && diff < 10) return \"flags\"; // size 2"));
        assert!(text.contains("return nullptr;"));
    }

    #[test]
    fn test_anonymous_union_named_by_offset() {
        let object = ObjectDesc {
            name: "vireo::TypedValue".to_string(),
            bases: vec![],
            members: vec![
                MemberDesc { name: String::new(), offset: Some(0), size: 8 },
                member("type", 8, 1),
            ],
        };
        let text = render(&[object]);
        assert!(text.contains("return \"union@0\"; // size 8"));
    }

    #[test]
    fn test_static_member_skipped() {
        let object = ObjectDesc {
            name: "vireo::Class".to_string(),
            bases: vec![],
            members: vec![
                MemberDesc { name: "s_instance".to_string(), offset: None, size: 8 },
                member("vtable", 0, 8),
            ],
        };
        let text = render(&[object]);
        assert!(!text.contains("s_instance"));
        assert!(text.contains("return \"vtable\";"));
    }

    #[test]
    fn test_base_members_precede_own() {
        let object = ObjectDesc {
            name: "vireo::ObjectData".to_string(),
            bases: vec![BaseDesc { offset: 0, members: vec![member("header", 0, 8)] }],
            members: vec![member("cls", 8, 8)],
        };
        let text = render(&[object]);
        let header_at = text.find("return \"header\"").unwrap();
        let cls_at = text.find("return \"cls\"").unwrap();
        assert!(header_at < cls_at);
        assert!(text.contains("if (8 <= diff && diff < 16) return \"cls\";"));
    }

    #[test]
    fn test_base_offset_shifts_ranges() {
        let object = ObjectDesc {
            name: "vireo::ArrayData".to_string(),
            bases: vec![BaseDesc { offset: 16, members: vec![member("count", 0, 4)] }],
            members: vec![],
        };
        let text = render(&[object]);
        assert!(text.contains("// hole (16)"));
        assert!(text.contains("if (16 <= diff && diff < 20) return \"count\";"));
    }

    #[test]
    fn test_entries_comma_separated_and_deterministic() {
        let a = ObjectDesc { name: "vireo::Unit".to_string(), bases: vec![], members: vec![] };
        let b = ObjectDesc { name: "vireo::Func".to_string(), bases: vec![], members: vec![] };
        let text = render(&[a.clone(), b.clone()]);
        let unit_at = text.find("vireo::Unit").unwrap();
        let func_at = text.find("vireo::Func").unwrap();
        assert!(unit_at < func_at);
        assert!(text.contains("},\n"));
        assert_eq!(text, render(&[a, b]));
    }
}
