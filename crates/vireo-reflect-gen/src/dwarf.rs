//! DWARF scan: find the canonical definition of each reflectable type and
//! resolve its member layout.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gimli::{
    AttributeValue, DebuggingInformationEntry, Dwarf, EndianArcSlice, Reader as _, RunTimeEndian, Unit,
    UnitOffset, UnitSectionOffset,
};
use object::{Object, ObjectSection};

use crate::error::ReflectError;
use crate::gen::{BaseDesc, MemberDesc, ObjectDesc};

type Reader = EndianArcSlice<RunTimeEndian>;
type Die<'a> = DebuggingInformationEntry<'a, 'a, Reader>;

/// Scan the executable's debug info for the allow-listed type names.
///
/// Units are processed by `num_threads` workers; results are merged in unit
/// order, and for each name the first complete definition wins, so the
/// output is deterministic.
pub fn scan_reflectables(
    path: &Path,
    num_threads: usize,
    allow: &[&str],
) -> Result<Vec<ObjectDesc>, ReflectError> {
    let bytes = fs::read(path)?;
    let data = Arc::<[u8]>::from(bytes);
    let file = object::File::parse(&*data)?;
    let endian = if file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };
    let address_size: u64 = if file.is_64() { 8 } else { 4 };

    let dwarf = Dwarf::load(|id| -> Result<Reader, gimli::Error> {
        let section = match file.section_by_name(id.name()) {
            Some(section) => match section.uncompressed_data() {
                Ok(Cow::Borrowed(b)) => Arc::<[u8]>::from(b.to_vec()),
                Ok(Cow::Owned(v)) => Arc::from(v),
                Err(_) => return Err(gimli::Error::Io),
            },
            None => Arc::<[u8]>::from(Vec::new()),
        };
        Ok(EndianArcSlice::new(section, endian))
    })?;

    let mut units = Vec::new();
    let mut iter = dwarf.units();
    while let Some(header) = iter.next()? {
        units.push(dwarf.unit(header)?);
    }

    let workers = num_threads.max(1).min(units.len().max(1));
    let mut found: Vec<(usize, ObjectDesc)> = Vec::new();
    std::thread::scope(|scope| -> Result<(), ReflectError> {
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let dwarf = &dwarf;
            let units = &units;
            handles.push(scope.spawn(move || -> Result<Vec<(usize, ObjectDesc)>, ReflectError> {
                let mut out = Vec::new();
                let mut unit_idx = worker;
                while unit_idx < units.len() {
                    scan_unit(dwarf, units, unit_idx, allow, address_size, &mut out)?;
                    unit_idx += workers;
                }
                Ok(out)
            }));
        }
        for handle in handles {
            let part = handle.join().map_err(|_| ReflectError::WorkerPanic)??;
            found.extend(part);
        }
        Ok(())
    })?;

    // Stable sort keeps within-unit declaration order.
    found.sort_by_key(|(unit_idx, _)| *unit_idx);

    let mut remaining: Vec<&str> = allow.to_vec();
    let mut objects = Vec::new();
    for (_, object) in found {
        if let Some(pos) = remaining.iter().position(|name| *name == object.name) {
            remaining.remove(pos);
            objects.push(object);
        }
    }
    Ok(objects)
}

fn entry_name(
    dwarf: &Dwarf<Reader>,
    unit: &Unit<Reader>,
    entry: &Die<'_>,
) -> Result<Option<String>, ReflectError> {
    match entry.attr_value(gimli::DW_AT_name)? {
        Some(value) => {
            let name = dwarf.attr_string(unit, value)?;
            Ok(Some(name.to_string_lossy()?.into_owned()))
        }
        None => Ok(None),
    }
}

fn is_declaration(entry: &Die<'_>) -> Result<bool, ReflectError> {
    Ok(matches!(
        entry.attr_value(gimli::DW_AT_declaration)?,
        Some(AttributeValue::Flag(true))
    ))
}

fn udata_attr(entry: &Die<'_>, attr: gimli::DwAt) -> Result<Option<u64>, ReflectError> {
    Ok(entry.attr_value(attr)?.and_then(|value| value.udata_value()))
}

/// Follow a DW_AT_type reference to its (unit, offset) target
fn resolve_type_ref(
    units: &[Unit<Reader>],
    unit_idx: usize,
    value: AttributeValue<Reader>,
) -> Option<(usize, UnitOffset)> {
    match value {
        AttributeValue::UnitRef(offset) => Some((unit_idx, offset)),
        AttributeValue::DebugInfoRef(offset) => {
            for (idx, unit) in units.iter().enumerate() {
                if let UnitSectionOffset::DebugInfoOffset(start) = unit.header.offset() {
                    let len = unit.header.length_including_self();
                    if offset.0 >= start.0 && offset.0 < start.0 + len {
                        return Some((idx, UnitOffset(offset.0 - start.0)));
                    }
                }
            }
            None
        }
        _ => None,
    }
}

fn type_of(
    units: &[Unit<Reader>],
    unit_idx: usize,
    entry: &Die<'_>,
) -> Result<Option<(usize, UnitOffset)>, ReflectError> {
    match entry.attr_value(gimli::DW_AT_type)? {
        Some(value) => Ok(resolve_type_ref(units, unit_idx, value)),
        None => Ok(None),
    }
}

fn array_element_count(unit: &Unit<Reader>, offset: UnitOffset) -> Result<Option<u64>, ReflectError> {
    let mut tree = unit.entries_tree(Some(offset))?;
    let root = tree.root()?;
    let mut children = root.children();
    while let Some(child) = children.next()? {
        if child.entry().tag() != gimli::DW_TAG_subrange_type {
            continue;
        }
        if let Some(count) = udata_attr(child.entry(), gimli::DW_AT_count)? {
            return Ok(Some(count));
        }
        if let Some(upper) = udata_attr(child.entry(), gimli::DW_AT_upper_bound)? {
            return Ok(Some(upper + 1));
        }
    }
    Ok(None)
}

/// Size in bytes of the type at `offset`: pointers collapse to the address
/// size, qualifiers and typedefs peel, arrays multiply, everything else
/// reports its own DW_AT_byte_size
fn size_of_type(
    units: &[Unit<Reader>],
    address_size: u64,
    unit_idx: usize,
    offset: UnitOffset,
) -> Result<u64, ReflectError> {
    let unit = &units[unit_idx];
    let entry = unit.entry(offset)?;
    match entry.tag() {
        gimli::DW_TAG_pointer_type
        | gimli::DW_TAG_reference_type
        | gimli::DW_TAG_rvalue_reference_type
        | gimli::DW_TAG_ptr_to_member_type => Ok(address_size),
        gimli::DW_TAG_const_type
        | gimli::DW_TAG_volatile_type
        | gimli::DW_TAG_restrict_type
        | gimli::DW_TAG_typedef => match type_of(units, unit_idx, &entry)? {
            Some((idx, target)) => size_of_type(units, address_size, idx, target),
            None => Ok(0),
        },
        gimli::DW_TAG_array_type => {
            let Some((idx, element)) = type_of(units, unit_idx, &entry)? else {
                return Ok(0);
            };
            let element_size = size_of_type(units, address_size, idx, element)?;
            Ok(array_element_count(unit, offset)?.unwrap_or(0) * element_size)
        }
        _ => Ok(udata_attr(&entry, gimli::DW_AT_byte_size)?.unwrap_or(0)),
    }
}

/// Direct data members of the aggregate at `offset`
fn collect_members(
    dwarf: &Dwarf<Reader>,
    units: &[Unit<Reader>],
    unit_idx: usize,
    address_size: u64,
    offset: UnitOffset,
) -> Result<Vec<MemberDesc>, ReflectError> {
    let unit = &units[unit_idx];
    let mut members = Vec::new();
    let mut tree = unit.entries_tree(Some(offset))?;
    let root = tree.root()?;
    let mut children = root.children();
    while let Some(child) = children.next()? {
        let entry = child.entry();
        if entry.tag() != gimli::DW_TAG_member {
            continue;
        }
        let size = match type_of(units, unit_idx, entry)? {
            Some((idx, target)) => size_of_type(units, address_size, idx, target)?,
            None => 0,
        };
        members.push(MemberDesc {
            name: entry_name(dwarf, unit, entry)?.unwrap_or_default(),
            offset: udata_attr(entry, gimli::DW_AT_data_member_location)?,
            size,
        });
    }
    Ok(members)
}

fn collect_bases(
    dwarf: &Dwarf<Reader>,
    units: &[Unit<Reader>],
    unit_idx: usize,
    address_size: u64,
    offset: UnitOffset,
) -> Result<Vec<BaseDesc>, ReflectError> {
    let unit = &units[unit_idx];
    let mut bases = Vec::new();
    let mut tree = unit.entries_tree(Some(offset))?;
    let root = tree.root()?;
    let mut children = root.children();
    while let Some(child) = children.next()? {
        let entry = child.entry();
        if entry.tag() != gimli::DW_TAG_inheritance {
            continue;
        }
        // Virtual bases carry an expression here, not a constant; skip them.
        let Some(base_offset) = udata_attr(entry, gimli::DW_AT_data_member_location)? else {
            continue;
        };
        let Some((idx, target)) = type_of(units, unit_idx, entry)? else {
            continue;
        };
        bases.push(BaseDesc {
            offset: base_offset,
            members: collect_members(dwarf, units, idx, address_size, target)?,
        });
    }
    Ok(bases)
}

fn scan_unit(
    dwarf: &Dwarf<Reader>,
    units: &[Unit<Reader>],
    unit_idx: usize,
    allow: &[&str],
    address_size: u64,
    out: &mut Vec<(usize, ObjectDesc)>,
) -> Result<(), ReflectError> {
    let unit = &units[unit_idx];
    // (depth, component) pairs forming the enclosing scope
    let mut scopes: Vec<(isize, String)> = Vec::new();
    let mut depth: isize = 0;
    let mut matches: Vec<(String, UnitOffset)> = Vec::new();

    let mut entries = unit.entries();
    while let Some((delta, entry)) = entries.next_dfs()? {
        depth += delta;
        while scopes.last().is_some_and(|(d, _)| *d >= depth) {
            scopes.pop();
        }
        match entry.tag() {
            gimli::DW_TAG_namespace => {
                // An unnamed namespace gives everything inside internal
                // linkage; the marker keeps those names from ever matching.
                let component = entry_name(dwarf, unit, entry)?
                    .unwrap_or_else(|| "(anonymous namespace)".to_string());
                scopes.push((depth, component));
            }
            gimli::DW_TAG_structure_type | gimli::DW_TAG_class_type => {
                let Some(name) = entry_name(dwarf, unit, entry)? else {
                    continue;
                };
                if !is_declaration(entry)? {
                    let mut qualified = String::new();
                    for (_, component) in &scopes {
                        qualified.push_str(component);
                        qualified.push_str("::");
                    }
                    qualified.push_str(&name);
                    if allow.contains(&qualified.as_str()) {
                        matches.push((qualified, entry.offset()));
                    }
                }
                scopes.push((depth, name));
            }
            _ => {}
        }
    }

    for (name, offset) in matches {
        out.push((
            unit_idx,
            ObjectDesc {
                name,
                bases: collect_bases(dwarf, units, unit_idx, address_size, offset)?,
                members: collect_members(dwarf, units, unit_idx, address_size, offset)?,
            },
        ));
    }
    Ok(())
}
