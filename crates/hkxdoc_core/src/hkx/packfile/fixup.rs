use std::ops::Range;

use crate::hkx::bytes::cstring_at;
use crate::hkx::packfile::{SectionHeader, SectionRegions};
use crate::hkx::{Cursor, HkxError, Layout, LayoutRules, Result};

const TERMINATOR: u32 = u32::MAX;

/// Intra-section relocation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LocalFixup {
	pub offset: u32,
	pub target: u32,
}

/// Cross-section relocation record, also used for virtual fixups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GlobalFixup {
	pub offset: u32,
	pub section: u32,
	pub target: u32,
}

/// Relocate every section of `bytes` in place.
///
/// All records of a section are decoded before any write so region reads
/// never observe partially patched data.
pub(crate) fn apply_fixups(
	bytes: &mut [u8],
	sections: &[SectionHeader],
	regions: &[SectionRegions],
	layout: &Layout,
	rules: LayoutRules,
) -> Result<()> {
	for (section, region) in sections.iter().zip(regions) {
		log::debug!(
			"section {}: data {} bytes, fixups local {} global {} virtual {}, exports {}, imports {}",
			section.tag,
			region.data.len(),
			region.local_fixups.len(),
			region.global_fixups.len(),
			region.virtual_fixups.len(),
			region.exports.len(),
			region.imports.len()
		);

		let base = u64::from(section.absolute_data_start);
		for fixup in parse_local(bytes, region.local_fixups.clone(), rules)? {
			write_pointer(bytes, section, region, fixup.offset, base + u64::from(fixup.target), rules)?;
		}

		for fixup in parse_global(bytes, region.global_fixups.clone(), rules)? {
			let target = target_section(sections, fixup.section, "global fixup")?;
			let value = u64::from(target.absolute_data_start) + u64::from(fixup.target);
			write_pointer(bytes, section, region, fixup.offset, value, rules)?;
		}

		for fixup in parse_global(bytes, region.virtual_fixups.clone(), rules)? {
			let target = target_section(sections, fixup.section, "virtual fixup")?;
			let value = u64::from(target.absolute_data_start) + u64::from(fixup.target);
			let name = cstring_at(bytes, value, rules)?;
			let class = layout.require_class(&name)?;
			if layout.may_have_vtable(&class.name) {
				write_pointer(bytes, section, region, fixup.offset, value, rules)?;
			} else {
				log::trace!("virtual fixup for {name} at {} skipped, class has no vtable", fixup.offset);
			}
		}
	}
	Ok(())
}

/// Decode `(offset, target)` pairs up to the terminator or the region end.
pub(crate) fn parse_local(bytes: &[u8], region: Range<usize>, rules: LayoutRules) -> Result<Vec<LocalFixup>> {
	let mut cursor = region_cursor(bytes, region, rules)?;
	let mut out = Vec::new();
	while cursor.remaining() >= 4 {
		let offset = cursor.read_u32()?;
		if offset == TERMINATOR {
			break;
		}
		let target = cursor.read_u32()?;
		out.push(LocalFixup { offset, target });
	}
	Ok(out)
}

/// Decode `(offset, section, target)` triples up to the terminator or the region end.
pub(crate) fn parse_global(bytes: &[u8], region: Range<usize>, rules: LayoutRules) -> Result<Vec<GlobalFixup>> {
	let mut cursor = region_cursor(bytes, region, rules)?;
	let mut out = Vec::new();
	while cursor.remaining() >= 4 {
		let offset = cursor.read_u32()?;
		if offset == TERMINATOR {
			break;
		}
		let section = cursor.read_u32()?;
		let target = cursor.read_u32()?;
		out.push(GlobalFixup { offset, section, target });
	}
	Ok(out)
}

fn region_cursor(bytes: &[u8], region: Range<usize>, rules: LayoutRules) -> Result<Cursor<'_>> {
	let slice = bytes.get(region.clone()).ok_or(HkxError::UnexpectedEof {
		at: region.start,
		need: region.len(),
		rem: bytes.len().saturating_sub(region.start),
	})?;
	Ok(Cursor::new(slice, rules))
}

fn target_section<'s>(sections: &'s [SectionHeader], index: u32, kind: &'static str) -> Result<&'s SectionHeader> {
	sections.get(index as usize).ok_or(HkxError::SectionIndexOutOfRange {
		kind,
		index: i64::from(index),
		count: sections.len(),
	})
}

fn write_pointer(
	bytes: &mut [u8],
	section: &SectionHeader,
	region: &SectionRegions,
	offset: u32,
	value: u64,
	rules: LayoutRules,
) -> Result<()> {
	let width = usize::from(rules.bytes_in_pointer);
	let out_of_range = || HkxError::FixupOutOfRange {
		section: section.tag.clone(),
		offset,
		size: region.data.len(),
	};

	let start = offset as usize;
	let end = start.checked_add(width).ok_or_else(out_of_range)?;
	if end > region.data.len() {
		return Err(out_of_range());
	}
	let slot = bytes
		.get_mut(region.data.start + start..region.data.start + end)
		.ok_or_else(out_of_range)?;

	match width {
		4 => {
			let narrow = u32::try_from(value).map_err(|_| HkxError::FixupTargetOutOfRange {
				section: section.tag.clone(),
				target: value,
			})?;
			slot.copy_from_slice(&narrow.to_le_bytes());
		}
		8 => slot.copy_from_slice(&value.to_le_bytes()),
		_ => return Err(HkxError::UnsupportedPointerSize { size: rules.bytes_in_pointer }),
	}
	Ok(())
}
