use std::ops::Range;

use crate::hkx::{Cursor, HkxError, LayoutRules, Result};

/// Packfile magic pair.
pub const PACKFILE_MAGIC: [u32; 2] = [0x57E0_E057, 0x10C0_C010];

/// Header rules used to read the fixed-width header itself.
fn header_rules() -> LayoutRules {
	LayoutRules::from_bytes([4, 1, 0, 1])
}

/// Parsed 64-byte packfile header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackfileHeader {
	/// Opaque producer tag.
	pub user_tag: i32,
	/// Container format version.
	pub file_version: i32,
	/// Target ABI of the stored data.
	pub layout_rules: LayoutRules,
	/// Number of section headers following the file header.
	pub num_sections: i32,
	/// Section holding the root object.
	pub contents_section_index: i32,
	/// Root object offset inside its section's data.
	pub contents_section_offset: i32,
	/// Section holding the root class name.
	pub contents_class_name_section_index: i32,
	/// Root class name offset inside its section's data.
	pub contents_class_name_section_offset: i32,
	/// Contents version string, the registry lookup key.
	pub contents_version: String,
	/// Header flags.
	pub flags: i32,
}

impl PackfileHeader {
	/// Encoded size in bytes.
	pub const SIZE: usize = 64;
	/// The only supported `file_version`.
	pub const SUPPORTED_VERSION: i32 = 8;

	/// Parse the header at the start of `bytes`.
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		let mut cursor = Cursor::new(bytes, header_rules());
		let magic0 = cursor.read_u32()?;
		let magic1 = cursor.read_u32()?;
		if [magic0, magic1] != PACKFILE_MAGIC {
			return Err(HkxError::PackfileBadMagic { magic0, magic1 });
		}

		let user_tag = cursor.read_i32()?;
		let file_version = cursor.read_i32()?;
		let mut rules = [0_u8; 4];
		rules.copy_from_slice(cursor.read_exact(LayoutRules::SIZE)?);
		let num_sections = cursor.read_i32()?;
		let contents_section_index = cursor.read_i32()?;
		let contents_section_offset = cursor.read_i32()?;
		let contents_class_name_section_index = cursor.read_i32()?;
		let contents_class_name_section_offset = cursor.read_i32()?;
		let contents_version = fixed_string(cursor.read_exact(16)?);
		let flags = cursor.read_i32()?;
		let _pad = cursor.read_i32()?;

		Ok(Self {
			user_tag,
			file_version,
			layout_rules: LayoutRules::from_bytes(rules),
			num_sections,
			contents_section_index,
			contents_section_offset,
			contents_class_name_section_index,
			contents_class_name_section_offset,
			contents_version,
			flags,
		})
	}
}

/// One 48-byte section header.
///
/// Region offsets are cumulative and relative to `absolute_data_start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
	/// Section tag, for example `__data__`.
	pub tag: String,
	/// Absolute file offset of the section's data region.
	pub absolute_data_start: u32,
	/// End of data, start of local fixups.
	pub local_fixups_offset: u32,
	/// Start of global fixups.
	pub global_fixups_offset: u32,
	/// Start of virtual fixups.
	pub virtual_fixups_offset: u32,
	/// Start of exports.
	pub exports_offset: u32,
	/// Start of imports.
	pub imports_offset: u32,
	/// End of the section.
	pub end_offset: u32,
}

impl SectionHeader {
	/// Encoded size in bytes.
	pub const SIZE: usize = 48;

	/// Parse every section header following the file header.
	pub fn parse_all(bytes: &[u8], header: &PackfileHeader) -> Result<Vec<Self>> {
		let count = usize::try_from(header.num_sections).map_err(|_| HkxError::NegativeLength {
			kind: "section count",
			len: i64::from(header.num_sections),
		})?;

		let mut cursor = Cursor::at(bytes, PackfileHeader::SIZE, header_rules())?;
		let mut sections = Vec::with_capacity(count.min(cursor.remaining() / Self::SIZE));
		for _ in 0..count {
			let tag = fixed_string(cursor.read_exact(20)?);
			sections.push(Self {
				tag,
				absolute_data_start: cursor.read_u32()?,
				local_fixups_offset: cursor.read_u32()?,
				global_fixups_offset: cursor.read_u32()?,
				virtual_fixups_offset: cursor.read_u32()?,
				exports_offset: cursor.read_u32()?,
				imports_offset: cursor.read_u32()?,
				end_offset: cursor.read_u32()?,
			});
		}
		Ok(sections)
	}

	/// Resolve absolute byte ranges, validated against the file length.
	pub fn regions(&self, file_len: usize) -> Result<SectionRegions> {
		let offsets = [
			0,
			self.local_fixups_offset,
			self.global_fixups_offset,
			self.virtual_fixups_offset,
			self.exports_offset,
			self.imports_offset,
			self.end_offset,
		];
		let invalid = || HkxError::SectionRangeInvalid { section: self.tag.clone() };

		if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
			return Err(invalid());
		}

		let base = self.absolute_data_start as usize;
		let end = base.checked_add(self.end_offset as usize).ok_or_else(invalid)?;
		if end > file_len {
			return Err(invalid());
		}

		let range = |from: u32, to: u32| base + from as usize..base + to as usize;
		Ok(SectionRegions {
			data: range(0, self.local_fixups_offset),
			local_fixups: range(self.local_fixups_offset, self.global_fixups_offset),
			global_fixups: range(self.global_fixups_offset, self.virtual_fixups_offset),
			virtual_fixups: range(self.virtual_fixups_offset, self.exports_offset),
			exports: range(self.exports_offset, self.imports_offset),
			imports: range(self.imports_offset, self.end_offset),
		})
	}
}

/// Absolute byte ranges of one section's regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRegions {
	/// Object data.
	pub data: Range<usize>,
	/// `(offset, target)` records.
	pub local_fixups: Range<usize>,
	/// `(offset, section, target)` records.
	pub global_fixups: Range<usize>,
	/// `(offset, section, class name offset)` records.
	pub virtual_fixups: Range<usize>,
	/// Export table.
	pub exports: Range<usize>,
	/// Import table.
	pub imports: Range<usize>,
}

fn fixed_string(raw: &[u8]) -> String {
	let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
	String::from_utf8_lossy(&raw[..end]).into_owned()
}
