mod decode;
mod fixup;
mod header;

use crate::hkx::bytes::cstring_at;
use crate::hkx::{HkxError, Layout, Registry, Result, StructRef};

use decode::Decoder;
use fixup::apply_fixups;
/// Fixed-width header records.
pub use header::{PACKFILE_MAGIC, PackfileHeader, SectionHeader, SectionRegions};

/// Relocated packfile ready for decoding.
///
/// Construction validates the header, resolves the reflection layout, and
/// applies every section's fixups to a private copy of the file bytes.
#[derive(Debug)]
pub struct PackfileLoader<'r> {
	header: PackfileHeader,
	sections: Vec<SectionHeader>,
	regions: Vec<SectionRegions>,
	layout: &'r Layout,
	bytes: Vec<u8>,
}

impl<'r> PackfileLoader<'r> {
	/// Validate, resolve the layout, and relocate `bytes`.
	pub fn new(mut bytes: Vec<u8>, registry: &'r Registry) -> Result<Self> {
		let header = PackfileHeader::parse(&bytes)?;
		let rules = header.layout_rules;
		if !rules.little_endian {
			return Err(HkxError::BigEndianUnsupported);
		}
		if header.file_version != PackfileHeader::SUPPORTED_VERSION {
			return Err(HkxError::UnsupportedPackfileVersion {
				version: header.file_version,
			});
		}
		if !matches!(rules.bytes_in_pointer, 4 | 8) {
			return Err(HkxError::UnsupportedPointerSize {
				size: rules.bytes_in_pointer,
			});
		}

		let layout = registry
			.lookup(&header.contents_version, &rules)
			.ok_or_else(|| HkxError::LayoutNotFound {
				version: header.contents_version.clone(),
				rules,
			})?;

		let sections = SectionHeader::parse_all(&bytes, &header)?;
		let regions = sections
			.iter()
			.map(|section| section.regions(bytes.len()))
			.collect::<Result<Vec<_>>>()?;

		apply_fixups(&mut bytes, &sections, &regions, layout, rules)?;

		Ok(Self {
			header,
			sections,
			regions,
			layout,
			bytes,
		})
	}

	/// Parsed file header.
	pub fn header(&self) -> &PackfileHeader {
		&self.header
	}

	/// Section headers in file order.
	pub fn sections(&self) -> &[SectionHeader] {
		&self.sections
	}

	/// Absolute region ranges, parallel to [`Self::sections`].
	pub fn regions(&self) -> &[SectionRegions] {
		&self.regions
	}

	/// Reflection layout selected for this file.
	pub fn layout(&self) -> &'r Layout {
		self.layout
	}

	/// Relocated file bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Name of the root object's class.
	pub fn root_class_name(&self) -> Result<String> {
		let offset = self.section_offset(
			"contents class name",
			self.header.contents_class_name_section_index,
			self.header.contents_class_name_section_offset,
		)?;
		cstring_at(&self.bytes, offset, self.header.layout_rules)
	}

	/// Decode the root object and everything reachable from it.
	pub fn load_root(&self) -> Result<StructRef> {
		let class_name = self.root_class_name()?;
		let class = self.layout.require_class(&class_name)?;
		let ptr = self.section_offset(
			"contents",
			self.header.contents_section_index,
			self.header.contents_section_offset,
		)?;

		let mut decoder = Decoder::new(&self.bytes, self.layout, self.header.layout_rules);
		decoder.structure_at(class, ptr)
	}

	fn section_offset(&self, kind: &'static str, index: i32, offset: i32) -> Result<u64> {
		let section = usize::try_from(index)
			.ok()
			.and_then(|idx| self.sections.get(idx))
			.ok_or(HkxError::SectionIndexOutOfRange {
				kind,
				index: i64::from(index),
				count: self.sections.len(),
			})?;
		let offset = u64::try_from(offset).map_err(|_| HkxError::NegativeLength {
			kind,
			len: i64::from(offset),
		})?;
		Ok(u64::from(section.absolute_data_start) + offset)
	}
}
