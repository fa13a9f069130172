//! Shared test helpers for workspace crates.
//!
//! Fixtures are assembled byte by byte so tests never depend on binary
//! files checked into the repository.

use std::path::{Path, PathBuf};

/// Resolve the workspace root path.
pub fn workspace_root() -> PathBuf {
	let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
	manifest_dir
		.join("..")
		.join("..")
		.canonicalize()
		.unwrap_or_else(|_| manifest_dir.join("..").join(".."))
}

/// Resolve the workspace target directory.
pub fn target_dir() -> PathBuf {
	std::env::var_os("CARGO_TARGET_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|| workspace_root().join("target"))
}

/// Write `bytes` to `<target>/hkxdoc-fixtures/<name>` and return the path.
pub fn write_fixture(name: &str, bytes: &[u8]) -> PathBuf {
	let dir = target_dir().join("hkxdoc-fixtures");
	std::fs::create_dir_all(&dir).expect("fixture dir is creatable");
	let path = dir.join(name);
	std::fs::write(&path, bytes).expect("fixture is writable");
	path
}

/// Encode a value in the tagfile varint format.
pub fn encode_var_int(value: i64) -> Vec<u8> {
	let mut magnitude = value.unsigned_abs();
	let sign = u8::from(value < 0);

	let mut out = Vec::new();
	let mut byte = sign | (((magnitude & 0x3f) as u8) << 1);
	magnitude >>= 6;
	while magnitude != 0 {
		out.push(byte | 0x80);
		byte = (magnitude & 0x7f) as u8;
		magnitude >>= 7;
	}
	out.push(byte);
	out
}

/// Tagfile magic words.
pub const TAGFILE_MAGIC: [u32; 2] = [0xCAB0_0D1E, 0xD011_FACE];
/// Packfile magic words.
pub const PACKFILE_MAGIC: [u32; 2] = [0x57E0_E057, 0x10C0_C010];

/// One member declaration inside a tagfile metadata record.
#[derive(Debug, Clone, Copy)]
pub struct MemberSpec<'a> {
	/// Member name.
	pub name: &'a str,
	/// Raw type tag including array/tuple flags.
	pub ty: i64,
	/// Tuple arity, written only when the tuple flag is set.
	pub tuple_size: i64,
	/// Class name, written only for object and struct basic types.
	pub class_name: &'a str,
}

impl<'a> MemberSpec<'a> {
	/// Plain member without tuple size or class name.
	pub fn new(name: &'a str, ty: i64) -> Self {
		Self {
			name,
			ty,
			tuple_size: 0,
			class_name: "",
		}
	}

	/// Set the tuple arity.
	pub fn tuple(mut self, size: i64) -> Self {
		self.tuple_size = size;
		self
	}

	/// Set the referenced class name.
	pub fn class(mut self, name: &'a str) -> Self {
		self.class_name = name;
		self
	}
}

/// Incremental tagfile byte stream writer.
#[derive(Debug, Clone)]
pub struct TagfileWriter {
	buf: Vec<u8>,
	big_endian: bool,
}

impl TagfileWriter {
	/// Start a little-endian tagfile.
	pub fn new() -> Self {
		Self::with_order(false)
	}

	/// Start a tagfile whose magic and scalars are byte-swapped.
	pub fn big_endian() -> Self {
		Self::with_order(true)
	}

	fn with_order(big_endian: bool) -> Self {
		let mut writer = Self { buf: Vec::new(), big_endian };
		writer.u32(TAGFILE_MAGIC[0]).u32(TAGFILE_MAGIC[1]);
		writer
	}

	/// Append a varint.
	pub fn var_int(&mut self, value: i64) -> &mut Self {
		self.buf.extend(encode_var_int(value));
		self
	}

	/// Append raw bytes.
	pub fn bytes(&mut self, raw: &[u8]) -> &mut Self {
		self.buf.extend_from_slice(raw);
		self
	}

	/// Append a `u32` in the writer's byte order.
	pub fn u32(&mut self, value: u32) -> &mut Self {
		if self.big_endian {
			self.buf.extend(value.to_be_bytes());
		} else {
			self.buf.extend(value.to_le_bytes());
		}
		self
	}

	/// Append an `f32` in the writer's byte order.
	pub fn f32(&mut self, value: f32) -> &mut Self {
		self.u32(value.to_bits())
	}

	/// Append a new (non-interned) string.
	pub fn string(&mut self, value: &str) -> &mut Self {
		if value.is_empty() {
			return self.var_int(0);
		}
		self.var_int(value.len() as i64);
		self.bytes(value.as_bytes())
	}

	/// Append a back-reference into the string pool.
	pub fn string_ref(&mut self, index: i64) -> &mut Self {
		self.var_int(-index)
	}

	/// Append a `FileInfo` command.
	pub fn file_info(&mut self, version: i64, sdk: Option<&str>) -> &mut Self {
		self.var_int(1).var_int(version);
		if let Some(sdk) = sdk {
			self.string(sdk);
		}
		self
	}

	/// Append a `Metadata` command describing one type.
	pub fn metadata(&mut self, name: &str, tag: i64, parent: i64, members: &[MemberSpec<'_>]) -> &mut Self {
		self.var_int(2).string(name).var_int(tag).var_int(parent).var_int(members.len() as i64);
		for member in members {
			self.string(member.name).var_int(member.ty);
			if member.ty & 32 != 0 {
				self.var_int(member.tuple_size);
			}
			let basic = member.ty & 15;
			if basic == 8 || basic == 9 {
				self.string(member.class_name);
			}
		}
		self
	}

	/// Append an `ObjectRemember` command header with its class index.
	pub fn object_remember(&mut self, class_index: i64) -> &mut Self {
		self.var_int(4).var_int(class_index)
	}

	/// Append a `FileEnd` command.
	pub fn file_end(&mut self) -> &mut Self {
		self.var_int(7)
	}

	/// Return the assembled bytes.
	pub fn finish(&self) -> Vec<u8> {
		self.buf.clone()
	}
}

impl Default for TagfileWriter {
	fn default() -> Self {
		Self::new()
	}
}

/// One section of a packfile under construction.
#[derive(Debug, Clone, Default)]
pub struct SectionSpec {
	/// Section tag (at most 19 bytes).
	pub tag: String,
	/// Raw data region.
	pub data: Vec<u8>,
	/// `(offset, target)` intra-section fixups.
	pub local_fixups: Vec<(u32, u32)>,
	/// `(offset, section, target)` cross-section fixups.
	pub global_fixups: Vec<(u32, u32, u32)>,
	/// `(offset, section, target)` class-name fixups.
	pub virtual_fixups: Vec<(u32, u32, u32)>,
	/// Opaque exports region.
	pub exports: Vec<u8>,
	/// Opaque imports region.
	pub imports: Vec<u8>,
}

impl SectionSpec {
	/// Section with a tag and a data region.
	pub fn new(tag: &str, data: Vec<u8>) -> Self {
		Self {
			tag: tag.to_owned(),
			data,
			..Self::default()
		}
	}
}

/// Packfile assembler producing the 64-byte header, section table, and regions.
#[derive(Debug, Clone)]
pub struct PackfileBuilder {
	/// Header file version.
	pub file_version: i32,
	/// Raw layout rules bytes.
	pub layout_rules: [u8; 4],
	/// Contents version string (registry key).
	pub contents_version: String,
	/// `(section, offset)` of the root object.
	pub contents: (i32, i32),
	/// `(section, offset)` of the root class name.
	pub contents_class_name: (i32, i32),
	/// Sections in file order.
	pub sections: Vec<SectionSpec>,
}

impl PackfileBuilder {
	/// Header and section table size for one section.
	pub const HEADER_SIZE: usize = 64;
	/// Size of one section header.
	pub const SECTION_HEADER_SIZE: usize = 48;

	/// Start a 32-bit little-endian packfile for `contents_version`.
	pub fn new(contents_version: &str) -> Self {
		Self {
			file_version: 8,
			layout_rules: [4, 1, 0, 1],
			contents_version: contents_version.to_owned(),
			contents: (0, 0),
			contents_class_name: (0, 0),
			sections: Vec::new(),
		}
	}

	/// Absolute file offset at which section `index`'s data will start.
	pub fn data_start(&self, index: usize) -> usize {
		let mut at = Self::HEADER_SIZE + Self::SECTION_HEADER_SIZE * self.sections.len();
		for section in self.sections.iter().take(index) {
			at += section_len(section);
		}
		at
	}

	/// Assemble the file bytes.
	pub fn build(&self) -> Vec<u8> {
		let mut out = Vec::new();
		for magic in PACKFILE_MAGIC {
			out.extend(magic.to_le_bytes());
		}
		push_i32(&mut out, 0);
		push_i32(&mut out, self.file_version);
		out.extend(self.layout_rules);
		push_i32(&mut out, self.sections.len() as i32);
		push_i32(&mut out, self.contents.0);
		push_i32(&mut out, self.contents.1);
		push_i32(&mut out, self.contents_class_name.0);
		push_i32(&mut out, self.contents_class_name.1);
		out.extend(fixed_str::<16>(&self.contents_version));
		push_i32(&mut out, 0);
		push_i32(&mut out, -1);

		for (index, section) in self.sections.iter().enumerate() {
			let start = self.data_start(index) as i32;
			let local = section.data.len() as i32;
			let global = local + fixup_len(section.local_fixups.len(), 8) as i32;
			let virt = global + fixup_len(section.global_fixups.len(), 12) as i32;
			let exports = virt + fixup_len(section.virtual_fixups.len(), 12) as i32;
			let imports = exports + section.exports.len() as i32;
			let end = imports + section.imports.len() as i32;

			out.extend(fixed_str::<20>(&section.tag));
			for value in [start, local, global, virt, exports, imports, end] {
				push_i32(&mut out, value);
			}
		}

		for section in &self.sections {
			out.extend_from_slice(&section.data);
			if !section.local_fixups.is_empty() {
				for (offset, target) in &section.local_fixups {
					out.extend(offset.to_le_bytes());
					out.extend(target.to_le_bytes());
				}
				out.extend(u32::MAX.to_le_bytes());
			}
			for triples in [&section.global_fixups, &section.virtual_fixups] {
				if triples.is_empty() {
					continue;
				}
				for (offset, target_section, target) in triples {
					out.extend(offset.to_le_bytes());
					out.extend(target_section.to_le_bytes());
					out.extend(target.to_le_bytes());
				}
				out.extend(u32::MAX.to_le_bytes());
			}
			out.extend_from_slice(&section.exports);
			out.extend_from_slice(&section.imports);
		}

		out
	}
}

fn section_len(section: &SectionSpec) -> usize {
	section.data.len()
		+ fixup_len(section.local_fixups.len(), 8)
		+ fixup_len(section.global_fixups.len(), 12)
		+ fixup_len(section.virtual_fixups.len(), 12)
		+ section.exports.len()
		+ section.imports.len()
}

fn fixup_len(count: usize, record: usize) -> usize {
	if count == 0 { 0 } else { count * record + 4 }
}

fn push_i32(out: &mut Vec<u8>, value: i32) {
	out.extend(value.to_le_bytes());
}

fn fixed_str<const N: usize>(value: &str) -> [u8; N] {
	let mut out = [0_u8; N];
	let take = value.len().min(N - 1);
	out[..take].copy_from_slice(&value.as_bytes()[..take]);
	out
}

/// JSON layout describing `RootClass { value: Int32 @ 0 }` for scenario fixtures.
pub fn root_class_layout_json(version: &str, layout_rules: [u8; 4]) -> serde_json::Value {
	serde_json::json!({
		"name": version,
		"layoutRules": layout_rules,
		"classes": [
			{
				"name": "RootClass",
				"parent": null,
				"objectSize": 4,
				"flags": 0,
				"describedVersion": 0,
				"enums": [],
				"members": [
					{ "name": "value", "class": null, "type": 7, "subtype": 0, "arraySize": 0, "flags": 0, "offset": 0 }
				]
			}
		],
		"typeinfo": [
			{ "name": "RootClass", "vtable": 0 }
		]
	})
}

/// Packfile holding `RootClass { value }` with the class name at offset 0
/// and the object at offset 16 of a single `__data__` section.
pub fn root_int_packfile(version: &str, value: u32) -> Vec<u8> {
	let mut data = vec![0_u8; 20];
	data[..9].copy_from_slice(b"RootClass");
	data[16..20].copy_from_slice(&value.to_le_bytes());

	let mut builder = PackfileBuilder::new(version);
	builder.sections.push(SectionSpec::new("__data__", data));
	builder.contents = (0, 16);
	builder.contents_class_name = (0, 0);
	builder.build()
}

/// Little-endian tagfile with one `Point { x: int, label: cstring }` object.
pub fn point_tagfile(x: i64, label: &str) -> Vec<u8> {
	let mut w = TagfileWriter::new();
	w.file_info(4, Some("hk_2014.1.0-r1"))
		.metadata("Point", 0, 0, &[MemberSpec::new("x", 2), MemberSpec::new("label", 10)])
		.object_remember(1)
		.bytes(&[0b11])
		.var_int(x)
		.string(label)
		.file_end();
	w.finish()
}
