use std::fs;
use std::path::Path;

use crate::hkx::compression::{MAX_DECOMPRESSED_BYTES, unwrap_container};
use crate::hkx::{
	Compression, Endianness, PACKFILE_MAGIC, PackfileHeader, PackfileLoader, Registry, Result, StructRef,
	TAGFILE_MAGIC, TagfileParser,
};

/// Container format identified from the leading magic pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
	/// Relocatable section-based container.
	Packfile,
	/// Self-describing tag stream.
	Tagfile,
}

impl Container {
	/// Identify the container from its first eight bytes.
	///
	/// Packfile magic is always little-endian; tagfile magic may appear in
	/// either byte order.
	pub fn detect(bytes: &[u8]) -> Option<Self> {
		let magic0 = u32::from_le_bytes(bytes.get(0..4)?.try_into().ok()?);
		let magic1 = u32::from_le_bytes(bytes.get(4..8)?.try_into().ok()?);
		let pair = [magic0, magic1];

		if pair == PACKFILE_MAGIC {
			Some(Self::Packfile)
		} else if pair == TAGFILE_MAGIC || [magic0.swap_bytes(), magic1.swap_bytes()] == TAGFILE_MAGIC {
			Some(Self::Tagfile)
		} else {
			None
		}
	}

	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Packfile => "packfile",
			Self::Tagfile => "tagfile",
		}
	}
}

/// Opened container with outer compression removed.
#[derive(Debug, Clone)]
pub struct HkxFile {
	/// Compression mode detected for the source bytes.
	pub compression: Compression,
	/// Container format of the decoded bytes.
	pub container: Container,
	bytes: Vec<u8>,
}

impl HkxFile {
	/// Read and sniff a container from disk.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let raw = fs::read(path)?;
		log::debug!("read {} bytes from {}", raw.len(), path.display());
		Self::from_bytes(raw)
	}

	/// Sniff a container from raw, possibly compressed, bytes.
	pub fn from_bytes(raw: Vec<u8>) -> Result<Self> {
		Self::from_bytes_with_limit(raw, MAX_DECOMPRESSED_BYTES)
	}

	/// Like [`Self::from_bytes`], capping decompressed output at `limit` bytes.
	pub fn from_bytes_with_limit(raw: Vec<u8>, limit: usize) -> Result<Self> {
		let (compression, container, bytes) = unwrap_container(raw, limit)?;
		Ok(Self {
			compression,
			container,
			bytes,
		})
	}

	/// Decoded container bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Byte order of the container's scalars.
	///
	/// Packfiles report the header's little-endian flag; tagfiles report the
	/// order of their magic pair.
	pub fn endianness(&self) -> Result<Endianness> {
		match self.container {
			Container::Packfile => Ok(PackfileHeader::parse(&self.bytes)?.layout_rules.endianness()),
			Container::Tagfile => Ok(TagfileParser::new(&self.bytes)?.endianness()),
		}
	}

	/// Relocate a private copy of the bytes for packfile decoding.
	pub fn packfile<'r>(&self, registry: &'r Registry) -> Result<PackfileLoader<'r>> {
		PackfileLoader::new(self.bytes.clone(), registry)
	}

	/// Tagfile parser over the decoded bytes.
	pub fn tagfile(&self) -> Result<TagfileParser<'_>> {
		TagfileParser::new(&self.bytes)
	}

	/// Decode the root object with the loader matching the container.
	///
	/// `registry` is consulted only for packfiles. A tagfile without objects
	/// yields `None`.
	pub fn load_root(&self, registry: &Registry) -> Result<Option<StructRef>> {
		match self.container {
			Container::Packfile => self.packfile(registry)?.load_root().map(Some),
			Container::Tagfile => self.tagfile()?.parse(),
		}
	}
}
