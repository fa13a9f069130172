use std::io::Read;

use crate::hkx::{Container, HkxError, Result};

/// Default cap on decompressed output.
pub const MAX_DECOMPRESSED_BYTES: usize = 512 * 1024 * 1024;
/// zstd frame magic.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Outer compression detected for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
	/// Raw container bytes.
	None,
	/// zstd frame wrapping a container.
	Zstd,
}

impl Compression {
	/// Classify by leading frame magic; anything else is treated as raw.
	pub fn detect(raw: &[u8]) -> Self {
		if raw.starts_with(&ZSTD_MAGIC) { Self::Zstd } else { Self::None }
	}

	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Zstd => "zstd",
		}
	}
}

/// Strip outer compression and identify the container inside.
///
/// Output larger than `limit` bytes is rejected without being buffered in
/// full. Raw input must start with a container magic.
pub fn unwrap_container(raw: Vec<u8>, limit: usize) -> Result<(Compression, Container, Vec<u8>)> {
	match Compression::detect(&raw) {
		Compression::None => {
			let container = Container::detect(&raw).ok_or_else(|| HkxError::UnknownMagic { magic: first8(&raw) })?;
			Ok((Compression::None, container, raw))
		}
		Compression::Zstd => {
			let out = decompress_zstd(&raw, limit)?;
			let container = Container::detect(&out).ok_or(HkxError::NotHkxAfterDecompress)?;
			log::debug!("zstd frame expanded {} -> {} bytes ({})", raw.len(), out.len(), container.as_str());
			Ok((Compression::Zstd, container, out))
		}
	}
}

fn decompress_zstd(raw: &[u8], limit: usize) -> Result<Vec<u8>> {
	let decoder = zstd::stream::read::Decoder::new(raw)?;
	let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
	let mut out = Vec::new();
	decoder.take(cap).read_to_end(&mut out)?;
	if out.len() > limit {
		return Err(HkxError::DecompressedTooLarge { limit });
	}
	Ok(out)
}

fn first8(bytes: &[u8]) -> [u8; 8] {
	let mut magic = [0_u8; 8];
	let take = bytes.len().min(8);
	magic[..take].copy_from_slice(&bytes[..take]);
	magic
}
