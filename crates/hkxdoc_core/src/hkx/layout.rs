use std::fmt;

/// Byte order of multi-byte scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
	/// Little-endian byte order.
	Little,
	/// Big-endian byte order.
	Big,
}

impl Endianness {
	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Little => "little",
			Self::Big => "big",
		}
	}
}

/// Target ABI description stored in a container header.
///
/// The four raw bytes double as the registry lookup fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutRules {
	/// Pointer width in bytes (`4` or `8`; `0` for pointer-free tagfiles).
	pub bytes_in_pointer: u8,
	/// Whether multi-byte scalars are little-endian.
	pub little_endian: bool,
	/// Padding reuse optimization flag.
	pub reuse_padding_optimization: u8,
	/// Empty base class optimization flag.
	pub empty_base_class_optimization: u8,
}

impl LayoutRules {
	/// Size of the on-disk record.
	pub const SIZE: usize = 4;

	/// Rules used by tagfiles: no pointers, default padding flags.
	pub fn pointer_free(endianness: Endianness) -> Self {
		Self {
			bytes_in_pointer: 0,
			little_endian: endianness == Endianness::Little,
			reuse_padding_optimization: 0,
			empty_base_class_optimization: 0,
		}
	}

	/// Decode the four-byte on-disk record.
	pub fn from_bytes(raw: [u8; 4]) -> Self {
		Self {
			bytes_in_pointer: raw[0],
			little_endian: raw[1] != 0,
			reuse_padding_optimization: raw[2],
			empty_base_class_optimization: raw[3],
		}
	}

	/// Encode back into the four-byte fingerprint.
	pub fn to_bytes(self) -> [u8; 4] {
		[
			self.bytes_in_pointer,
			u8::from(self.little_endian),
			self.reuse_padding_optimization,
			self.empty_base_class_optimization,
		]
	}

	/// Byte order implied by the little-endian flag.
	pub fn endianness(self) -> Endianness {
		if self.little_endian { Endianness::Little } else { Endianness::Big }
	}
}

impl fmt::Display for LayoutRules {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [ptr, le, padding, empty_base] = self.to_bytes();
		write!(f, "{ptr}-{le}-{padding}-{empty_base}")
	}
}
