/// Tagfile magic pair, in native byte order.
pub const TAGFILE_MAGIC: [u32; 2] = [0xCAB0_0D1E, 0xD011_FACE];

/// Bits of a member type holding the [`BasicType`].
pub const TYPE_MASK: i64 = 0x0f;
/// Member type flag for variable-length arrays.
pub const ARRAY_FLAG: i64 = 0x10;
/// Member type flag for fixed-arity tuples.
pub const TUPLE_FLAG: i64 = 0x20;

/// Top-level stream command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
	/// Unused.
	None,
	/// Format version record.
	FileInfo,
	/// Type description.
	Metadata,
	/// Anonymous object.
	Object,
	/// Object receiving the next sequential ID.
	ObjectRemember,
	/// Reference to an earlier object.
	ObjectBackref,
	/// Null object.
	ObjectNull,
	/// End of stream.
	FileEnd,
}

impl Tag {
	/// Decode a command value.
	pub fn from_code(code: i64) -> Option<Self> {
		Some(match code {
			0 => Self::None,
			1 => Self::FileInfo,
			2 => Self::Metadata,
			3 => Self::Object,
			4 => Self::ObjectRemember,
			5 => Self::ObjectBackref,
			6 => Self::ObjectNull,
			7 => Self::FileEnd,
			_ => return None,
		})
	}
}

/// Basic member type stored in the low nibble of a member type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicType {
	/// No value.
	Void,
	/// Single raw byte.
	Byte,
	/// Varint integer.
	Int,
	/// 32-bit float.
	Real,
	/// Up to four float lanes.
	Vec4,
	/// Eight floats.
	Vec8,
	/// Twelve floats (three rows).
	Vec12,
	/// Sixteen floats (four rows).
	Vec16,
	/// Object reference by ID.
	Object,
	/// Embedded struct.
	Struct,
	/// Interned string.
	CString,
}

impl BasicType {
	/// Decode the low nibble of a member type.
	pub fn from_code(code: i64) -> Option<Self> {
		Some(match code & TYPE_MASK {
			0 => Self::Void,
			1 => Self::Byte,
			2 => Self::Int,
			3 => Self::Real,
			4 => Self::Vec4,
			5 => Self::Vec8,
			6 => Self::Vec12,
			7 => Self::Vec16,
			8 => Self::Object,
			9 => Self::Struct,
			10 => Self::CString,
			_ => return None,
		})
	}

	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Void => "void",
			Self::Byte => "byte",
			Self::Int => "int",
			Self::Real => "real",
			Self::Vec4 => "vec4",
			Self::Vec8 => "vec8",
			Self::Vec12 => "vec12",
			Self::Vec16 => "vec16",
			Self::Object => "object",
			Self::Struct => "struct",
			Self::CString => "cstring",
		}
	}
}

/// One member of a tagfile type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMemberInfo {
	/// Member name.
	pub name: String,
	/// Raw type: basic type nibble plus array/tuple flags.
	pub ty: i64,
	/// Tuple arity (only meaningful with [`TUPLE_FLAG`]).
	pub tuple_size: i64,
	/// Referenced class for object and struct members (may be empty).
	pub class_name: String,
}

impl TagMemberInfo {
	/// Basic type nibble.
	pub fn basic(&self) -> i64 {
		self.ty & TYPE_MASK
	}

	/// Whether the array flag is set.
	pub fn is_array(&self) -> bool {
		self.ty & ARRAY_FLAG != 0
	}

	/// Whether the tuple flag is set.
	pub fn is_tuple(&self) -> bool {
		self.ty & TUPLE_FLAG != 0
	}

	/// Human-readable type, for example `int[]` or `struct Foo[3]`.
	pub fn describe(&self) -> String {
		let mut out = BasicType::from_code(self.ty)
			.map(BasicType::as_str)
			.unwrap_or("unknown")
			.to_owned();
		if !self.class_name.is_empty() {
			out.push(' ');
			out.push_str(&self.class_name);
		}
		if self.is_tuple() {
			out.push_str(&format!("[{}]", self.tuple_size));
		}
		if self.is_array() {
			out.push_str("[]");
		}
		out
	}
}

/// One type described by a `Metadata` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTypeInfo {
	/// Type name.
	pub name: String,
	/// Opaque per-type tag value.
	pub tag: i64,
	/// Parent type index (`0` for none).
	pub parent: i64,
	/// Members declared at this level.
	pub members: Vec<TagMemberInfo>,
}
