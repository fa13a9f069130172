use serde::{Deserialize, Serialize};

use crate::hkx::HkxError;

/// Member flag marking a field that is computed at runtime and never stored.
pub const MEMBER_NOT_SERIALIZED: u32 = 1024;

/// Closed set of reflected member types.
///
/// Discriminants match the numeric codes used in layout tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum HavokType {
	#[default]
	/// No storage.
	Void = 0,
	/// 32-bit truth value.
	Bool,
	/// Signed byte character.
	Char,
	/// Signed 8-bit integer.
	Int8,
	/// Unsigned 8-bit integer.
	UInt8,
	/// Signed 16-bit integer.
	Int16,
	/// Unsigned 16-bit integer.
	UInt16,
	/// Signed 32-bit integer.
	Int32,
	/// Unsigned 32-bit integer.
	UInt32,
	/// Signed 64-bit integer.
	Int64,
	/// Unsigned 64-bit integer.
	UInt64,
	/// 32-bit float.
	Real,
	/// Four float lanes.
	Vector4,
	/// Rotation quaternion.
	Quaternion,
	/// Three-row matrix.
	Matrix3,
	/// Rotation stored as a three-row matrix.
	Rotation,
	/// Translation, rotation, scale.
	QsTransform,
	/// Four-row matrix.
	Matrix4,
	/// Affine transform stored as a four-row matrix.
	Transform,
	/// Zero-sized placeholder.
	Zero,
	/// Pointer to another object.
	Pointer,
	/// Function pointer.
	FunctionPointer,
	/// Pointer and count.
	Array,
	/// Inline array with capacity.
	InPlaceArray,
	/// Enumeration stored in the subtype width.
	Enum,
	/// Embedded object.
	Struct,
	/// Pointer and count without capacity.
	SimpleArray,
	/// Array with a per-instance class.
	HomogeneousArray,
	/// Object pointer with class pointer.
	Variant,
	/// Owned character pointer.
	CString,
	/// Pointer-width unsigned integer.
	ULong,
	/// Bit flags stored in the subtype width.
	Flags,
	/// 16-bit float.
	Half,
	/// Pointer to a zero-terminated string.
	StringPtr,
	/// Self-relative offset and count.
	RelArray,
}

impl HavokType {
	const ALL: [Self; 35] = [
		Self::Void,
		Self::Bool,
		Self::Char,
		Self::Int8,
		Self::UInt8,
		Self::Int16,
		Self::UInt16,
		Self::Int32,
		Self::UInt32,
		Self::Int64,
		Self::UInt64,
		Self::Real,
		Self::Vector4,
		Self::Quaternion,
		Self::Matrix3,
		Self::Rotation,
		Self::QsTransform,
		Self::Matrix4,
		Self::Transform,
		Self::Zero,
		Self::Pointer,
		Self::FunctionPointer,
		Self::Array,
		Self::InPlaceArray,
		Self::Enum,
		Self::Struct,
		Self::SimpleArray,
		Self::HomogeneousArray,
		Self::Variant,
		Self::CString,
		Self::ULong,
		Self::Flags,
		Self::Half,
		Self::StringPtr,
		Self::RelArray,
	];

	/// Whether values of this type are one byte wide integers.
	pub fn is_byte(self) -> bool {
		matches!(self, Self::Int8 | Self::UInt8)
	}
}

impl TryFrom<u8> for HavokType {
	type Error = HkxError;

	fn try_from(code: u8) -> Result<Self, Self::Error> {
		Self::ALL.get(usize::from(code)).copied().ok_or(HkxError::UnknownTypeCode { code })
	}
}

impl From<HavokType> for u8 {
	fn from(ty: HavokType) -> Self {
		ty as u8
	}
}

/// One reflected member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMember {
	/// Member name.
	pub name: String,
	/// Referenced class for struct-typed members and struct pointers.
	#[serde(default)]
	pub class: Option<String>,
	/// Storage type.
	#[serde(rename = "type")]
	pub ty: HavokType,
	/// Element, pointee, or enum storage type.
	#[serde(default)]
	pub subtype: HavokType,
	/// Fixed array arity (`0` when not a C array).
	#[serde(default)]
	pub array_size: u16,
	/// Member flags.
	#[serde(default)]
	pub flags: u32,
	/// Byte offset from the start of the declaring class level.
	pub offset: u32,
}

impl ClassMember {
	/// Member with the given type at `offset`, no subtype or class.
	pub fn new(name: impl Into<String>, ty: HavokType, offset: u32) -> Self {
		Self {
			name: name.into(),
			class: None,
			ty,
			subtype: HavokType::Void,
			array_size: 0,
			flags: 0,
			offset,
		}
	}

	/// Set the element/pointee type.
	pub fn with_subtype(mut self, subtype: HavokType) -> Self {
		self.subtype = subtype;
		self
	}

	/// Set the referenced class.
	pub fn with_class(mut self, class: impl Into<String>) -> Self {
		self.class = Some(class.into());
		self
	}

	/// Set member flags.
	pub fn with_flags(mut self, flags: u32) -> Self {
		self.flags = flags;
		self
	}

	/// Whether this member is present in serialized data.
	pub fn is_serialized(&self) -> bool {
		self.flags & MEMBER_NOT_SERIALIZED == 0
	}
}

/// One named enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEnumItem {
	/// Numeric value.
	pub value: i64,
	/// Enumerator name.
	pub name: String,
}

/// Enumeration declared inside a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEnum {
	/// Enum name.
	pub name: String,
	/// Enum flags.
	#[serde(default)]
	pub flags: u32,
	/// Enumerators in declaration order.
	#[serde(default)]
	pub items: Vec<ClassEnumItem>,
}

/// One reflected class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
	/// Class name.
	pub name: String,
	/// Direct parent class name.
	#[serde(default)]
	pub parent: Option<String>,
	/// Instance size in bytes, including the parent's fields.
	pub object_size: u32,
	/// Class flags.
	#[serde(default)]
	pub flags: u32,
	/// Version number the class describes.
	#[serde(default)]
	pub described_version: u32,
	/// Nested enumerations.
	#[serde(default)]
	pub enums: Vec<ClassEnum>,
	/// Members declared at this class level, in declaration order.
	#[serde(default)]
	pub members: Vec<ClassMember>,
}

impl Class {
	/// Class with no parent and no members.
	pub fn new(name: impl Into<String>, object_size: u32) -> Self {
		Self {
			name: name.into(),
			parent: None,
			object_size,
			flags: 0,
			described_version: 0,
			enums: Vec::new(),
			members: Vec::new(),
		}
	}

	/// Set the parent class.
	pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
		self.parent = Some(parent.into());
		self
	}

	/// Append a member.
	pub fn with_member(mut self, member: ClassMember) -> Self {
		self.members.push(member);
		self
	}

	/// Find a member declared at this level.
	pub fn member(&self, name: &str) -> Option<&ClassMember> {
		self.members.iter().find(|member| member.name == name)
	}
}

/// Vtable-presence entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
	/// Class name.
	pub name: String,
	/// Vtable address in the producing process, `0` when the class has none.
	pub vtable: u64,
}

impl TypeInfo {
	/// Entry for `name` with the given vtable address.
	pub fn new(name: impl Into<String>, vtable: u64) -> Self {
		Self {
			name: name.into(),
			vtable,
		}
	}
}
