mod bytes;
mod compression;
mod error;
mod file;
mod layout;
mod packfile;
mod reflect;
mod tagfile;
mod value;

/// Bounds-checked byte cursor.
pub use bytes::{Cursor, Scalar};
/// Compression detection result.
pub use compression::{Compression, MAX_DECOMPRESSED_BYTES};
/// Error and result aliases.
pub use error::{HkxError, Result};
/// Container sniffing and file-level entry points.
pub use file::{Container, HkxFile};
/// Per-file layout rules.
pub use layout::{Endianness, LayoutRules};
/// Packfile header, section table, and loader.
pub use packfile::{PACKFILE_MAGIC, PackfileHeader, PackfileLoader, SectionHeader, SectionRegions};
/// Reflection metadata and registry.
pub use reflect::{Class, ClassEnum, ClassEnumItem, ClassMember, HavokType, Layout, MEMBER_NOT_SERIALIZED, Registry, TypeInfo};
/// Tagfile metadata and parser.
pub use tagfile::{ARRAY_FLAG, BasicType, TAGFILE_MAGIC, TUPLE_FLAG, TYPE_MASK, Tag, TagMemberInfo, TagTypeInfo, TagfileParser};
/// Decoded value model.
pub use value::{Matrix3, Matrix4, QsTransform, Quaternion, StructRef, StructValue, Value, Vector4, new_ref};
