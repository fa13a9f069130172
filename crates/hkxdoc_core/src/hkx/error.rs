use thiserror::Error;

use crate::hkx::{HavokType, LayoutRules};

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, HkxError>;

/// Errors produced while reading, relocating, and decoding containers.
#[derive(Debug, Error)]
pub enum HkxError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Leading bytes match neither container format nor a zstd frame.
	#[error("container not identified (magic={magic:02x?})")]
	UnknownMagic {
		/// First up-to-8 bytes of the stream.
		magic: [u8; 8],
	},
	/// Decompressed stream is not a known container.
	#[error("decompressed data is neither a packfile nor a tagfile")]
	NotHkxAfterDecompress,
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
	/// Not enough bytes remained for a requested read.
	#[error("out of bounds read at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEof {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// Seek target lies past the end of the buffer.
	#[error("out of bounds seek to mark {mark} + {offset}, buffer length {len}")]
	SeekOutOfBounds {
		/// Current mark position.
		mark: usize,
		/// Requested offset from the mark.
		offset: usize,
		/// Buffer length.
		len: usize,
	},
	/// Variable-length integer did not terminate within 64 bits.
	#[error("varint at offset {at} overflows 64 bits")]
	VarIntOverflow {
		/// Offset of the first varint byte.
		at: usize,
	},
	/// Pointer width other than 4 or 8 bytes.
	#[error("unsupported pointer size {size}")]
	UnsupportedPointerSize {
		/// Pointer width from the layout rules.
		size: u8,
	},
	/// Packfile magic pair mismatch.
	#[error("bad packfile magic {magic0:#010x} {magic1:#010x}")]
	PackfileBadMagic {
		/// First magic word.
		magic0: u32,
		/// Second magic word.
		magic1: u32,
	},
	/// Packfile layout rules request big-endian data.
	#[error("big endian packfiles are not supported")]
	BigEndianUnsupported,
	/// Packfile format version is not the supported one.
	#[error("unsupported packfile version {version} (expected 8)")]
	UnsupportedPackfileVersion {
		/// Parsed file version.
		version: i32,
	},
	/// No registry entry matches the file's version and layout rules.
	#[error("no packfile layout for version {version}, layout rules {rules}")]
	LayoutNotFound {
		/// Contents version string from the header.
		version: String,
		/// Layout rules from the header.
		rules: LayoutRules,
	},
	/// Section index outside the section table.
	#[error("section index out of range in {kind}: idx={index}, count={count}")]
	SectionIndexOutOfRange {
		/// Where the index came from.
		kind: &'static str,
		/// Offending index.
		index: i64,
		/// Number of sections in the file.
		count: usize,
	},
	/// Section header offsets are negative, decreasing, or past the end of the file.
	#[error("section {section} has invalid region offsets")]
	SectionRangeInvalid {
		/// Section tag.
		section: String,
	},
	/// Fixup would write outside the section's data region.
	#[error("fixup at offset {offset} in section {section} is outside its {size}-byte data region")]
	FixupOutOfRange {
		/// Section tag.
		section: String,
		/// Offset inside the data region.
		offset: u32,
		/// Data region size.
		size: usize,
	},
	/// Fixup target does not fit the file or the pointer width.
	#[error("fixup target {target} in section {section} is out of range")]
	FixupTargetOutOfRange {
		/// Section tag.
		section: String,
		/// Absolute target offset.
		target: u64,
	},
	/// Class name not present in the reflection layout.
	#[error("no definition for class {name}")]
	ClassNotFound {
		/// Requested class name.
		name: String,
	},
	/// Runtime class from a vtable slot is not derived from the declared class.
	#[error("vtable mismatch: vtable points to {actual}, but it is not derived from {declared}")]
	VtableMismatch {
		/// Class named by the object's vtable slot.
		actual: String,
		/// Class declared by the referring member.
		declared: String,
	},
	/// Member type is a reserved extension point.
	#[error("unsupported field type {ty:?} for {class}::{member}")]
	UnsupportedFieldType {
		/// Declaring class.
		class: String,
		/// Member name.
		member: String,
		/// Offending type.
		ty: HavokType,
	},
	/// Pointer member whose target is not a struct.
	#[error("unsupported pointer target {subtype:?} for {class}::{member}")]
	UnsupportedPointerTarget {
		/// Declaring class.
		class: String,
		/// Member name.
		member: String,
		/// Declared pointee type.
		subtype: HavokType,
	},
	/// Struct-typed member without a class reference.
	#[error("member {class}::{member} has no class reference")]
	MissingTypeClass {
		/// Declaring class.
		class: String,
		/// Member name.
		member: String,
	},
	/// Numeric type code outside the reflection type enumeration.
	#[error("unknown reflection type code {code}")]
	UnknownTypeCode {
		/// Raw type code.
		code: u8,
	},
	/// Layout JSON could not be parsed.
	#[error("layout json: {0}")]
	LayoutJson(#[from] serde_json::Error),
	/// Layout tables reference classes they do not define.
	#[error("inconsistent layout {layout}: {reason}")]
	CorruptLayout {
		/// Layout name.
		layout: String,
		/// Human-readable description.
		reason: String,
	},
	/// Tagfile magic pair mismatch in both byte orders.
	#[error("bad tagfile magic {magic0:#010x} {magic1:#010x}")]
	TagfileBadMagic {
		/// First magic word.
		magic0: u32,
		/// Second magic word.
		magic1: u32,
	},
	/// Tagfile format sub-version other than 3 or 4.
	#[error("unsupported tagfile version {version}")]
	UnsupportedTagfileVersion {
		/// Parsed sub-version.
		version: i64,
	},
	/// Unknown or unsupported top-level tag command.
	#[error("unsupported tag type {tag}")]
	UnsupportedTag {
		/// Raw tag value.
		tag: i64,
	},
	/// String back-reference outside the intern pool.
	#[error("string reference {index} out of range (pool size {len})")]
	StringIndexOutOfRange {
		/// Requested pool index.
		index: i64,
		/// Pool size.
		len: usize,
	},
	/// Type index outside the metadata table.
	#[error("type index {index} out of range (table size {len})")]
	TypeIndexOutOfRange {
		/// Requested type index.
		index: i64,
		/// Type table size.
		len: usize,
	},
	/// Parent chain of a type loops back on itself.
	#[error("type {name} has a cyclic parent chain")]
	TypeChainCycle {
		/// Type whose chain was being walked.
		name: String,
	},
	/// Object body names the builtin void type as its class.
	#[error("object declares the builtin void type as its class")]
	VoidObjectClass,
	/// Negative length or count read from the stream.
	#[error("negative {kind} {len}")]
	NegativeLength {
		/// What the length describes.
		kind: &'static str,
		/// Parsed value.
		len: i64,
	},
	/// Member type carries bits outside array, tuple, and basic type.
	#[error("unsupported flags in field type of {member}: {ty:#x}")]
	UnsupportedMemberFlags {
		/// Member name.
		member: String,
		/// Raw member type.
		ty: i64,
	},
	/// Member is flagged as both array and tuple.
	#[error("member {member} is both an array and a tuple")]
	ArrayAndTuple {
		/// Member name.
		member: String,
	},
	/// Presence bitmap would exceed the 128-bit capacity.
	#[error("type {class} has {count} members, more than {max}")]
	TooManyMembers {
		/// Most-derived type name.
		class: String,
		/// Total members across the parent chain.
		count: usize,
		/// Bitmap capacity.
		max: usize,
	},
	/// Vec4 lane count prefix outside 1..=4.
	#[error("unsupported vec4 length {width}")]
	UnsupportedVec4Width {
		/// Parsed lane count.
		width: i64,
	},
	/// Struct array without a resolvable element class.
	#[error("class index unknown in struct array {member}")]
	StructArrayClassUnknown {
		/// Member name.
		member: String,
	},
	/// Struct array longer than the remaining stream can describe.
	#[error("struct array {member} length {len} exceeds remaining {rem} bytes")]
	StructArrayTooLarge {
		/// Member name.
		member: String,
		/// Declared element count.
		len: usize,
		/// Bytes left in the stream.
		rem: usize,
	},
	/// Basic field type the tagfile decoder does not handle.
	#[error("unsupported tagfile field type {ty}")]
	UnsupportedTagFieldType {
		/// Basic type nibble.
		ty: i64,
	},
	/// Objects referenced but never defined before the end of the file.
	#[error("unresolved forward references still exist after parsing: {ids:?}")]
	UnresolvedForwardRefs {
		/// Object IDs with no definition, ascending.
		ids: Vec<i64>,
	},
}
