mod layout;
mod registry;
mod types;

/// Sorted reflection tables for one layout.
pub use layout::Layout;
/// Layout lookup by version and rules.
pub use registry::Registry;
/// Class, member, and type descriptors.
pub use types::{Class, ClassEnum, ClassEnumItem, ClassMember, HavokType, MEMBER_NOT_SERIALIZED, TypeInfo};
