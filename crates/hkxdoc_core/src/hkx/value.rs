use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Shared handle to a decoded object.
///
/// Every field that references the same source object holds a clone of the
/// same handle, so identity can be checked with [`Rc::ptr_eq`].
pub type StructRef = Rc<RefCell<StructValue>>;

/// Runtime value produced by both container loaders.
#[derive(Debug, Clone)]
pub enum Value {
	/// Absent value (`Void`/`Zero` members).
	Void,
	/// Integer scalar, sign- or zero-extended to 64 bits and stored bit-for-bit.
	Int(u64),
	/// 32-bit float scalar (also carries expanded half floats).
	Float(f32),
	/// Four float lanes.
	Vector4(Vector4),
	/// Rotation quaternion.
	Quaternion(Quaternion),
	/// Three-row matrix.
	Matrix3(Matrix3),
	/// Translation, rotation, scale.
	QsTransform(QsTransform),
	/// Four-row matrix.
	Matrix4(Matrix4),
	/// Reference to a shared object, or null.
	Ref(Option<StructRef>),
	/// Ordered element sequence.
	Array(Vec<Value>),
	/// Raw byte sequence from byte-typed arrays and tuples.
	Bytes(Vec<u8>),
	/// Text string.
	String(String),
	/// Object embedded by value.
	Struct(StructValue),
}

impl Value {
	/// Store a signed integer in the canonical 64-bit slot.
	pub fn int(value: i64) -> Self {
		Self::Int(value as u64)
	}

	/// Store a boolean as `0`/`1`.
	pub fn bool(value: bool) -> Self {
		Self::Int(u64::from(value))
	}

	/// Integer payload reinterpreted as signed.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Int(value) => Some(*value as i64),
			_ => None,
		}
	}

	/// Float payload.
	pub fn as_f32(&self) -> Option<f32> {
		match self {
			Self::Float(value) => Some(*value),
			_ => None,
		}
	}

	/// String payload.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(value) => Some(value),
			_ => None,
		}
	}

	/// Referenced object handle, when this is a non-null reference.
	pub fn as_struct_ref(&self) -> Option<&StructRef> {
		match self {
			Self::Ref(Some(handle)) => Some(handle),
			_ => None,
		}
	}

	/// Short label for the active case.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Void => "void",
			Self::Int(_) => "int",
			Self::Float(_) => "float",
			Self::Vector4(_) => "vector4",
			Self::Quaternion(_) => "quaternion",
			Self::Matrix3(_) => "matrix3",
			Self::QsTransform(_) => "qstransform",
			Self::Matrix4(_) => "matrix4",
			Self::Ref(_) => "ref",
			Self::Array(_) => "array",
			Self::Bytes(_) => "bytes",
			Self::String(_) => "string",
			Self::Struct(_) => "struct",
		}
	}
}

/// Four `f32` lanes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector4 {
	/// First lane.
	pub x: f32,
	/// Second lane.
	pub y: f32,
	/// Third lane.
	pub z: f32,
	/// Fourth lane.
	pub w: f32,
}

impl Vector4 {
	/// Lanes as an array.
	pub fn lanes(self) -> [f32; 4] {
		[self.x, self.y, self.z, self.w]
	}

	/// Build from an array of lanes.
	pub fn from_lanes(lanes: [f32; 4]) -> Self {
		let [x, y, z, w] = lanes;
		Self { x, y, z, w }
	}
}

/// Rotation stored as one [`Vector4`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quaternion(pub Vector4);

/// Three [`Vector4`] rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Matrix3 {
	/// Rows in storage order.
	pub rows: [Vector4; 3],
}

/// Four [`Vector4`] rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Matrix4 {
	/// Rows in storage order.
	pub rows: [Vector4; 4],
}

/// Translation, rotation, scale triple.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QsTransform {
	/// Translation lanes.
	pub translation: Vector4,
	/// Rotation quaternion.
	pub rotation: Quaternion,
	/// Scale lanes.
	pub scale: Vector4,
}

/// One decoded object instance.
#[derive(Debug, Clone, Default)]
pub struct StructValue {
	/// Class chain that contributed fields, base class first.
	pub class_names: Vec<String>,
	/// Decoded fields keyed by member name.
	pub fields: BTreeMap<String, Value>,
}

impl StructValue {
	/// Empty struct stamped with a class chain.
	pub fn with_classes(class_names: Vec<String>) -> Self {
		Self {
			class_names,
			fields: BTreeMap::new(),
		}
	}

	/// Most-derived class name.
	pub fn class_name(&self) -> Option<&str> {
		self.class_names.last().map(String::as_str)
	}

	/// Look up a field by member name.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.fields.get(name)
	}

	/// Whether the object has been defined (its class chain is known).
	pub fn is_resolved(&self) -> bool {
		!self.class_names.is_empty()
	}

	/// Wrap in a fresh shared handle.
	pub fn into_ref(self) -> StructRef {
		Rc::new(RefCell::new(self))
	}
}

/// Allocate an empty, unresolved object handle.
pub fn new_ref() -> StructRef {
	StructValue::default().into_ref()
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use super::{StructValue, Value, new_ref};

	#[test]
	fn negative_ints_round_trip_through_unsigned_slot() {
		let value = Value::int(-5);
		assert!(matches!(value, Value::Int(bits) if bits == u64::MAX - 4));
		assert_eq!(value.as_i64(), Some(-5));
	}

	#[test]
	fn placeholder_resolves_in_place() {
		let handle = new_ref();
		let alias = Rc::clone(&handle);
		assert!(!handle.borrow().is_resolved());

		let mut body = StructValue::with_classes(vec!["Base".to_owned(), "Derived".to_owned()]);
		body.fields.insert("n".to_owned(), Value::int(1));
		*handle.borrow_mut() = body;

		let seen = alias.borrow();
		assert!(seen.is_resolved());
		assert_eq!(seen.class_name(), Some("Derived"));
		assert_eq!(seen.get("n").and_then(Value::as_i64), Some(1));
	}
}
