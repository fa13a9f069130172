use std::collections::HashMap;
use std::rc::Rc;

use half::f16;

use crate::hkx::bytes::cstring_at;
use crate::hkx::{
	Class, ClassMember, Cursor, HavokType, HkxError, Layout, LayoutRules, Result, StructRef, StructValue, Value, new_ref,
};

/// Reflection-driven object decoder over a relocated packfile buffer.
///
/// Objects are memoised by absolute offset; the handle is registered before
/// its body is decoded so self-referencing graphs terminate.
pub(crate) struct Decoder<'a> {
	bytes: &'a [u8],
	layout: &'a Layout,
	rules: LayoutRules,
	structures: HashMap<u64, StructRef>,
}

impl<'a> Decoder<'a> {
	pub(crate) fn new(bytes: &'a [u8], layout: &'a Layout, rules: LayoutRules) -> Self {
		Self {
			bytes,
			layout,
			rules,
			structures: HashMap::new(),
		}
	}

	/// Materialize the object of `class` at absolute offset `ptr`.
	pub(crate) fn structure_at(&mut self, class: &'a Class, ptr: u64) -> Result<StructRef> {
		if let Some(existing) = self.structures.get(&ptr) {
			log::trace!("reusing object at {ptr:#x}");
			return Ok(Rc::clone(existing));
		}

		log::debug!("materializing {} at {ptr:#x}", class.name);
		let handle = new_ref();
		self.structures.insert(ptr, Rc::clone(&handle));

		let pos = usize::try_from(ptr).map_err(|_| HkxError::SeekOutOfBounds {
			mark: 0,
			offset: usize::MAX,
			len: self.bytes.len(),
		})?;
		let mut cursor = Cursor::at(self.bytes, pos, self.rules)?;
		let mut body = StructValue::default();
		self.parse_structure(class, &mut cursor, false, &mut body)?;
		*handle.borrow_mut() = body;
		Ok(handle)
	}

	fn parse_structure(&mut self, declared: &'a Class, cursor: &mut Cursor<'a>, nested: bool, out: &mut StructValue) -> Result<()> {
		let class = if nested { declared } else { self.runtime_class(declared, cursor)? };

		if let Some(parent) = self.layout.parent_of(class)? {
			self.parse_structure(parent, cursor, true, out)?;
		}

		out.class_names.push(class.name.clone());
		cursor.mark();
		for member in class.members.iter().filter(|member| member.is_serialized()) {
			cursor.seek_from_mark(member.offset as usize)?;
			log::trace!("{}::{} ({:?}) at {}", class.name, member.name, member.ty, cursor.pos());
			let value = self.field(class, member, member.ty, cursor)?;
			out.fields.insert(member.name.clone(), value);
		}

		if nested {
			cursor.seek_from_mark(0)
		} else {
			cursor.seek_from_mark(class.object_size as usize)
		}
	}

	/// Resolve the class named by the object's vtable slot, when it has one.
	fn runtime_class(&self, declared: &'a Class, cursor: &mut Cursor<'a>) -> Result<&'a Class> {
		if !self.layout.may_have_vtable(&declared.name) {
			return Ok(declared);
		}

		let vtable = cursor.peek_ptr()?;
		if vtable == 0 {
			return Ok(declared);
		}

		let name = cstring_at(self.bytes, vtable, self.rules)?;
		if name == declared.name {
			return Ok(declared);
		}

		let actual = self.layout.require_class(&name)?;
		if !self.layout.is_derived_from(actual, &declared.name)? {
			return Err(HkxError::VtableMismatch {
				actual: name,
				declared: declared.name.clone(),
			});
		}
		log::debug!("object at {} declared {} is a {}", cursor.pos(), declared.name, actual.name);
		Ok(actual)
	}

	fn field(&mut self, class: &'a Class, member: &'a ClassMember, ty: HavokType, cursor: &mut Cursor<'a>) -> Result<Value> {
		let value = match ty {
			HavokType::Void | HavokType::Zero => Value::Void,
			HavokType::Bool => Value::bool(cursor.read_bool()?),
			HavokType::Char | HavokType::Int8 => Value::int(i64::from(cursor.read::<i8>()?)),
			HavokType::UInt8 => Value::Int(u64::from(cursor.read::<u8>()?)),
			HavokType::Int16 => Value::int(i64::from(cursor.read::<i16>()?)),
			HavokType::UInt16 => Value::Int(u64::from(cursor.read_u16()?)),
			HavokType::Int32 => Value::int(i64::from(cursor.read_i32()?)),
			HavokType::UInt32 => Value::Int(u64::from(cursor.read_u32()?)),
			HavokType::Int64 => Value::int(cursor.read::<i64>()?),
			HavokType::UInt64 => Value::Int(cursor.read::<u64>()?),
			HavokType::ULong => Value::Int(cursor.read_ptr()?),
			HavokType::Real => Value::Float(cursor.read_f32()?),
			HavokType::Half => Value::Float(f16::from_bits(cursor.read_u16()?).to_f32()),
			HavokType::Vector4 => Value::Vector4(cursor.read_vector4()?),
			HavokType::Quaternion => Value::Quaternion(cursor.read_quaternion()?),
			HavokType::Matrix3 | HavokType::Rotation => Value::Matrix3(cursor.read_matrix3()?),
			HavokType::QsTransform => Value::QsTransform(cursor.read_qs_transform()?),
			HavokType::Matrix4 | HavokType::Transform => Value::Matrix4(cursor.read_matrix4()?),
			HavokType::Enum if member.subtype != HavokType::Enum => return self.field(class, member, member.subtype, cursor),
			HavokType::Pointer => self.pointer(class, member, cursor)?,
			HavokType::Array => self.array(class, member, cursor)?,
			HavokType::Struct => {
				let target = self.member_class(class, member)?;
				let saved = cursor.mark_pos();
				let mut body = StructValue::default();
				self.parse_structure(target, cursor, false, &mut body)?;
				cursor.mark_at(saved);
				Value::Struct(body)
			}
			HavokType::StringPtr => match cursor.read_ptr()? {
				0 => Value::String(String::new()),
				ptr => Value::String(cstring_at(self.bytes, ptr, self.rules)?),
			},
			HavokType::Enum
			| HavokType::FunctionPointer
			| HavokType::InPlaceArray
			| HavokType::SimpleArray
			| HavokType::HomogeneousArray
			| HavokType::Variant
			| HavokType::CString
			| HavokType::Flags
			| HavokType::RelArray => {
				return Err(HkxError::UnsupportedFieldType {
					class: class.name.clone(),
					member: member.name.clone(),
					ty,
				});
			}
		};
		Ok(value)
	}

	fn pointer(&mut self, class: &'a Class, member: &'a ClassMember, cursor: &mut Cursor<'a>) -> Result<Value> {
		let points_at_struct = member.subtype == HavokType::Struct || (member.subtype == HavokType::Pointer && member.class.is_some());
		if !points_at_struct {
			return Err(HkxError::UnsupportedPointerTarget {
				class: class.name.clone(),
				member: member.name.clone(),
				subtype: member.subtype,
			});
		}

		let target = self.member_class(class, member)?;
		match cursor.read_ptr()? {
			0 => Ok(Value::Ref(None)),
			ptr => Ok(Value::Ref(Some(self.structure_at(target, ptr)?))),
		}
	}

	fn array(&mut self, class: &'a Class, member: &'a ClassMember, cursor: &mut Cursor<'a>) -> Result<Value> {
		let ptr = cursor.read_ptr()?;
		let len = cursor.read_u32()? as usize;
		if len == 0 {
			return Ok(if member.subtype.is_byte() {
				Value::Bytes(Vec::new())
			} else {
				Value::Array(Vec::new())
			});
		}

		let pos = usize::try_from(ptr).map_err(|_| HkxError::SeekOutOfBounds {
			mark: 0,
			offset: usize::MAX,
			len: self.bytes.len(),
		})?;
		let mut items = Cursor::at(self.bytes, pos, self.rules)?;
		if member.subtype.is_byte() {
			return Ok(Value::Bytes(items.read_exact(len)?.to_vec()));
		}

		let mut out = Vec::with_capacity(len.min(items.remaining()));
		for _ in 0..len {
			out.push(self.field(class, member, member.subtype, &mut items)?);
		}
		Ok(Value::Array(out))
	}

	fn member_class(&self, class: &Class, member: &ClassMember) -> Result<&'a Class> {
		let Some(name) = member.class.as_deref() else {
			return Err(HkxError::MissingTypeClass {
				class: class.name.clone(),
				member: member.name.clone(),
			});
		};
		self.layout.require_class(name)
	}
}
