mod types;

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::hkx::{Cursor, Endianness, HkxError, LayoutRules, Result, StructRef, StructValue, Value, Vector4, new_ref};

/// Tag command and member type descriptors.
pub use types::{ARRAY_FLAG, BasicType, TAGFILE_MAGIC, TUPLE_FLAG, TYPE_MASK, Tag, TagMemberInfo, TagTypeInfo};

/// Presence bitmap capacity in bits.
const MAX_MEMBERS: usize = 128;

/// Name of the builtin type at index 0.
const VOID_TYPE_NAME: &str = "BuiltinVoidType";

const BYTE: i64 = BasicType::Byte as i64;
const STRUCT: i64 = BasicType::Struct as i64;

/// Streaming decoder for tagfiles.
///
/// Types are described inline by `Metadata` commands, so no external
/// reflection layout is needed. Objects are numbered in definition order
/// starting at 1; references to objects not yet defined create placeholders
/// that are filled when the object arrives.
#[derive(Debug)]
pub struct TagfileParser<'a> {
	cursor: Cursor<'a>,
	strings: Vec<String>,
	types: Vec<Rc<TagTypeInfo>>,
	type_lookup: HashMap<String, usize>,
	objects: BTreeMap<i64, StructRef>,
	next_object: i64,
	version: Option<i64>,
	sdk_version: Option<String>,
}

impl<'a> TagfileParser<'a> {
	/// Detect byte order from the magic pair and position after it.
	pub fn new(bytes: &'a [u8]) -> Result<Self> {
		let endianness = detect_endianness(bytes)?;
		let cursor = Cursor::at(bytes, 8, LayoutRules::pointer_free(endianness))?;

		let void_type = TagTypeInfo {
			name: VOID_TYPE_NAME.to_owned(),
			tag: 0,
			parent: 0,
			members: vec![TagMemberInfo {
				name: "void".to_owned(),
				ty: 0,
				tuple_size: 0,
				class_name: String::new(),
			}],
		};

		Ok(Self {
			cursor,
			strings: vec![String::new(), String::new()],
			types: vec![Rc::new(void_type)],
			type_lookup: HashMap::new(),
			objects: BTreeMap::new(),
			next_object: 1,
			version: None,
			sdk_version: None,
		})
	}

	/// Byte order of fixed-width scalars.
	pub fn endianness(&self) -> Endianness {
		self.cursor.rules().endianness()
	}

	/// Format sub-version from the last `FileInfo` command.
	pub fn version(&self) -> Option<i64> {
		self.version
	}

	/// SDK version string carried by sub-version 4 files.
	pub fn sdk_version(&self) -> Option<&str> {
		self.sdk_version.as_deref()
	}

	/// Type table, including the builtin void type at index 0.
	pub fn types(&self) -> &[Rc<TagTypeInfo>] {
		&self.types
	}

	/// Number of object IDs allocated so far.
	pub fn object_count(&self) -> usize {
		self.objects.len()
	}

	/// Decode the command stream and return object 1, if any.
	pub fn parse(&mut self) -> Result<Option<StructRef>> {
		loop {
			let code = self.cursor.read_var_int()?;
			match Tag::from_code(code) {
				Some(Tag::FileInfo) => self.file_info()?,
				Some(Tag::Metadata) => {
					let info = self.read_type_info()?;
					log::debug!("type {} = {} ({} members)", self.types.len(), info.name, info.members.len());
					self.type_lookup.entry(info.name.clone()).or_insert(self.types.len());
					self.types.push(Rc::new(info));
				}
				Some(Tag::ObjectRemember) => {
					let id = self.next_object;
					self.next_object += 1;
					let handle = self.object_handle(id);
					let body = self.parse_struct(0)?;
					log::debug!("object {id} is {}", body.class_name().unwrap_or_default());
					*handle.borrow_mut() = body;
				}
				Some(Tag::FileEnd) => break,
				_ => return Err(HkxError::UnsupportedTag { tag: code }),
			}
		}

		let unresolved: Vec<i64> = self
			.objects
			.iter()
			.filter(|(_, handle)| !handle.borrow().is_resolved())
			.map(|(id, _)| *id)
			.collect();
		if !unresolved.is_empty() {
			return Err(HkxError::UnresolvedForwardRefs { ids: unresolved });
		}

		Ok(self.objects.get(&1).cloned())
	}

	fn file_info(&mut self) -> Result<()> {
		let version = self.cursor.read_var_int()?;
		if !matches!(version, 3 | 4) {
			return Err(HkxError::UnsupportedTagfileVersion { version });
		}

		self.strings.clear();
		self.strings.extend([String::new(), String::new()]);
		self.version = Some(version);
		if version == 4 {
			self.sdk_version = Some(self.read_string()?);
		}
		log::debug!("tagfile version {version}, sdk {:?}", self.sdk_version);
		Ok(())
	}

	/// Read a pooled string: `len <= 0` refers back to entry `-len`.
	fn read_string(&mut self) -> Result<String> {
		let len = self.cursor.read_var_int()?;
		if len <= 0 {
			let index = len.unsigned_abs();
			return usize::try_from(index)
				.ok()
				.and_then(|idx| self.strings.get(idx))
				.cloned()
				.ok_or(HkxError::StringIndexOutOfRange {
					index: len.saturating_neg(),
					len: self.strings.len(),
				});
		}

		let raw = self.cursor.read_exact(len as usize)?;
		let value = String::from_utf8_lossy(raw).into_owned();
		self.strings.push(value.clone());
		Ok(value)
	}

	fn read_type_info(&mut self) -> Result<TagTypeInfo> {
		let name = self.read_string()?;
		let tag = self.cursor.read_var_int()?;
		let parent = self.cursor.read_var_int()?;
		let count = self.read_len("member count")?;

		let mut members = Vec::with_capacity(count.min(self.cursor.remaining()));
		for _ in 0..count {
			let name = self.read_string()?;
			let ty = self.cursor.read_var_int()?;
			let tuple_size = if ty & TUPLE_FLAG != 0 { self.cursor.read_var_int()? } else { 0 };
			let class_name = match BasicType::from_code(ty) {
				Some(BasicType::Object | BasicType::Struct) => self.read_string()?,
				_ => String::new(),
			};
			members.push(TagMemberInfo {
				name,
				ty,
				tuple_size,
				class_name,
			});
		}

		Ok(TagTypeInfo {
			name,
			tag,
			parent,
			members,
		})
	}

	fn read_len(&mut self, kind: &'static str) -> Result<usize> {
		let len = self.cursor.read_var_int()?;
		usize::try_from(len).map_err(|_| HkxError::NegativeLength { kind, len })
	}

	/// Shared handle for object `id`, creating a placeholder on first sight.
	fn object_handle(&mut self, id: i64) -> StructRef {
		if let Some(existing) = self.objects.get(&id) {
			log::trace!("back reference to object {id}");
			return Rc::clone(existing);
		}
		log::trace!("forward reference to object {id}");
		let handle = new_ref();
		self.objects.insert(id, Rc::clone(&handle));
		handle
	}

	fn type_at(&self, index: i64) -> Result<Rc<TagTypeInfo>> {
		usize::try_from(index)
			.ok()
			.and_then(|idx| self.types.get(idx))
			.cloned()
			.ok_or(HkxError::TypeIndexOutOfRange {
				index,
				len: self.types.len(),
			})
	}

	/// Type chain of `index`, base type first.
	fn type_chain(&self, index: i64) -> Result<Vec<Rc<TagTypeInfo>>> {
		let mut chain = Vec::new();
		let mut current = index;
		while current != 0 {
			let info = self.type_at(current)?;
			if chain.len() >= self.types.len() {
				return Err(HkxError::TypeChainCycle { name: info.name.clone() });
			}
			current = info.parent;
			chain.push(info);
		}
		chain.reverse();
		Ok(chain)
	}

	fn lookup_type(&self, name: &str) -> Result<i64> {
		self.type_lookup
			.get(name)
			.map(|idx| *idx as i64)
			.ok_or_else(|| HkxError::ClassNotFound { name: name.to_owned() })
	}

	fn read_bitmap(&mut self, chain: &[Rc<TagTypeInfo>]) -> Result<(usize, Vec<u8>)> {
		let count: usize = chain.iter().map(|info| info.members.len()).sum();
		if count > MAX_MEMBERS {
			return Err(HkxError::TooManyMembers {
				class: chain.last().map(|info| info.name.clone()).unwrap_or_default(),
				count,
				max: MAX_MEMBERS,
			});
		}
		let bitmap = self.cursor.read_exact(count.div_ceil(8))?.to_vec();
		Ok((count, bitmap))
	}

	/// Decode one struct body; `class_index == 0` reads the index from the stream.
	fn parse_struct(&mut self, class_index: i64) -> Result<StructValue> {
		let class_index = if class_index == 0 {
			match self.cursor.read_var_int()? {
				0 => return Err(HkxError::VoidObjectClass),
				index => index,
			}
		} else {
			class_index
		};

		let chain = self.type_chain(class_index)?;
		let (_, bitmap) = self.read_bitmap(&chain)?;

		let mut out = StructValue::default();
		let mut index = 0;
		for level in &chain {
			out.class_names.push(level.name.clone());
			for member in &level.members {
				if bit_set(&bitmap, index) {
					log::trace!("{}.{} ({})", level.name, member.name, member.describe());
					let value = self.parse_field(member)?;
					out.fields.insert(member.name.clone(), value);
				}
				index += 1;
			}
		}
		Ok(out)
	}

	fn parse_field(&mut self, member: &TagMemberInfo) -> Result<Value> {
		let ty = member.ty;
		if ty & !(ARRAY_FLAG | TUPLE_FLAG | TYPE_MASK) != 0 {
			return Err(HkxError::UnsupportedMemberFlags {
				member: member.name.clone(),
				ty,
			});
		}

		if ty == TUPLE_FLAG | BYTE {
			let len = usize::try_from(member.tuple_size).map_err(|_| HkxError::NegativeLength {
				kind: "tuple size",
				len: member.tuple_size,
			})?;
			return Ok(Value::Bytes(self.cursor.read_exact(len)?.to_vec()));
		}
		if ty == ARRAY_FLAG | BYTE {
			let len = self.read_len("byte array length")?;
			return Ok(Value::Bytes(self.cursor.read_exact(len)?.to_vec()));
		}

		if ty & (ARRAY_FLAG | TUPLE_FLAG) != 0 {
			if ty & (ARRAY_FLAG | TUPLE_FLAG) == ARRAY_FLAG | TUPLE_FLAG {
				return Err(HkxError::ArrayAndTuple {
					member: member.name.clone(),
				});
			}
			let len = if member.is_tuple() {
				usize::try_from(member.tuple_size).map_err(|_| HkxError::NegativeLength {
					kind: "tuple size",
					len: member.tuple_size,
				})?
			} else {
				self.read_len("array length")?
			};
			return Ok(Value::Array(self.parse_array(member, len)?));
		}

		self.parse_field_value(member.basic(), &member.class_name, None)
	}

	/// Decode `len` values of `member`'s basic type.
	fn parse_array(&mut self, member: &TagMemberInfo, len: usize) -> Result<Vec<Value>> {
		let basic = BasicType::from_code(member.ty);
		let prefix = match basic {
			Some(BasicType::Int) => {
				let width = self.cursor.read_var_int()?;
				if !matches!(width, 1 | 2 | 4 | 8) {
					log::warn!("array {} has unexpected integer width prefix {width}", member.name);
				}
				None
			}
			Some(BasicType::Vec4) => Some(self.cursor.read_var_int()?),
			_ => None,
		};

		if basic == Some(BasicType::Struct) {
			return self.parse_struct_array(member, len);
		}

		let mut out = Vec::with_capacity(len.min(self.cursor.remaining()));
		for _ in 0..len {
			out.push(self.parse_field_value(member.basic(), &member.class_name, prefix)?);
		}
		Ok(out)
	}

	/// Decode a struct array column by column.
	///
	/// The stream holds every element's value of the first present member,
	/// then every element's value of the next one, and so on.
	fn parse_struct_array(&mut self, member: &TagMemberInfo, len: usize) -> Result<Vec<Value>> {
		let class_index = if member.class_name.is_empty() {
			if member.ty == ARRAY_FLAG | STRUCT {
				self.cursor.read_var_int()?
			} else {
				0
			}
		} else {
			self.lookup_type(&member.class_name)?
		};
		if class_index == 0 {
			return Err(HkxError::StructArrayClassUnknown {
				member: member.name.clone(),
			});
		}

		let chain = self.type_chain(class_index)?;
		let (count, bitmap) = self.read_bitmap(&chain)?;
		let columns: Vec<&TagMemberInfo> = chain.iter().flat_map(|info| info.members.iter()).collect();

		// Struct columns bound themselves; every other present column takes
		// at least one byte per element.
		let consumes_bytes = columns
			.iter()
			.enumerate()
			.take(count)
			.any(|(index, column)| bit_set(&bitmap, index) && BasicType::from_code(column.ty) != Some(BasicType::Struct));
		if consumes_bytes && len > self.cursor.remaining() {
			return Err(HkxError::StructArrayTooLarge {
				member: member.name.clone(),
				len,
				rem: self.cursor.remaining(),
			});
		}

		let template = StructValue::with_classes(chain.iter().map(|info| info.name.clone()).collect());
		let mut elements = Vec::new();
		elements.try_reserve_exact(len).map_err(|_| HkxError::StructArrayTooLarge {
			member: member.name.clone(),
			len,
			rem: self.cursor.remaining(),
		})?;
		elements.resize(len, template);

		for (index, column) in columns.into_iter().enumerate().take(count) {
			if !bit_set(&bitmap, index) {
				continue;
			}
			log::trace!("struct array {} column {}", member.name, column.name);
			let values = self.parse_array(column, len)?;
			for (element, value) in elements.iter_mut().zip(values) {
				element.fields.insert(column.name.clone(), value);
			}
		}

		Ok(elements.into_iter().map(Value::Struct).collect())
	}

	fn parse_field_value(&mut self, basic: i64, class_name: &str, prefix: Option<i64>) -> Result<Value> {
		let value = match BasicType::from_code(basic) {
			Some(BasicType::Byte) => Value::Int(u64::from(self.cursor.read_byte()?)),
			Some(BasicType::Int) => Value::int(self.cursor.read_var_int()?),
			Some(BasicType::Real) => Value::Float(self.cursor.read_f32()?),
			Some(BasicType::Vec4) => {
				let width = prefix.unwrap_or(4);
				if !(1..=4).contains(&width) {
					return Err(HkxError::UnsupportedVec4Width { width });
				}
				let mut lanes = [0.0_f32; 4];
				for lane in lanes.iter_mut().take(width as usize) {
					*lane = self.cursor.read_f32()?;
				}
				Value::Vector4(Vector4::from_lanes(lanes))
			}
			Some(BasicType::Vec12) => Value::Matrix3(self.cursor.read_matrix3()?),
			Some(BasicType::Vec16) => Value::Matrix4(self.cursor.read_matrix4()?),
			Some(BasicType::Object) => match self.cursor.read_var_int()? {
				0 => Value::Ref(None),
				id => Value::Ref(Some(self.object_handle(id))),
			},
			Some(BasicType::Struct) => {
				let class_index = if class_name.is_empty() { 0 } else { self.lookup_type(class_name)? };
				Value::Struct(self.parse_struct(class_index)?)
			}
			Some(BasicType::CString) => Value::String(self.read_string()?),
			_ => return Err(HkxError::UnsupportedTagFieldType { ty: basic }),
		};
		Ok(value)
	}
}

fn detect_endianness(bytes: &[u8]) -> Result<Endianness> {
	let mut cursor = Cursor::new(bytes, LayoutRules::pointer_free(Endianness::Little));
	let magic0 = cursor.read_u32()?;
	let magic1 = cursor.read_u32()?;

	if [magic0, magic1] == TAGFILE_MAGIC {
		Ok(Endianness::Little)
	} else if [magic0.swap_bytes(), magic1.swap_bytes()] == TAGFILE_MAGIC {
		Ok(Endianness::Big)
	} else {
		Err(HkxError::TagfileBadMagic { magic0, magic1 })
	}
}

fn bit_set(bitmap: &[u8], index: usize) -> bool {
	bitmap.get(index / 8).is_some_and(|byte| byte & (1 << (index % 8)) != 0)
}

#[cfg(test)]
mod tests;
