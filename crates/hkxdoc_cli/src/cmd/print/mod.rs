use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use hkxdoc::hkx::{StructRef, StructValue, Value, Vector4};

use crate::cmd::util::truncate;

/// Output truncation limits for decoded values.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
	/// Maximum nesting depth for structs and arrays.
	pub max_depth: u32,
	/// Maximum number of elements printed for arrays and byte buffers.
	pub max_array_items: usize,
	/// Maximum number of Unicode scalar values printed for strings.
	pub max_string_len: usize,
}

impl Default for PrintOptions {
	fn default() -> Self {
		Self {
			max_depth: 8,
			max_array_items: 16,
			max_string_len: 200,
		}
	}
}

/// Print a decoded graph as indented `name = value` lines.
///
/// Shared structs are labelled `#n` the first time they are expanded; later
/// references print only the label, so aliasing and cycles terminate.
pub fn print_root(out: &mut impl Write, root: &StructRef, options: PrintOptions) -> io::Result<()> {
	let mut printer = Printer {
		out,
		options,
		labels: HashMap::new(),
	};
	printer.struct_ref(root, 0, 0)?;
	writeln!(printer.out)
}

struct Printer<'w, W: Write> {
	out: &'w mut W,
	options: PrintOptions,
	labels: HashMap<usize, usize>,
}

impl<W: Write> Printer<'_, W> {
	fn value(&mut self, value: &Value, indent: usize, depth: u32) -> io::Result<()> {
		match value {
			Value::Void => write!(self.out, "void"),
			Value::Int(_) => write!(self.out, "{}", value.as_i64().unwrap_or_default()),
			Value::Float(v) => write!(self.out, "{v}"),
			Value::Vector4(v) => write!(self.out, "{}", vec4(*v)),
			Value::Quaternion(q) => write!(self.out, "quat{}", vec4(q.0)),
			Value::Matrix3(m) => write!(self.out, "{}", rows(&m.rows)),
			Value::Matrix4(m) => write!(self.out, "{}", rows(&m.rows)),
			Value::QsTransform(qs) => write!(
				self.out,
				"qs(t={}, r={}, s={})",
				vec4(qs.translation),
				vec4(qs.rotation.0),
				vec4(qs.scale)
			),
			Value::Ref(None) => write!(self.out, "null"),
			Value::Ref(Some(handle)) => self.struct_ref(handle, indent, depth),
			Value::String(v) => write!(self.out, "{:?}", truncate(v, self.options.max_string_len)),
			Value::Bytes(bytes) => self.bytes(bytes),
			Value::Array(items) => self.array(items, indent, depth),
			Value::Struct(item) => {
				let name = class_label(item);
				if depth >= self.options.max_depth {
					return write!(self.out, "{name} {{ ... }}");
				}
				write!(self.out, "{name} ")?;
				self.fields(item, indent, depth)
			}
		}
	}

	fn struct_ref(&mut self, handle: &StructRef, indent: usize, depth: u32) -> io::Result<()> {
		let key = Rc::as_ptr(handle) as usize;
		let item = handle.borrow();
		let name = class_label(&item);

		if let Some(label) = self.labels.get(&key) {
			return write!(self.out, "#{label} {name}");
		}
		if depth >= self.options.max_depth {
			return write!(self.out, "{name} {{ ... }}");
		}

		let label = self.labels.len() + 1;
		self.labels.insert(key, label);
		write!(self.out, "#{label} {name} ")?;
		self.fields(&item, indent, depth)
	}

	fn fields(&mut self, item: &StructValue, indent: usize, depth: u32) -> io::Result<()> {
		if item.fields.is_empty() {
			return write!(self.out, "{{}}");
		}

		let pad = " ".repeat(indent + 2);
		writeln!(self.out, "{{")?;
		for (name, value) in &item.fields {
			write!(self.out, "{pad}{name} = ")?;
			self.value(value, indent + 2, depth + 1)?;
			writeln!(self.out)?;
		}
		write!(self.out, "{}}}", " ".repeat(indent))
	}

	fn array(&mut self, items: &[Value], indent: usize, depth: u32) -> io::Result<()> {
		if items.is_empty() {
			return write!(self.out, "[]");
		}
		if depth >= self.options.max_depth {
			return write!(self.out, "[... {} items]", items.len());
		}

		let pad = " ".repeat(indent + 2);
		writeln!(self.out, "[")?;
		for item in items.iter().take(self.options.max_array_items) {
			write!(self.out, "{pad}")?;
			self.value(item, indent + 2, depth + 1)?;
			writeln!(self.out)?;
		}
		if items.len() > self.options.max_array_items {
			writeln!(self.out, "{pad}... {} more", items.len() - self.options.max_array_items)?;
		}
		write!(self.out, "{}]", " ".repeat(indent))
	}

	fn bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
		write!(self.out, "bytes[{}]", bytes.len())?;
		for byte in bytes.iter().take(self.options.max_array_items) {
			write!(self.out, " {byte:02x}")?;
		}
		if bytes.len() > self.options.max_array_items {
			write!(self.out, " ...")?;
		}
		Ok(())
	}
}

fn class_label(item: &StructValue) -> &str {
	item.class_name().unwrap_or("<unresolved>")
}

fn vec4(v: Vector4) -> String {
	format!("({}, {}, {}, {})", v.x, v.y, v.z, v.w)
}

fn rows(rows: &[Vector4]) -> String {
	let rendered: Vec<String> = rows.iter().map(|row| vec4(*row)).collect();
	format!("[{}]", rendered.join(", "))
}
