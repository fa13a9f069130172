use std::collections::HashMap;
use std::rc::Rc;

use hkxdoc::hkx::{StructRef, StructValue, Value, Vector4};
use serde_json::{Map, Value as Json, json};

/// Render a decoded graph as JSON.
///
/// The first occurrence of a shared struct becomes
/// `{"$id": n, "$classes": [...], "fields": {...}}`; later occurrences
/// become `{"$ref": n}`.
pub fn root_to_json(root: &StructRef) -> Json {
	let mut renderer = JsonRenderer { ids: HashMap::new() };
	renderer.struct_ref(root)
}

struct JsonRenderer {
	ids: HashMap<usize, usize>,
}

impl JsonRenderer {
	fn value(&mut self, value: &Value) -> Json {
		match value {
			Value::Void => Json::Null,
			Value::Int(_) => json!(value.as_i64().unwrap_or_default()),
			Value::Float(v) => float(*v),
			Value::Vector4(v) => vec4(*v),
			Value::Quaternion(q) => vec4(q.0),
			Value::Matrix3(m) => Json::Array(m.rows.iter().copied().map(vec4).collect()),
			Value::Matrix4(m) => Json::Array(m.rows.iter().copied().map(vec4).collect()),
			Value::QsTransform(qs) => json!({
				"translation": vec4(qs.translation),
				"rotation": vec4(qs.rotation.0),
				"scale": vec4(qs.scale),
			}),
			Value::Ref(None) => Json::Null,
			Value::Ref(Some(handle)) => self.struct_ref(handle),
			Value::Array(items) => Json::Array(items.iter().map(|item| self.value(item)).collect()),
			Value::Bytes(bytes) => json!(bytes),
			Value::String(text) => json!(text),
			Value::Struct(item) => {
				let mut out = Map::new();
				out.insert("$classes".to_owned(), json!(item.class_names));
				out.insert("fields".to_owned(), self.fields(item));
				Json::Object(out)
			}
		}
	}

	fn struct_ref(&mut self, handle: &StructRef) -> Json {
		let key = Rc::as_ptr(handle) as usize;
		if let Some(id) = self.ids.get(&key) {
			return json!({ "$ref": id });
		}

		let id = self.ids.len() + 1;
		self.ids.insert(key, id);

		let item = handle.borrow();
		let mut out = Map::new();
		out.insert("$id".to_owned(), json!(id));
		out.insert("$classes".to_owned(), json!(item.class_names));
		out.insert("fields".to_owned(), self.fields(&item));
		Json::Object(out)
	}

	fn fields(&mut self, item: &StructValue) -> Json {
		let fields = item
			.fields
			.iter()
			.map(|(name, value)| (name.clone(), self.value(value)))
			.collect::<Map<_, _>>();
		Json::Object(fields)
	}
}

fn float(value: f32) -> Json {
	serde_json::Number::from_f64(f64::from(value)).map_or(Json::Null, Json::Number)
}

fn vec4(v: Vector4) -> Json {
	Json::Array(v.lanes().into_iter().map(float).collect())
}
