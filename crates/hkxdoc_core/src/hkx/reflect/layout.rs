use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::hkx::reflect::{Class, TypeInfo};
use crate::hkx::{HkxError, LayoutRules, Result};

/// On-disk layout document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutDocument {
	name: String,
	layout_rules: [u8; 4],
	#[serde(default)]
	classes: Vec<Class>,
	#[serde(default)]
	typeinfo: Vec<TypeInfo>,
}

/// Reflection tables for one (version, layout rules) pair.
///
/// Both tables are sorted by name so lookups are binary searches.
#[derive(Debug, Clone)]
pub struct Layout {
	name: String,
	rules: LayoutRules,
	classes: Vec<Class>,
	type_infos: Vec<TypeInfo>,
}

impl Layout {
	/// Build and validate a layout from unsorted tables.
	pub fn new(name: impl Into<String>, rules: LayoutRules, mut classes: Vec<Class>, mut type_infos: Vec<TypeInfo>) -> Result<Self> {
		classes.sort_by(|a, b| a.name.cmp(&b.name));
		type_infos.sort_by(|a, b| a.name.cmp(&b.name));

		let layout = Self {
			name: name.into(),
			rules,
			classes,
			type_infos,
		};
		layout.validate()?;
		Ok(layout)
	}

	/// Parse a JSON layout document.
	pub fn from_json_slice(raw: &[u8]) -> Result<Self> {
		let doc: LayoutDocument = serde_json::from_slice(raw)?;
		Self::new(doc.name, LayoutRules::from_bytes(doc.layout_rules), doc.classes, doc.typeinfo)
	}

	/// Serialize back into the JSON document shape.
	pub fn to_json_value(&self) -> Result<serde_json::Value> {
		let doc = LayoutDocument {
			name: self.name.clone(),
			layout_rules: self.rules.to_bytes(),
			classes: self.classes.clone(),
			typeinfo: self.type_infos.clone(),
		};
		Ok(serde_json::to_value(doc)?)
	}

	/// Contents version this layout describes.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Layout rules fingerprint.
	pub fn rules(&self) -> LayoutRules {
		self.rules
	}

	/// Classes sorted by name.
	pub fn classes(&self) -> &[Class] {
		&self.classes
	}

	/// Vtable-presence entries sorted by name.
	pub fn type_infos(&self) -> &[TypeInfo] {
		&self.type_infos
	}

	/// Find a class by name.
	pub fn class(&self, name: &str) -> Option<&Class> {
		self.classes
			.binary_search_by(|class| class.name.as_str().cmp(name))
			.ok()
			.map(|idx| &self.classes[idx])
	}

	/// Find a class by name or fail with [`HkxError::ClassNotFound`].
	pub fn require_class(&self, name: &str) -> Result<&Class> {
		self.class(name).ok_or_else(|| HkxError::ClassNotFound { name: name.to_owned() })
	}

	/// Direct parent of `class`, if any.
	pub fn parent_of(&self, class: &Class) -> Result<Option<&Class>> {
		match &class.parent {
			Some(parent) => self.require_class(parent).map(Some),
			None => Ok(None),
		}
	}

	/// Whether instances of `name` may start with a vtable pointer.
	///
	/// Classes missing from the vtable table are treated as vtable-bearing.
	pub fn may_have_vtable(&self, name: &str) -> bool {
		match self.type_infos.binary_search_by(|info| info.name.as_str().cmp(name)) {
			Ok(idx) => self.type_infos[idx].vtable != 0,
			Err(_) => true,
		}
	}

	/// Class chain of `name`, base class first.
	pub fn class_chain(&self, name: &str) -> Result<Vec<&Class>> {
		let mut chain = Vec::new();
		let mut current = Some(self.require_class(name)?);
		while let Some(class) = current {
			chain.push(class);
			current = self.parent_of(class)?;
		}
		chain.reverse();
		Ok(chain)
	}

	/// Whether `declared` appears in the parent chain of `actual` (inclusive).
	pub fn is_derived_from(&self, actual: &Class, declared: &str) -> Result<bool> {
		let mut current = Some(actual);
		while let Some(class) = current {
			if class.name == declared {
				return Ok(true);
			}
			current = self.parent_of(class)?;
		}
		Ok(false)
	}

	fn validate(&self) -> Result<()> {
		let corrupt = |reason: String| HkxError::CorruptLayout {
			layout: self.name.clone(),
			reason,
		};

		for pair in self.classes.windows(2) {
			if pair[0].name == pair[1].name {
				return Err(corrupt(format!("duplicate class {}", pair[0].name)));
			}
		}

		for class in &self.classes {
			if let Some(parent) = &class.parent
				&& self.class(parent).is_none()
			{
				return Err(corrupt(format!("class {} has unknown parent {parent}", class.name)));
			}
			for member in &class.members {
				if let Some(target) = &member.class
					&& self.class(target).is_none()
				{
					return Err(corrupt(format!("member {}::{} references unknown class {target}", class.name, member.name)));
				}
			}
		}

		for class in &self.classes {
			let mut seen = HashSet::new();
			let mut current = Some(class);
			while let Some(level) = current {
				if !seen.insert(level.name.as_str()) {
					return Err(corrupt(format!("class {} has a cyclic parent chain", class.name)));
				}
				current = level.parent.as_deref().and_then(|parent| self.class(parent));
			}
		}

		Ok(())
	}
}
