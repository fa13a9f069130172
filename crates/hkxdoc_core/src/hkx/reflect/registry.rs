use std::path::Path;

use crate::hkx::reflect::Layout;
use crate::hkx::{LayoutRules, Result};

/// Collection of layouts keyed by contents version and layout rules.
#[derive(Debug, Clone, Default)]
pub struct Registry {
	layouts: Vec<Layout>,
}

impl Registry {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a layout. A later layout with the same key replaces the earlier one.
	pub fn register(&mut self, layout: Layout) {
		log::debug!(
			"registering layout {} ({}) with {} classes",
			layout.name(),
			layout.rules(),
			layout.classes().len()
		);
		self.layouts
			.retain(|existing| !(existing.name() == layout.name() && existing.rules() == layout.rules()));
		self.layouts.push(layout);
	}

	/// Load and register a JSON layout file.
	pub fn load_json_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
		let raw = std::fs::read(path.as_ref())?;
		let layout = Layout::from_json_slice(&raw)?;
		self.register(layout);
		Ok(())
	}

	/// Find the layout for an exact version string and rules fingerprint.
	pub fn lookup(&self, version: &str, rules: &LayoutRules) -> Option<&Layout> {
		self.layouts
			.iter()
			.find(|layout| layout.name() == version && layout.rules().to_bytes() == rules.to_bytes())
	}

	/// Registered layouts in registration order.
	pub fn layouts(&self) -> &[Layout] {
		&self.layouts
	}

	/// Number of registered layouts.
	pub fn len(&self) -> usize {
		self.layouts.len()
	}

	/// Whether no layout is registered.
	pub fn is_empty(&self) -> bool {
		self.layouts.is_empty()
	}
}
