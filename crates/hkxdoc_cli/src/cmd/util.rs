use std::path::PathBuf;

use hkxdoc::hkx::{Registry, Result};

/// Pretty-print a serializable payload to stdout.
pub(crate) fn emit_json<T: serde::Serialize>(payload: &T) {
	match serde_json::to_string_pretty(payload) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("error: failed to encode json: {err}"),
	}
}

/// Build a registry from every `--layout` file, in order.
pub(crate) fn load_registry(paths: &[PathBuf]) -> Result<Registry> {
	let mut registry = Registry::new();
	for path in paths {
		registry.load_json_file(path)?;
	}
	log::debug!("registry holds {} layouts", registry.len());
	Ok(registry)
}

/// Truncate to `max_len` Unicode scalar values, marking the cut.
pub(crate) fn truncate(input: &str, max_len: usize) -> String {
	if input.chars().count() <= max_len {
		return input.to_owned();
	}
	let out: String = input.chars().take(max_len).collect();
	format!("{out}...")
}
