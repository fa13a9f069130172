use std::io::{self, Write};
use std::path::PathBuf;

use hkxdoc::hkx::{HkxFile, Result};

use crate::cmd::json::root_to_json;
use crate::cmd::print::{PrintOptions, print_root};
use crate::cmd::util::{emit_json, load_registry};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Reflection layout JSON; repeat for several layouts.
	#[arg(long = "layout")]
	pub layouts: Vec<PathBuf>,
	#[arg(long)]
	pub json: bool,
	#[arg(long)]
	pub max_depth: Option<u32>,
	#[arg(long)]
	pub max_array_items: Option<usize>,
	#[arg(long)]
	pub max_string_len: Option<usize>,
}

/// Decode the root object and print its reachable graph.
pub fn run(args: Args) -> Result<()> {
	let Args {
		path,
		layouts,
		json,
		max_depth,
		max_array_items,
		max_string_len,
	} = args;

	let registry = load_registry(&layouts)?;
	let file = HkxFile::open(&path)?;
	let root = file.load_root(&registry)?;

	if json {
		let payload = DumpJson {
			path: path.display().to_string(),
			container: file.container.as_str(),
			root: root.as_ref().map(root_to_json),
		};
		emit_json(&payload);
		return Ok(());
	}

	let Some(root) = root else {
		println!("root: none");
		return Ok(());
	};

	let defaults = PrintOptions::default();
	let options = PrintOptions {
		max_depth: max_depth.unwrap_or(defaults.max_depth),
		max_array_items: max_array_items.unwrap_or(defaults.max_array_items),
		max_string_len: max_string_len.unwrap_or(defaults.max_string_len),
	};

	let stdout = io::stdout();
	let mut out = stdout.lock();
	write!(out, "root = ")?;
	print_root(&mut out, &root, options)?;
	Ok(())
}

#[derive(serde::Serialize)]
struct DumpJson {
	path: String,
	container: &'static str,
	root: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
	use hkxdoc_testkit::{point_tagfile, root_class_layout_json, root_int_packfile};

	use crate::cmd::test_support::{fixture_arg, run_hkxdoc, run_hkxdoc_json, run_hkxdoc_stdout};

	#[test]
	fn dump_packfile_with_layout() {
		let layout = root_class_layout_json("hk_test_r1", [4, 1, 0, 1]).to_string();
		let layout = fixture_arg("dump_root_layout.json", layout.as_bytes());
		let path = fixture_arg("dump_root_int.hkx", &root_int_packfile("hk_test_r1", 42));

		let stdout = run_hkxdoc_stdout(&["dump", &path, "--layout", &layout]);
		assert_eq!(stdout, "root = #1 RootClass {\n  value = 42\n}\n");

		let json = run_hkxdoc_json(&["dump", &path, "--layout", &layout, "--json"]);
		assert_eq!(json["container"], "packfile");
		assert_eq!(json["root"]["$classes"][0], "RootClass");
		assert_eq!(json["root"]["fields"]["value"], 42);
	}

	#[test]
	fn dump_packfile_without_layout_fails() {
		let path = fixture_arg("dump_no_layout.hkx", &root_int_packfile("hk_test_r1", 1));
		let output = run_hkxdoc(&["dump", &path]);

		assert!(!output.status.success());
		let stderr = String::from_utf8_lossy(&output.stderr);
		assert!(stderr.contains("no packfile layout for version hk_test_r1"), "{stderr}");
	}

	#[test]
	fn dump_tagfile_honours_string_limit() {
		let path = fixture_arg("dump_point.hkx", &point_tagfile(-3, "a long label"));
		let stdout = run_hkxdoc_stdout(&["dump", &path, "--max-string-len", "6"]);

		assert!(stdout.starts_with("root = #1 Point {"), "{stdout}");
		assert!(stdout.contains("label = \"a long...\""), "{stdout}");
		assert!(stdout.contains("x = -3"), "{stdout}");
	}
}
