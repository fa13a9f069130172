use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::OnceLock;

use hkxdoc_testkit::{target_dir as workspace_target_dir, write_fixture};

static HKXDOC_BIN: OnceLock<PathBuf> = OnceLock::new();

/// Write `bytes` under the fixture directory and return the path as a string argument.
pub(crate) fn fixture_arg(name: &str, bytes: &[u8]) -> String {
	write_fixture(name, bytes).to_string_lossy().into_owned()
}

pub(crate) fn run_hkxdoc(args: &[&str]) -> Output {
	Command::new(hkxdoc_bin()).args(args).output().expect("hkxdoc command executes")
}

pub(crate) fn run_hkxdoc_stdout(args: &[&str]) -> String {
	let output = run_hkxdoc(args);
	assert!(
		output.status.success(),
		"hkxdoc command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	String::from_utf8(output.stdout).expect("stdout should be utf8")
}

pub(crate) fn run_hkxdoc_json(args: &[&str]) -> serde_json::Value {
	let stdout = run_hkxdoc_stdout(args);
	serde_json::from_str(&stdout).expect("stdout should be valid json")
}

fn hkxdoc_bin() -> &'static PathBuf {
	HKXDOC_BIN.get_or_init(resolve_hkxdoc_bin)
}

fn resolve_hkxdoc_bin() -> PathBuf {
	if let Some(path) = option_env!("CARGO_BIN_EXE_hkxdoc") {
		return PathBuf::from(path);
	}

	let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
	let mut bin = workspace_target_dir().join("debug");
	bin.push(if cfg!(windows) { "hkxdoc.exe" } else { "hkxdoc" });

	let status = Command::new("cargo")
		.current_dir(&manifest_dir)
		.args(["build", "--quiet", "--bin", "hkxdoc"])
		.status()
		.expect("cargo build executes");
	assert!(status.success(), "failed to build hkxdoc binary at {}", bin.display());

	bin
}
