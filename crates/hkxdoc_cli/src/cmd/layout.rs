use std::path::PathBuf;

use hkxdoc::hkx::{Layout, Result};

#[derive(clap::Args)]
pub struct Args {
	pub file: PathBuf,
	/// Print the member table of one class.
	#[arg(long = "class")]
	pub class_name: Option<String>,
}

/// Summarize a reflection layout file, or one of its classes.
pub fn run(args: Args) -> Result<()> {
	let Args { file, class_name } = args;

	let raw = std::fs::read(&file)?;
	let layout = Layout::from_json_slice(&raw)?;

	let Some(class_name) = class_name else {
		println!("name: {}", layout.name());
		println!("layout_rules: {}", layout.rules());
		println!("classes: {}", layout.classes().len());
		println!("typeinfo: {}", layout.type_infos().len());
		println!();
		println!("class\tparent\tsize\tmembers\tvtable");
		for class in layout.classes() {
			println!(
				"{}\t{}\t{}\t{}\t{}",
				class.name,
				class.parent.as_deref().unwrap_or("-"),
				class.object_size,
				class.members.len(),
				layout.may_have_vtable(&class.name)
			);
		}
		return Ok(());
	};

	let class = layout.require_class(&class_name)?;
	let chain = layout.class_chain(&class_name)?;
	let chain: Vec<&str> = chain.iter().map(|item| item.name.as_str()).collect();

	println!("class: {}", class.name);
	println!("chain: {}", chain.join(" > "));
	println!("object_size: {}", class.object_size);
	println!("may_have_vtable: {}", layout.may_have_vtable(&class.name));
	println!();
	println!("offset\tname\ttype\tsubtype\tclass\tserialized");
	for member in &class.members {
		println!(
			"{}\t{}\t{:?}\t{:?}\t{}\t{}",
			member.offset,
			member.name,
			member.ty,
			member.subtype,
			member.class.as_deref().unwrap_or("-"),
			member.is_serialized()
		);
	}
	for item in &class.enums {
		let values: Vec<String> = item.items.iter().map(|entry| format!("{}={}", entry.name, entry.value)).collect();
		println!("enum {}: {}", item.name, values.join(", "));
	}
	Ok(())
}
