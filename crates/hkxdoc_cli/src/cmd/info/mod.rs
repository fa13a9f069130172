use std::path::PathBuf;

use hkxdoc::hkx::{Container, Cursor, HkxFile, PackfileHeader, Result, SectionHeader, TagfileParser};

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
}

/// Print container, header, and table summaries.
pub fn run(args: Args) -> Result<()> {
	let Args { path, json } = args;

	let file = HkxFile::open(&path)?;
	let endianness = file.endianness()?;
	let (packfile, tagfile) = match file.container {
		Container::Packfile => (Some(packfile_info(file.bytes())?), None),
		Container::Tagfile => (None, Some(tagfile_info(file.bytes())?)),
	};

	if json {
		let payload = InfoJson {
			path: path.display().to_string(),
			container: file.container.as_str(),
			compression: file.compression.as_str(),
			endianness: endianness.as_str(),
			packfile,
			tagfile,
		};
		emit_json(&payload);
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("container: {}", file.container.as_str());
	println!("compression: {}", file.compression.as_str());
	println!("endianness: {}", endianness.as_str());

	if let Some(info) = packfile {
		println!("file_version: {}", info.file_version);
		println!("user_tag: {}", info.user_tag);
		println!("layout_rules: {}", info.layout_rules);
		println!("contents_version: {}", info.contents_version);
		println!("root_class: {}", info.root_class.as_deref().unwrap_or("-"));
		println!("sections: {}", info.sections.len());
		println!();
		println!("tag\tdata_start\tdata\tlocal\tglobal\tvirtual\texports\timports");
		for section in &info.sections {
			println!(
				"{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
				section.tag,
				section.data_start,
				section.data,
				section.local_fixups,
				section.global_fixups,
				section.virtual_fixups,
				section.exports,
				section.imports
			);
		}
	}

	if let Some(info) = tagfile {
		println!("tagfile_version: {}", info.version.map_or_else(|| "-".to_owned(), |v| v.to_string()));
		println!("sdk_version: {}", info.sdk_version.as_deref().unwrap_or("-"));
		println!("objects: {}", info.objects);
		println!("types: {}", info.types.len());
		for item in &info.types {
			println!("  [{}] {} (parent {})", item.index, item.name, item.parent);
			for member in &item.members {
				println!("    {}: {}", member.name, member.ty);
			}
		}
	}

	Ok(())
}

fn packfile_info(bytes: &[u8]) -> Result<PackfileInfoJson> {
	let header = PackfileHeader::parse(bytes)?;
	let sections = SectionHeader::parse_all(bytes, &header)?;

	let mut rows = Vec::with_capacity(sections.len());
	for section in &sections {
		let regions = section.regions(bytes.len())?;
		rows.push(SectionJson {
			tag: section.tag.clone(),
			data_start: section.absolute_data_start,
			data: regions.data.len(),
			local_fixups: regions.local_fixups.len(),
			global_fixups: regions.global_fixups.len(),
			virtual_fixups: regions.virtual_fixups.len(),
			exports: regions.exports.len(),
			imports: regions.imports.len(),
		});
	}

	let root_class = usize::try_from(header.contents_class_name_section_index)
		.ok()
		.and_then(|idx| sections.get(idx))
		.zip(usize::try_from(header.contents_class_name_section_offset).ok())
		.and_then(|(section, offset)| {
			let at = usize::try_from(section.absolute_data_start).ok()? + offset;
			let mut cursor = Cursor::at(bytes, at, header.layout_rules).ok()?;
			let raw = cursor.read_cstring_bytes().ok()?;
			Some(String::from_utf8_lossy(raw).into_owned())
		});

	Ok(PackfileInfoJson {
		file_version: header.file_version,
		user_tag: header.user_tag,
		layout_rules: header.layout_rules.to_string(),
		contents_version: header.contents_version,
		root_class,
		flags: header.flags,
		sections: rows,
	})
}

fn tagfile_info(bytes: &[u8]) -> Result<TagfileInfoJson> {
	let mut parser = TagfileParser::new(bytes)?;
	parser.parse()?;

	let types = parser
		.types()
		.iter()
		.enumerate()
		.skip(1)
		.map(|(index, item)| TypeJson {
			index,
			name: item.name.clone(),
			parent: item.parent,
			members: item
				.members
				.iter()
				.map(|member| MemberJson {
					name: member.name.clone(),
					ty: member.describe(),
				})
				.collect(),
		})
		.collect();

	Ok(TagfileInfoJson {
		version: parser.version(),
		sdk_version: parser.sdk_version().map(str::to_owned),
		objects: parser.object_count(),
		types,
	})
}

#[derive(serde::Serialize)]
struct InfoJson {
	path: String,
	container: &'static str,
	compression: &'static str,
	endianness: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	packfile: Option<PackfileInfoJson>,
	#[serde(skip_serializing_if = "Option::is_none")]
	tagfile: Option<TagfileInfoJson>,
}

#[derive(serde::Serialize)]
struct PackfileInfoJson {
	file_version: i32,
	user_tag: i32,
	layout_rules: String,
	contents_version: String,
	root_class: Option<String>,
	flags: i32,
	sections: Vec<SectionJson>,
}

#[derive(serde::Serialize)]
struct SectionJson {
	tag: String,
	data_start: u32,
	data: usize,
	local_fixups: usize,
	global_fixups: usize,
	virtual_fixups: usize,
	exports: usize,
	imports: usize,
}

#[derive(serde::Serialize)]
struct TagfileInfoJson {
	version: Option<i64>,
	sdk_version: Option<String>,
	objects: usize,
	types: Vec<TypeJson>,
}

#[derive(serde::Serialize)]
struct TypeJson {
	index: usize,
	name: String,
	parent: i64,
	members: Vec<MemberJson>,
}

#[derive(serde::Serialize)]
struct MemberJson {
	name: String,
	#[serde(rename = "type")]
	ty: String,
}
