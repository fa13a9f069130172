use std::rc::Rc;

use hkxdoc_testkit::{MemberSpec, TagfileWriter};

use crate::hkx::{ARRAY_FLAG, Endianness, HkxError, StructRef, TUPLE_FLAG, TagfileParser, Value};

const BYTE: i64 = 1;
const INT: i64 = 2;
const REAL: i64 = 3;
const VEC4: i64 = 4;
const OBJECT: i64 = 8;
const STRUCT: i64 = 9;
const CSTRING: i64 = 10;

fn parse(bytes: &[u8]) -> Option<StructRef> {
	let mut parser = TagfileParser::new(bytes).expect("magic accepted");
	parser.parse().expect("tagfile parses")
}

fn parse_err(bytes: &[u8]) -> HkxError {
	let mut parser = TagfileParser::new(bytes).expect("magic accepted");
	parser.parse().expect_err("tagfile should fail")
}

fn ints(value: Option<&Value>) -> Vec<i64> {
	match value {
		Some(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
		_ => Vec::new(),
	}
}

#[test]
fn absent_member_is_not_decoded() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Pair", 0, 0, &[MemberSpec::new("a", INT), MemberSpec::new("b", INT)])
		.object_remember(1)
		.bytes(&[0b10])
		.var_int(7)
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	assert_eq!(root.class_names, ["Pair"]);
	assert_eq!(root.fields.len(), 1);
	assert!(root.get("a").is_none());
	assert_eq!(root.get("b").and_then(Value::as_i64), Some(7));
}

#[test]
fn swapped_magic_flips_scalar_byte_order_only() {
	let mut w = TagfileWriter::big_endian();
	w.file_info(4, Some("hk_2014.1.0-r1"))
		.metadata("Sample", 0, 0, &[MemberSpec::new("r", REAL), MemberSpec::new("n", INT)])
		.object_remember(1)
		.bytes(&[0b11])
		.f32(1.5)
		.var_int(-300)
		.file_end();

	let bytes = w.finish();
	let mut parser = TagfileParser::new(&bytes).expect("swapped magic accepted");
	assert_eq!(parser.endianness(), Endianness::Big);
	let root = parser.parse().expect("tagfile parses").expect("root object");

	assert_eq!(parser.version(), Some(4));
	assert_eq!(parser.sdk_version(), Some("hk_2014.1.0-r1"));
	let root = root.borrow();
	assert_eq!(root.get("r").and_then(Value::as_f32), Some(1.5));
	assert_eq!(root.get("n").and_then(Value::as_i64), Some(-300));
}

#[test]
fn bad_magic_is_rejected() {
	let err = TagfileParser::new(&[0_u8; 16]).expect_err("zero magic");
	assert!(matches!(err, HkxError::TagfileBadMagic { magic0: 0, magic1: 0 }));
}

#[test]
fn unsupported_version_is_rejected() {
	let mut w = TagfileWriter::new();
	w.file_info(5, None).file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::UnsupportedTagfileVersion { version: 5 }));
}

#[test]
fn unknown_top_level_tag_is_rejected() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None).var_int(3);
	assert!(matches!(parse_err(&w.finish()), HkxError::UnsupportedTag { tag: 3 }));
}

#[test]
fn empty_stream_has_no_root() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None).file_end();
	let bytes = w.finish();
	let mut parser = TagfileParser::new(&bytes).expect("magic accepted");
	assert!(parser.parse().expect("tagfile parses").is_none());
	assert_eq!(parser.types()[0].name, "BuiltinVoidType");
}

fn item_types(w: &mut TagfileWriter) {
	w.metadata(
		"Item",
		0,
		0,
		&[MemberSpec::new("x", INT), MemberSpec::new("y", REAL), MemberSpec::new("z", INT)],
	);
}

#[test]
fn struct_array_is_column_major() {
	let mut columns = TagfileWriter::new();
	columns.file_info(3, None);
	item_types(&mut columns);
	columns
		.metadata("Holder", 0, 0, &[MemberSpec::new("items", ARRAY_FLAG | STRUCT).class("Item")])
		.object_remember(2)
		.bytes(&[0b1])
		.var_int(3)
		.bytes(&[0b011])
		.var_int(4)
		.var_int(1)
		.var_int(2)
		.var_int(3)
		.f32(0.5)
		.f32(1.5)
		.f32(2.5)
		.file_end();

	let mut rows = TagfileWriter::new();
	rows.file_info(3, None);
	item_types(&mut rows);
	rows.metadata("Holder", 0, 0, &[MemberSpec::new("items", ARRAY_FLAG | OBJECT).class("Item")])
		.object_remember(2)
		.bytes(&[0b1])
		.var_int(3)
		.var_int(2)
		.var_int(3)
		.var_int(4);
	for (x, y) in [(1, 0.5), (2, 1.5), (3, 2.5)] {
		rows.object_remember(1).bytes(&[0b011]).var_int(x).f32(y);
	}
	rows.file_end();

	let by_column = parse(&columns.finish()).expect("column-major root");
	let by_row = parse(&rows.finish()).expect("row-major root");

	let by_column = by_column.borrow();
	let Some(Value::Array(elements)) = by_column.get("items") else {
		panic!("items should be an array");
	};
	let by_row = by_row.borrow();
	let Some(Value::Array(refs)) = by_row.get("items") else {
		panic!("items should be an array");
	};
	assert_eq!(elements.len(), 3);
	assert_eq!(refs.len(), 3);

	for (element, reference) in elements.iter().zip(refs) {
		let Value::Struct(element) = element else {
			panic!("struct array elements are embedded");
		};
		let reference = reference.as_struct_ref().expect("object reference").borrow();

		assert_eq!(element.class_names, ["Item"]);
		assert_eq!(element.fields.len(), 2);
		assert!(element.get("z").is_none());
		for field in ["x", "y"] {
			let ours = element.get(field).expect("field present");
			let theirs = reference.get(field).expect("field present");
			assert_eq!(ours.as_i64(), theirs.as_i64(), "{field}");
			assert_eq!(ours.as_f32(), theirs.as_f32(), "{field}");
		}
	}

	let Value::Struct(last) = &elements[2] else {
		panic!("struct element");
	};
	assert_eq!(last.get("x").and_then(Value::as_i64), Some(3));
	assert_eq!(last.get("y").and_then(Value::as_f32), Some(2.5));
}

#[test]
fn untyped_struct_array_reads_class_index() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None);
	item_types(&mut w);
	w.metadata("Holder", 0, 0, &[MemberSpec::new("items", ARRAY_FLAG | STRUCT)])
		.object_remember(2)
		.bytes(&[0b1])
		.var_int(1)
		.var_int(1)
		.bytes(&[0b100])
		.var_int(4)
		.var_int(-8)
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	let Some(Value::Array(elements)) = root.get("items") else {
		panic!("items should be an array");
	};
	let Value::Struct(element) = &elements[0] else {
		panic!("struct element");
	};
	assert_eq!(element.get("z").and_then(Value::as_i64), Some(-8));
}

#[test]
fn struct_array_without_class_is_rejected() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Holder", 0, 0, &[MemberSpec::new("items", TUPLE_FLAG | STRUCT).tuple(2)])
		.object_remember(1)
		.bytes(&[0b1])
		.file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::StructArrayClassUnknown { .. }));
}

#[test]
fn forward_reference_without_definition_fails() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Node", 0, 0, &[MemberSpec::new("next", OBJECT).class("Node")])
		.object_remember(1)
		.bytes(&[0b1])
		.var_int(5)
		.file_end();
	let err = parse_err(&w.finish());
	assert!(matches!(err, HkxError::UnresolvedForwardRefs { ref ids } if ids == &[5]));
}

#[test]
fn repeated_ids_share_one_object() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata(
			"Node",
			0,
			0,
			&[MemberSpec::new("a", OBJECT).class("Leaf"), MemberSpec::new("b", OBJECT).class("Leaf")],
		)
		.metadata("Leaf", 0, 0, &[MemberSpec::new("n", INT)])
		.object_remember(1)
		.bytes(&[0b11])
		.var_int(2)
		.var_int(2)
		.object_remember(2)
		.bytes(&[0b1])
		.var_int(9)
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	let a = root.get("a").and_then(Value::as_struct_ref).expect("a reference");
	let b = root.get("b").and_then(Value::as_struct_ref).expect("b reference");
	assert!(Rc::ptr_eq(a, b));
	assert_eq!(a.borrow().class_names, ["Leaf"]);
	assert_eq!(a.borrow().get("n").and_then(Value::as_i64), Some(9));
}

#[test]
fn self_reference_resolves_to_root() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Node", 0, 0, &[MemberSpec::new("next", OBJECT).class("Node")])
		.object_remember(1)
		.bytes(&[0b1])
		.var_int(1)
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let next = root.borrow().get("next").and_then(Value::as_struct_ref).cloned().expect("next reference");
	assert!(Rc::ptr_eq(&root, &next));
}

#[test]
fn null_object_reference() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Node", 0, 0, &[MemberSpec::new("next", OBJECT).class("Node")])
		.object_remember(1)
		.bytes(&[0b1])
		.var_int(0)
		.file_end();
	let root = parse(&w.finish()).expect("root object");
	assert!(matches!(root.borrow().get("next"), Some(Value::Ref(None))));
}

#[test]
fn strings_are_interned() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata(
			"Named",
			0,
			0,
			&[
				MemberSpec::new("s1", CSTRING),
				MemberSpec::new("s2", CSTRING),
				MemberSpec::new("s3", CSTRING),
			],
		)
		.object_remember(1)
		.bytes(&[0b111])
		.string("hello")
		.string_ref(6)
		.string_ref(1)
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	assert_eq!(root.get("s1").and_then(Value::as_str), Some("hello"));
	assert_eq!(root.get("s2").and_then(Value::as_str), Some("hello"));
	assert_eq!(root.get("s3").and_then(Value::as_str), Some(""));
}

#[test]
fn string_reference_past_pool_fails() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Named", 0, 0, &[MemberSpec::new("s", CSTRING)])
		.object_remember(1)
		.bytes(&[0b1])
		.string_ref(99)
		.file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::StringIndexOutOfRange { index: 99, .. }));
}

#[test]
fn inherited_members_share_one_bitmap() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Base", 0, 0, &[MemberSpec::new("id", INT)])
		.metadata("Derived", 0, 1, &[MemberSpec::new("label", CSTRING), MemberSpec::new("unused", INT)])
		.object_remember(2)
		.bytes(&[0b011])
		.var_int(3)
		.string("d")
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	assert_eq!(root.class_names, ["Base", "Derived"]);
	assert_eq!(root.get("id").and_then(Value::as_i64), Some(3));
	assert_eq!(root.get("label").and_then(Value::as_str), Some("d"));
	assert!(root.get("unused").is_none());
}

#[test]
fn embedded_struct_uses_declared_class() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Pair", 0, 0, &[MemberSpec::new("a", INT), MemberSpec::new("b", INT)])
		.metadata("Outer", 0, 0, &[MemberSpec::new("pair", STRUCT).class("Pair")])
		.object_remember(2)
		.bytes(&[0b1])
		.bytes(&[0b01])
		.var_int(-4)
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	let Some(Value::Struct(pair)) = root.get("pair") else {
		panic!("pair should be embedded");
	};
	assert_eq!(pair.class_names, ["Pair"]);
	assert_eq!(pair.get("a").and_then(Value::as_i64), Some(-4));
}

#[test]
fn byte_collections_use_raw_buffers() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata(
			"Blob",
			0,
			0,
			&[
				MemberSpec::new("fixed", TUPLE_FLAG | BYTE).tuple(3),
				MemberSpec::new("data", ARRAY_FLAG | BYTE),
				MemberSpec::new("flag", BYTE),
			],
		)
		.object_remember(1)
		.bytes(&[0b111])
		.bytes(&[1, 2, 3])
		.var_int(2)
		.bytes(&[0xaa, 0xbb])
		.bytes(&[0xff])
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	assert!(matches!(root.get("fixed"), Some(Value::Bytes(raw)) if raw == &[1, 2, 3]));
	assert!(matches!(root.get("data"), Some(Value::Bytes(raw)) if raw == &[0xaa, 0xbb]));
	assert_eq!(root.get("flag").and_then(Value::as_i64), Some(255));
}

#[test]
fn int_array_consumes_width_prefix() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Ints", 0, 0, &[MemberSpec::new("values", ARRAY_FLAG | INT), MemberSpec::new("pair", TUPLE_FLAG | INT).tuple(2)])
		.object_remember(1)
		.bytes(&[0b11])
		.var_int(3)
		.var_int(4)
		.var_int(-1)
		.var_int(1000)
		.var_int(5)
		.var_int(2)
		.var_int(10)
		.var_int(20)
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	assert_eq!(ints(root.get("values")), [-1, 1000, 5]);
	assert_eq!(ints(root.get("pair")), [10, 20]);
}

#[test]
fn vec4_array_prefix_selects_lane_count() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Points", 0, 0, &[MemberSpec::new("points", ARRAY_FLAG | VEC4), MemberSpec::new("full", VEC4)])
		.object_remember(1)
		.bytes(&[0b11])
		.var_int(2)
		.var_int(3);
	for lane in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
		w.f32(lane);
	}
	for lane in [7.0, 8.0, 9.0, 10.0] {
		w.f32(lane);
	}
	w.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	let Some(Value::Array(points)) = root.get("points") else {
		panic!("points should be an array");
	};
	let lanes: Vec<_> = points
		.iter()
		.map(|point| match point {
			Value::Vector4(v) => v.lanes(),
			_ => [f32::NAN; 4],
		})
		.collect();
	assert_eq!(lanes, [[1.0, 2.0, 3.0, 0.0], [4.0, 5.0, 6.0, 0.0]]);
	assert!(matches!(root.get("full"), Some(Value::Vector4(v)) if v.lanes() == [7.0, 8.0, 9.0, 10.0]));
}

#[test]
fn vec4_prefix_out_of_range_fails() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Points", 0, 0, &[MemberSpec::new("points", ARRAY_FLAG | VEC4)])
		.object_remember(1)
		.bytes(&[0b1])
		.var_int(1)
		.var_int(5)
		.file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::UnsupportedVec4Width { width: 5 }));
}

#[test]
fn array_and_tuple_flags_are_exclusive() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Odd", 0, 0, &[MemberSpec::new("both", ARRAY_FLAG | TUPLE_FLAG | INT).tuple(2)])
		.object_remember(1)
		.bytes(&[0b1])
		.file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::ArrayAndTuple { .. }));
}

#[test]
fn unknown_type_flags_are_rejected() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Odd", 0, 0, &[MemberSpec::new("weird", 0x40 | INT)])
		.object_remember(1)
		.bytes(&[0b1])
		.file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::UnsupportedMemberFlags { ty: 0x42, .. }));
}

#[test]
fn unsupported_basic_type_is_rejected() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Odd", 0, 0, &[MemberSpec::new("wide", 5)])
		.object_remember(1)
		.bytes(&[0b1])
		.file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::UnsupportedTagFieldType { ty: 5 }));
}

#[test]
fn oversized_bitmap_is_rejected() {
	let names: Vec<String> = (0..129).map(|idx| format!("m{idx}")).collect();
	let members: Vec<_> = names.iter().map(|name| MemberSpec::new(name, INT)).collect();
	let mut w = TagfileWriter::new();
	w.file_info(3, None).metadata("Huge", 0, 0, &members).object_remember(1).file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::TooManyMembers { count: 129, max: 128, .. }));
}

#[test]
fn object_of_void_type_is_rejected() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None).object_remember(0).file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::VoidObjectClass));
}

#[test]
fn cyclic_type_chain_is_rejected() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("A", 0, 2, &[])
		.metadata("B", 0, 1, &[])
		.object_remember(1)
		.file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::TypeChainCycle { .. }));
}

#[test]
fn type_index_out_of_range_is_rejected() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None).object_remember(7).file_end();
	assert!(matches!(parse_err(&w.finish()), HkxError::TypeIndexOutOfRange { index: 7, len: 1 }));
}

#[test]
fn struct_array_with_no_present_columns_keeps_its_length() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Item", 0, 0, &[MemberSpec::new("a", INT)])
		.metadata("Holder", 0, 0, &[MemberSpec::new("items", ARRAY_FLAG | STRUCT).class("Item")])
		.object_remember(2)
		.bytes(&[0b1])
		.var_int(20)
		.bytes(&[0b0])
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	let Some(Value::Array(elements)) = root.get("items") else {
		panic!("items should be an array");
	};
	assert_eq!(elements.len(), 20);
	for element in elements {
		let Value::Struct(element) = element else {
			panic!("struct element");
		};
		assert_eq!(element.class_names, ["Item"]);
		assert!(element.fields.is_empty());
	}
}

#[test]
fn struct_array_longer_than_its_columns_is_rejected() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Item", 0, 0, &[MemberSpec::new("a", INT)])
		.metadata("Holder", 0, 0, &[MemberSpec::new("items", ARRAY_FLAG | STRUCT).class("Item")])
		.object_remember(2)
		.bytes(&[0b1])
		.var_int(1000)
		.bytes(&[0b1])
		.var_int(1)
		.file_end();

	let err = parse_err(&w.finish());
	assert!(matches!(err, HkxError::StructArrayTooLarge { len: 1000, .. }));
}

#[test]
fn derived_member_shadows_base_member() {
	let mut w = TagfileWriter::new();
	w.file_info(3, None)
		.metadata("Base", 0, 0, &[MemberSpec::new("v", INT)])
		.metadata("Derived", 0, 1, &[MemberSpec::new("v", INT)])
		.object_remember(2)
		.bytes(&[0b11])
		.var_int(1)
		.var_int(2)
		.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	assert_eq!(root.class_names, ["Base", "Derived"]);
	assert_eq!(root.fields.len(), 1);
	assert_eq!(root.get("v").and_then(Value::as_i64), Some(2));
}

#[test]
fn byte_and_matrix_scalars_decode() {
	const VEC12: i64 = 6;
	const VEC16: i64 = 7;

	let mut w = TagfileWriter::new();
	w.file_info(3, None).metadata(
		"Shapes",
		0,
		0,
		&[MemberSpec::new("b", BYTE), MemberSpec::new("m3", VEC12), MemberSpec::new("m4", VEC16)],
	);
	w.object_remember(1).bytes(&[0b111]).bytes(&[0xfe]);
	for lane in 1..=28 {
		w.f32(lane as f32);
	}
	w.file_end();

	let root = parse(&w.finish()).expect("root object");
	let root = root.borrow();
	assert_eq!(root.get("b").and_then(Value::as_i64), Some(254));

	let Some(Value::Matrix3(m3)) = root.get("m3") else {
		panic!("m3 should be a matrix");
	};
	assert_eq!(m3.rows[0].lanes(), [1.0, 2.0, 3.0, 4.0]);
	assert_eq!(m3.rows[2].lanes(), [9.0, 10.0, 11.0, 12.0]);

	let Some(Value::Matrix4(m4)) = root.get("m4") else {
		panic!("m4 should be a matrix");
	};
	assert_eq!(m4.rows[0].lanes(), [13.0, 14.0, 15.0, 16.0]);
	assert_eq!(m4.rows[3].lanes(), [25.0, 26.0, 27.0, 28.0]);
}
