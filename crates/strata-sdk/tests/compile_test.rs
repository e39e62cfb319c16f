// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use std::fs;
use strata_core::BuildError;
use strata_sdk::prelude::*;
use tempfile::tempdir;

const SHARED_ITEM: &str = r#"
Document(
  root: Class("Root", [
    ("first", Ref("item")),
    ("second", Ref("item")),
    ("label", Str("hi")),
  ]),
  objects: {
    "item": Class("Item", [("a", Bool(true)), ("b", Bool(false)), ("x", I32(5)), ("s", Str("hi"))]),
  },
)
"#;

#[test]
fn test_shared_object_compiles_to_one_block() {
    // --- 1. ARRANGE ---
    let document = Document::from_ron(SHARED_ITEM).unwrap();

    // --- 2. ACT ---
    let image = compile(&document, &CompileOptions::default()).unwrap();

    // --- 3. ASSERT ---
    let reader = ImageReader::new(Platform::PC, image.data());
    let entry = image.entry_offset();
    let root = reader.read_pointer(entry + 8).unwrap() as usize;

    // Root layout: label (string), then the two class pointers.
    assert_eq!(reader.read_string(root).unwrap(), "hi");
    let first = reader.read_pointer(root + 16).unwrap();
    let second = reader.read_pointer(root + 24).unwrap();
    assert_eq!(first, second);

    // Item layout: s, x, then the packed booleans.
    let item = first as usize;
    assert_eq!(reader.read_string(item).unwrap(), "hi");
    assert_eq!(reader.read_i32(item + 16).unwrap(), 5);
    assert!(reader.read_bitset(item + 20, 0).unwrap());
    assert!(!reader.read_bitset(item + 20, 1).unwrap());

    let strings = reader.string_table(image.string_table_size()).unwrap();
    assert_eq!(strings, vec!["hi"]);
    let hi = image.offset_of(strata_core::StreamReference::string(0)).unwrap();
    let string_fields = image
        .relocations()
        .iter()
        .filter(|&&at| at != entry)
        .filter(|&&at| reader.read_pointer(at).unwrap() as usize == hi)
        .count();
    assert_eq!(string_fields, 2);
    assert_eq!(image.stats().folded, 1);
}

#[test]
fn test_cyclic_objects_are_rejected() {
    let document = Document::from_ron(
        r#"(
          root: Class("Root", [("start", Ref("a"))]),
          objects: {
            "a": Class("Node", [("next", Ref("b"))]),
            "b": Class("Node", [("next", Ref("a"))]),
          },
        )"#,
    )
    .unwrap();

    let err = compile(&document, &CompileOptions::default()).unwrap_err();
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::CyclicMemberGraph { path }) => {
            assert_eq!(path, &["a", "b", "a"]);
        }
        other => panic!("expected a cycle error, got {other:?} ({err:#})"),
    }
}

#[test]
fn test_shared_objects_without_cycles_are_accepted() {
    let document = Document::from_ron(
        r#"(
          root: Class("Root", [("left", Ref("leaf")), ("right", Ref("pair"))]),
          objects: {
            "leaf": Class("Leaf", [("v", U8(1))]),
            "pair": Class("Pair", [("l", Ref("leaf")), ("r", Ref("leaf"))]),
          },
        )"#,
    )
    .unwrap();
    let image = compile(&document, &CompileOptions::default()).unwrap();
    // Three leaf instances fold into one.
    assert_eq!(image.stats().folded, 2);
}

#[test]
fn test_document_errors_are_reported() {
    let cases = [
        (r#"(root: Class("Root", [("x", Ref("ghost"))]))"#, "unknown object 'ghost'"),
        (
            r#"(root: Class("Root", [("xs", Array([I32(1), Str("two")]))]))"#,
            "array elements mix",
        ),
        (
            r#"(root: Class("Root", [("d", Dict([(U8(1), Bool(true)), (U8(2), F32(1.0))]))]))"#,
            "dictionary values mix",
        ),
        (r#"(root: I32(3))"#, "root must be a class"),
        (
            r#"(root: Ref("a"), objects: { "a": Ref("b"), "b": Ref("a") })"#,
            "reference chain loops",
        ),
    ];
    for (text, expected) in cases {
        let document = Document::from_ron(text).unwrap();
        let err = compile(&document, &CompileOptions::default()).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains(expected), "'{message}' lacks '{expected}'");
    }
}

#[test]
fn test_legacy_platform_dictionary_layout() {
    let document = Document::from_ron(
        r#"(root: Class("Stats", [("caps", Dict([(Str("hp"), I32(10)), (Str("mp"), I32(4))]))]))"#,
    )
    .unwrap();
    let options = CompileOptions {
        platform: Platform::LEGACY32,
        ..CompileOptions::default()
    };

    let image = compile(&document, &options).unwrap();
    let reader = ImageReader::new(Platform::LEGACY32, image.data());
    let root = reader.read_pointer(image.entry_offset() + 4).unwrap() as usize;

    let (pairs, count) = reader.read_array_header(root).unwrap();
    assert_eq!(count, 2);
    let pairs = pairs as usize;
    assert_eq!(reader.read_string(pairs).unwrap(), "hp");
    assert_eq!(reader.read_string(pairs + 8).unwrap(), "mp");
    assert_eq!(reader.read_i32(pairs + 16).unwrap(), 10);
    assert_eq!(reader.read_i32(pairs + 20).unwrap(), 4);
}

#[test]
fn test_empty_array_compiles_to_null() {
    let document =
        Document::from_ron(r#"(root: Class("Root", [("none", Array([])), ("n", U32(9))]))"#).unwrap();
    let image = compile(&document, &CompileOptions::default()).unwrap();
    let reader = ImageReader::new(Platform::PC, image.data());
    let root = reader.read_pointer(image.entry_offset() + 8).unwrap() as usize;

    assert_eq!(reader.read_array_header(root).unwrap(), (0, 0));
    assert!(!image.relocations().contains(&root));
    assert_eq!(reader.read_u32(root + 16).unwrap(), 9);
}

#[test]
fn test_load_names_the_broken_file() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.ron");
    let bad = dir.path().join("bad.ron");
    fs::write(&good, SHARED_ITEM).unwrap();
    fs::write(&bad, "Document(root: ").unwrap();

    assert!(Document::load(&good).is_ok());
    let message = format!("{:#}", Document::load(&bad).unwrap_err());
    assert!(message.contains("bad.ron"), "{message}");
}
