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
use strata_core::{BuildError, Platform, Result};
use strata_io::{BuildContext, FileSink, ImageSink, MemorySink, RelocationTable, Resolver};
use tempfile::tempdir;

fn small_image(platform: Platform) -> Result<strata_io::ResolvedImage> {
    let mut ctx = BuildContext::new(platform);
    {
        let mut factory = ctx.factory();
        let root = factory.new_class_member("Root", "root");
        let start = factory.next_index();
        factory.new_string_member("level_01", "level");
        factory.new_uint32_member(3, "lives");
        factory.close_composite(root, start, 2)?;
    }
    ctx.build(&Resolver::new())
}

#[test]
fn test_file_sink_writes_both_outputs() -> Result<()> {
    // --- 1. ARRANGE ---
    let dir = tempdir().unwrap();
    let out = dir.path().join("nested").join("data");
    let image = small_image(Platform::PC)?;
    let mut sink = FileSink::new(&out, "Game");

    // --- 2. ACT ---
    sink.write_image(&image)?;

    // --- 3. ASSERT ---
    assert_eq!(sink.data_path(), out.join("Game.gdf"));
    assert_eq!(fs::read(sink.data_path()).unwrap(), image.data());
    let relocations = fs::read(sink.reloc_path()).unwrap();
    assert_eq!(relocations, image.relocation_bytes());

    let table = RelocationTable::parse(Platform::PC, &relocations).unwrap();
    assert_eq!(table.entry_offset, image.entry_offset() as u64);
    let expected: Vec<u64> = image.relocations().iter().map(|&at| at as u64).collect();
    assert_eq!(table.offsets, expected);

    let leftovers: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");
    Ok(())
}

#[test]
fn test_file_sink_custom_extensions_and_overwrite() -> Result<()> {
    let dir = tempdir().unwrap();
    let mut sink = FileSink::new(dir.path(), "Legacy").with_extensions(".bin", ".rel");

    sink.write_image(&small_image(Platform::PC)?)?;
    let image = small_image(Platform::LEGACY32)?;
    sink.write_image(&image)?;

    assert_eq!(sink.reloc_path(), dir.path().join("Legacy.rel"));
    assert_eq!(fs::read(sink.data_path()).unwrap(), image.data());
    let table = RelocationTable::parse(Platform::LEGACY32, &fs::read(sink.reloc_path()).unwrap())
        .unwrap();
    assert_eq!(table.offsets.len(), image.relocations().len());
    Ok(())
}

#[test]
fn test_file_sink_reports_unwritable_directory() -> Result<()> {
    let dir = tempdir().unwrap();
    let blocked = dir.path().join("blocked");
    fs::write(&blocked, b"not a directory").unwrap();

    let mut sink = FileSink::new(&blocked, "Game");
    match sink.write_image(&small_image(Platform::PC)?) {
        Err(BuildError::SinkFailure { path, .. }) => assert_eq!(path, blocked),
        other => panic!("expected a sink failure, got {other:?}"),
    }
    assert!(!dir.path().join("blocked").join("Game.gdf").exists());
    Ok(())
}

#[test]
fn test_file_sink_failed_rename_removes_temporaries() -> Result<()> {
    // --- 1. ARRANGE ---
    let dir = tempdir().unwrap();
    let mut sink = FileSink::new(dir.path(), "Game");
    let occupied = sink.reloc_path();
    fs::create_dir(&occupied).unwrap();
    fs::write(occupied.join("keep"), b"x").unwrap();

    // --- 2. ACT ---
    let result = sink.write_image(&small_image(Platform::PC)?);

    // --- 3. ASSERT ---
    match result {
        Err(BuildError::SinkFailure { path, .. }) => assert_eq!(path, occupied),
        other => panic!("expected a sink failure, got {other:?}"),
    }
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");
    assert!(occupied.join("keep").exists());
    Ok(())
}

#[test]
fn test_memory_sink_matches_image() -> Result<()> {
    let image = small_image(Platform::PC)?;
    let mut sink = MemorySink::default();
    sink.write_image(&image)?;
    assert_eq!(sink.data, image.data());
    assert_eq!(sink.relocations, image.relocation_bytes());
    Ok(())
}
