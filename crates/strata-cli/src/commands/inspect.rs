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


use crate::helpers::*;
use anyhow::{bail, Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use strata_core::{Endian, Platform, PointerWidth};
use strata_io::{ImageReader, RelocationTable};

/// Arguments of `strata inspect`.
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Compiled data file
    pub data: PathBuf,

    /// Matching relocation file
    pub reloc: PathBuf,

    /// The files were compiled for a big-endian platform
    #[arg(long)]
    pub big_endian: bool,

    /// Pointer width the files were compiled with, in bits
    #[arg(long, default_value_t = 64)]
    pub pointer_width: u32,
}

/// What `inspect` found in a pair of files.
#[derive(Debug)]
pub struct Summary<'a> {
    pub data_bytes: usize,
    pub entry_offset: u64,
    pub relocations: usize,
    pub strings: Vec<&'a str>,
}

/// Decodes the relocation table, checks every patched pointer and lists the strings.
pub fn summarize<'a>(platform: Platform, data: &'a [u8], relocations: &[u8]) -> Result<Summary<'a>> {
    let table =
        RelocationTable::parse(platform, relocations).context("Failed to decode relocation table")?;
    let reader = ImageReader::new(platform, data);

    for &offset in &table.offsets {
        let target = reader
            .read_pointer(offset as usize)
            .with_context(|| format!("Relocation at {offset:#x} is outside the data file"))?;
        if target as usize >= data.len() {
            bail!("Pointer at {offset:#x} targets {target:#x}, past the end of the data file");
        }
    }

    // The string table fills everything in front of the root block.
    let strings = reader
        .string_table(table.entry_offset as usize)
        .context("Failed to read the string table")?;
    Ok(Summary {
        data_bytes: data.len(),
        entry_offset: table.entry_offset,
        relocations: table.offsets.len(),
        strings,
    })
}

pub fn run(args: &InspectArgs) -> Result<()> {
    print_task_start("Inspecting Image", MAGNIFIER, CYAN);

    let width = PointerWidth::from_bits(args.pointer_width)
        .with_context(|| format!("Unsupported pointer width {}", args.pointer_width))?;
    let endian = if args.big_endian {
        Endian::Big
    } else {
        Endian::Little
    };
    let platform = Platform::new(endian, width);

    let data = fs::read(&args.data)
        .with_context(|| format!("Failed to read data file '{}'", args.data.display()))?;
    let relocations = fs::read(&args.reloc)
        .with_context(|| format!("Failed to read relocation file '{}'", args.reloc.display()))?;
    let summary = summarize(platform, &data, &relocations)?;

    print_field("Platform", platform);
    print_field("Data size", format!("{} bytes", summary.data_bytes));
    print_field("Entry offset", format!("{:#x}", summary.entry_offset));
    print_field("Relocations", summary.relocations);
    print_field("Strings", summary.strings.len());
    for (index, text) in summary.strings.iter().enumerate() {
        println!("    [{index}] {text:?}");
    }

    print_success("All relocations point inside the data file.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_sdk::{compile, CompileOptions, Document};

    #[test]
    fn test_summary_of_a_compiled_document() {
        let document = Document::from_ron(
            r#"(root: Class("Root", [("a", Str("alpha")), ("b", Str("beta")), ("c", Str("alpha"))]))"#,
        )
        .unwrap();
        let options = CompileOptions {
            platform: Platform::LEGACY32,
            ..CompileOptions::default()
        };
        let image = compile(&document, &options).unwrap();

        let summary =
            summarize(Platform::LEGACY32, image.data(), &image.relocation_bytes()).unwrap();
        assert_eq!(summary.entry_offset, image.entry_offset() as u64);
        assert_eq!(summary.relocations, image.relocations().len());
        assert_eq!(summary.strings, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_truncated_data_is_rejected() {
        let document = Document::from_ron(r#"(root: Class("Root", [("a", Str("x"))]))"#).unwrap();
        let image = compile(&document, &CompileOptions::default()).unwrap();
        let data = &image.data()[..image.entry_offset() + 8];
        assert!(summarize(Platform::PC, data, &image.relocation_bytes()).is_err());
    }
}
