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


use crate::config::BuildConfig;
use crate::helpers::*;
use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use strata_io::{FileSink, ImageSink, ResolvedImage};
use strata_sdk::{compile, CompileOptions, Document};
use walkdir::WalkDir;

/// Arguments of `strata compile`.
#[derive(Args, Debug, Clone, Default)]
pub struct CompileArgs {
    /// Documents or directories to compile (defaults to the configured source directories)
    pub inputs: Vec<PathBuf>,

    /// Build configuration file
    #[arg(short, long, default_value = "Build.toml")]
    pub config: PathBuf,

    /// Output directory, overriding the configuration
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Target a big-endian platform
    #[arg(long)]
    pub big_endian: bool,

    /// Target pointer width in bits
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(["32", "64"]))]
    pub pointer_width: Option<String>,

    /// Fold blocks on hash equality alone
    #[arg(long)]
    pub no_verify: bool,

    /// Write a JSON build report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl CompileArgs {
    /// Command-line flags take precedence over the configuration file.
    fn apply(&self, config: &mut BuildConfig) -> Result<()> {
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if self.big_endian {
            config.little_endian = false;
        }
        if let Some(width) = &self.pointer_width {
            config.pointer_width = width
                .parse()
                .with_context(|| format!("Invalid pointer width '{width}'"))?;
        }
        if self.no_verify {
            config.verify_hash_matches = false;
        }
        Ok(())
    }
}

#[derive(Serialize, Debug)]
struct BuildReport {
    platform: String,
    verify_hash_matches: bool,
    files: Vec<FileReport>,
}

#[derive(Serialize, Debug)]
struct FileReport {
    source: PathBuf,
    data: PathBuf,
    relocations: PathBuf,
    data_bytes: usize,
    string_table_bytes: usize,
    relocation_count: usize,
    blocks_in: usize,
    blocks_out: usize,
    passes: usize,
    folding_passes: usize,
    folded: usize,
}

impl FileReport {
    fn new(source: &Path, sink: &FileSink, image: &ResolvedImage) -> Self {
        let stats = image.stats();
        Self {
            source: source.to_path_buf(),
            data: sink.data_path(),
            relocations: sink.reloc_path(),
            data_bytes: image.data().len(),
            string_table_bytes: image.string_table_size(),
            relocation_count: image.relocations().len(),
            blocks_in: stats.blocks_in,
            blocks_out: stats.blocks_out,
            passes: stats.passes,
            folding_passes: stats.folding_passes,
            folded: stats.folded,
        }
    }
}

pub fn run(args: &CompileArgs) -> Result<()> {
    print_task_start("Compiling Data", HAMMER, BLUE);

    let mut config = BuildConfig::load(&args.config)?;
    args.apply(&mut config)?;
    let platform = config.platform()?;

    let inputs = if args.inputs.is_empty() {
        config.source_directories.clone()
    } else {
        args.inputs.clone()
    };
    let documents = find_documents(&inputs)?;
    if documents.is_empty() {
        print_error("No .ron documents found. Nothing to compile.");
        return Ok(());
    }
    println!(
        "{}🔎 Found:{} {} document(s), targeting {}.",
        BOLD,
        RESET,
        documents.len(),
        platform
    );

    let names = output_names(&config, &documents)?;
    let options = CompileOptions {
        platform,
        verify_hash_matches: config.verify_hash_matches,
    };
    let mut report = BuildReport {
        platform: platform.to_string(),
        verify_hash_matches: config.verify_hash_matches,
        files: Vec::with_capacity(documents.len()),
    };

    for (path, name) in documents.iter().zip(names) {
        let document = Document::load(path)?;
        let image = compile(&document, &options)
            .with_context(|| format!("Failed to compile '{}'", path.display()))?;

        let mut sink = FileSink::new(&config.output_dir, name)
            .with_extensions(&config.data_extension, &config.reloc_extension);
        sink.write_image(&image)?;

        let entry = FileReport::new(path, &sink, &image);
        print_success(&format!(
            "{} -> {} ({} bytes, {} -> {} blocks)",
            path.display(),
            entry.data.display(),
            entry.data_bytes,
            entry.blocks_in,
            entry.blocks_out
        ));
        report.files.push(entry);
    }

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(report_path, json).with_context(|| {
            format!("Failed to write build report '{}'", report_path.display())
        })?;
        log::info!("Build report written to '{}'", report_path.display());
    }

    print_success("Data build finished successfully.");
    Ok(())
}

/// Expands directories into the `.ron` files they contain, sorted by path.
fn find_documents(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_file() {
            documents.push(input.clone());
        } else if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry
                    .with_context(|| format!("Failed to scan '{}'", input.display()))?;
                let is_document = entry.path().extension().is_some_and(|ext| ext == "ron");
                if entry.file_type().is_file() && is_document {
                    documents.push(entry.into_path());
                }
            }
        } else {
            log::warn!("Skipping missing input '{}'", input.display());
        }
    }
    Ok(documents)
}

/// A single document is written under the configured name, several under
/// their file stems.
fn output_names(config: &BuildConfig, documents: &[PathBuf]) -> Result<Vec<String>> {
    if documents.len() == 1 {
        return Ok(vec![config.name.clone()]);
    }
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(documents.len());
    for path in documents {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .with_context(|| format!("'{}' has no file name", path.display()))?;
        if !seen.insert(stem.clone()) {
            bail!("Two documents would both be written as '{stem}'");
        }
        names.push(stem);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_io::RelocationTable;
    use strata_core::Platform;

    const DOCUMENT: &str = r#"(root: Class("Root", [("hp", I32(10)), ("name", Str("hero"))]))"#;

    #[test]
    fn test_flags_override_config() {
        let mut config = BuildConfig::default();
        let args = CompileArgs {
            out: Some(PathBuf::from("out")),
            big_endian: true,
            pointer_width: Some("32".into()),
            no_verify: true,
            ..CompileArgs::default()
        };
        args.apply(&mut config).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(!config.verify_hash_matches);
        assert_eq!(config.platform().unwrap(), Platform::LEGACY32);
    }

    #[test]
    fn test_find_documents_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("levels");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("b.ron"), DOCUMENT).unwrap();
        fs::write(nested.join("a.ron"), DOCUMENT).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let found = find_documents(&[dir.path().to_path_buf(), dir.path().join("missing")]).unwrap();
        assert_eq!(found, vec![dir.path().join("b.ron"), nested.join("a.ron")]);
    }

    #[test]
    fn test_duplicate_stems_are_rejected() {
        let config = BuildConfig::default();
        let documents = vec![PathBuf::from("a/level.ron"), PathBuf::from("b/level.ron")];
        assert!(output_names(&config, &documents).is_err());
        assert_eq!(
            output_names(&config, &documents[..1]).unwrap(),
            vec!["Game".to_string()]
        );
    }

    #[test]
    fn test_run_writes_outputs_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("hero.ron");
        fs::write(&source, DOCUMENT).unwrap();
        let out = dir.path().join("dist");
        let report = dir.path().join("report.json");

        let args = CompileArgs {
            inputs: vec![source],
            config: dir.path().join("Build.toml"),
            out: Some(out.clone()),
            report: Some(report.clone()),
            ..CompileArgs::default()
        };
        run(&args).unwrap();

        let relocations = fs::read(out.join("Game.gdr")).unwrap();
        let table = RelocationTable::parse(Platform::PC, &relocations).unwrap();
        assert!(!table.offsets.is_empty());
        assert!(out.join("Game.gdf").exists());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(json["files"].as_array().unwrap().len(), 1);
        assert_eq!(json["files"][0]["relocation_count"], table.offsets.len());
    }
}
