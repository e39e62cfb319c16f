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


use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strata_core::{Endian, Platform, PointerWidth};
use strata_io::sink::{DATA_EXTENSION, RELOC_EXTENSION};

use anyhow::{Context, Result};

/// Represents the structure of the `Build.toml` file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BuildConfig {
    /// Output file name without extension.
    pub name: String,
    /// Byte order of the target.
    pub little_endian: bool,
    /// Pointer width of the target in bits, 32 or 64.
    pub pointer_width: u32,
    /// Extension of the data file, leading dot included.
    pub data_extension: String,
    /// Extension of the relocation file, leading dot included.
    pub reloc_extension: String,
    /// Where compiled images are written.
    pub output_dir: PathBuf,
    /// Compare bytes before folding blocks with equal hashes.
    pub verify_hash_matches: bool,
    /// Directories scanned for `.ron` documents when no input is given.
    pub source_directories: Vec<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            name: "Game".to_owned(),
            little_endian: true,
            pointer_width: 64,
            data_extension: DATA_EXTENSION.to_owned(),
            reloc_extension: RELOC_EXTENSION.to_owned(),
            output_dir: PathBuf::from(".dist/data"),
            verify_hash_matches: true,
            source_directories: vec![PathBuf::from("resources/data")],
        }
    }
}

impl BuildConfig {
    /// Loads `path`, falling back to the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No '{}' found. Using default configuration.", path.display());
            return Ok(Self::default());
        }
        log::info!("Found '{}'. Loading configuration.", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{}'", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse TOML from '{}'", path.display()))
    }

    /// The target encoding these settings describe.
    pub fn platform(&self) -> Result<Platform> {
        let width = PointerWidth::from_bits(self.pointer_width).with_context(|| {
            format!(
                "Unsupported pointer width {}, expected 32 or 64",
                self.pointer_width
            )
        })?;
        let endian = if self.little_endian {
            Endian::Little
        } else {
            Endian::Big
        };
        Ok(Platform::new(endian, width))
    }
}
