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

//! Destinations for finished images.

use crate::resolver::ResolvedImage;
use std::fs;
use std::path::{Path, PathBuf};
use strata_core::{BuildError, Result};

/// Default extension of the data file.
pub const DATA_EXTENSION: &str = ".gdf";
/// Default extension of the relocation file.
pub const RELOC_EXTENSION: &str = ".gdr";

/// Something a finished image can be flushed to.
pub trait ImageSink {
    /// Stores the data blob and its relocation table.
    fn write_image(&mut self, image: &ResolvedImage) -> Result<()>;
}

/// Keeps the encoded outputs in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    /// The data blob.
    pub data: Vec<u8>,
    /// The encoded relocation table.
    pub relocations: Vec<u8>,
}

impl ImageSink for MemorySink {
    fn write_image(&mut self, image: &ResolvedImage) -> Result<()> {
        self.data = image.data().to_vec();
        self.relocations = image.relocation_bytes();
        Ok(())
    }
}

/// Writes `<name><data_ext>` and `<name><reloc_ext>` into a directory.
///
/// Both files are first written next to their destination under a temporary
/// name and only renamed once both are complete. The two renames are not one
/// atomic step: if the second fails, the data file is already replaced and
/// the remaining temporaries are removed.
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
    name: String,
    data_extension: String,
    reloc_extension: String,
}

impl FileSink {
    /// Creates a sink with the default `.gdf`/`.gdr` extensions.
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            data_extension: DATA_EXTENSION.to_owned(),
            reloc_extension: RELOC_EXTENSION.to_owned(),
        }
    }

    /// Overrides the file extensions, leading dot included.
    pub fn with_extensions(mut self, data: &str, reloc: &str) -> Self {
        self.data_extension = data.to_owned();
        self.reloc_extension = reloc.to_owned();
        self
    }

    /// Final path of the data file.
    pub fn data_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}{}", self.name, self.data_extension))
    }

    /// Final path of the relocation file.
    pub fn reloc_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}{}", self.name, self.reloc_extension))
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn sink_error(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
    move |source| BuildError::SinkFailure {
        path: path.to_path_buf(),
        source,
    }
}

impl ImageSink for FileSink {
    fn write_image(&mut self, image: &ResolvedImage) -> Result<()> {
        fs::create_dir_all(&self.directory).map_err(sink_error(&self.directory))?;

        let outputs = [
            (self.data_path(), image.data().to_vec()),
            (self.reloc_path(), image.relocation_bytes()),
        ];
        let mut staged = Vec::with_capacity(outputs.len());
        for (path, bytes) in &outputs {
            let temporary = temporary_path(path);
            if let Err(err) = fs::write(&temporary, bytes) {
                let _ = fs::remove_file(&temporary);
                for (staged_tmp, _) in &staged {
                    let _ = fs::remove_file(staged_tmp);
                }
                return Err(sink_error(path)(err));
            }
            staged.push((temporary, path.clone()));
        }
        for (renamed, (temporary, path)) in staged.iter().enumerate() {
            if let Err(err) = fs::rename(temporary, path) {
                for (pending, _) in &staged[renamed..] {
                    let _ = fs::remove_file(pending);
                }
                return Err(sink_error(path)(err));
            }
        }

        log::info!(
            "Wrote '{}' ({} bytes) and '{}' ({} relocations)",
            self.data_path().display(),
            image.data().len(),
            self.reloc_path().display(),
            image.relocations().len()
        );
        Ok(())
    }
}
