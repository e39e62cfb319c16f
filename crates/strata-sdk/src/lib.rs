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


//! The public-facing API of Strata.
//!
//! Parse a [`Document`], then [`compile`] it into a [`ResolvedImage`] and hand
//! that to an [`ImageSink`](strata_io::ImageSink).

#![warn(missing_docs)]

use anyhow::{Context, Result};
use strata_core::Platform;
use strata_io::{BuildContext, ResolvedImage, Resolver};

pub mod document;
pub mod walker;

pub use document::{Document, Value};
pub use walker::DocumentWalker;

/// Common types for building and writing images.
pub mod prelude {
    pub use crate::document::{Document, Value};
    pub use crate::{compile, CompileOptions};
    pub use strata_core::{BuildError, Endian, Platform, PointerWidth};
    pub use strata_io::{
        FileSink, ImageReader, ImageSink, MemorySink, RelocationTable, ResolveStats,
        ResolvedImage,
    };
}

/// Knobs of one compile run.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Target encoding.
    pub platform: Platform,
    /// Compare bytes before folding blocks whose hashes match.
    pub verify_hash_matches: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            platform: Platform::PC,
            verify_hash_matches: true,
        }
    }
}

/// Walks, lays out, serializes and resolves a document.
pub fn compile(document: &Document, options: &CompileOptions) -> Result<ResolvedImage> {
    let mut ctx = BuildContext::new(options.platform);
    DocumentWalker::new(document)
        .walk(&mut ctx.factory())
        .context("Failed to walk document")?;

    let classes = ctx.prepare().context("Failed to lay out members")?;
    log::debug!(
        "Laid out {} classes over {} members",
        classes,
        ctx.model().len()
    );
    let blocks = ctx.serialize().context("Failed to serialize members")?;
    let resolver = Resolver::new().with_verification(options.verify_hash_matches);
    let image = resolver
        .finalize(ctx.strings(), &blocks)
        .context("Failed to resolve data image")?;
    Ok(image)
}
