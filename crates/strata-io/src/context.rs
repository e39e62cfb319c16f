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

//! The state of one build, threaded through every pipeline stage.

use crate::resolver::{ResolvedImage, Resolver};
use crate::serializer::MemberSerializer;
use crate::writer::BlockSet;
use strata_core::{Platform, ReferenceAllocator, Result};
use strata_data::{prepare_layout, MemberFactory, MemberModel, StringTable};

/// Owns the member model, string table and reference allocator of one build.
#[derive(Debug)]
pub struct BuildContext {
    platform: Platform,
    model: MemberModel,
    strings: StringTable,
    references: ReferenceAllocator,
}

impl BuildContext {
    /// Starts an empty build for `platform`.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            model: MemberModel::new(),
            strings: StringTable::new(),
            references: ReferenceAllocator::new(),
        }
    }

    /// Target encoding.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Access for an object-graph walker.
    pub fn factory(&mut self) -> MemberFactory<'_> {
        MemberFactory::new(&mut self.model, &mut self.strings)
    }

    /// The member model.
    pub fn model(&self) -> &MemberModel {
        &self.model
    }

    /// The interned strings.
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Packs and orders every class. Returns the number of classes laid out.
    pub fn prepare(&mut self) -> Result<usize> {
        prepare_layout(&mut self.model, self.platform.pointer_width)
    }

    /// Writes the laid-out model into blocks.
    pub fn serialize(&mut self) -> Result<BlockSet> {
        MemberSerializer::new(
            self.platform,
            &self.model,
            &self.strings,
            &mut self.references,
        )
        .serialize()
    }

    /// Runs layout, serialization and resolution.
    pub fn build(&mut self, resolver: &Resolver) -> Result<ResolvedImage> {
        self.prepare()?;
        let blocks = self.serialize()?;
        resolver.finalize(&self.strings, &blocks)
    }
}
