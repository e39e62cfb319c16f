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

//! Turns a laid-out [`MemberModel`] into a [`BlockSet`].
//!
//! The root block holds two pointers: the string table and the root class.
//! Every composite gets its own block; instead of recursing, the serializer
//! queues a fill task per composite and drains the queue breadth-first, so
//! blocks are emitted in allocation order and stack depth stays constant.

use crate::writer::{BlockSet, BlockWriter};
use std::collections::VecDeque;
use strata_core::{BuildError, Platform, ReferenceAllocator, Result, StreamReference};
use strata_data::{Kind, LayoutRules, MemberModel, Payload, StringTable};

/// Alignment of the root block.
pub const ROOT_ALIGNMENT: usize = 8;

#[derive(Debug, Clone, Copy)]
struct FillTask {
    member: usize,
    kind: Kind,
    reference: StreamReference,
}

/// Writes every member of a model into blocks.
pub struct MemberSerializer<'a> {
    model: &'a MemberModel,
    strings: &'a StringTable,
    rules: LayoutRules<'a>,
    references: &'a mut ReferenceAllocator,
    writer: BlockWriter,
    queue: VecDeque<FillTask>,
}

impl<'a> MemberSerializer<'a> {
    /// Prepares a serializer. The model must already be laid out.
    pub fn new(
        platform: Platform,
        model: &'a MemberModel,
        strings: &'a StringTable,
        references: &'a mut ReferenceAllocator,
    ) -> Self {
        Self {
            model,
            strings,
            rules: LayoutRules::new(model, platform.pointer_width),
            references,
            writer: BlockWriter::new(platform),
            queue: VecDeque::new(),
        }
    }

    /// Writes the root block and every block reachable from it.
    pub fn serialize(mut self) -> Result<BlockSet> {
        let root = self.model.root()?;
        let pointer = self.writer.platform().pointer_size();

        let entry = self.references.allocate();
        self.writer.new_block(entry, ROOT_ALIGNMENT, 2 * pointer)?;
        self.writer.open_block(entry)?;
        self.writer.write_reference(StreamReference::STRING_TABLE)?;
        self.write_composite(root)?;
        self.writer.close_block()?;

        let mut filled = 0usize;
        while let Some(task) = self.queue.pop_front() {
            self.fill(task)?;
            filled += 1;
        }

        log::debug!(
            "Serialized {} members into {} blocks",
            self.model.len(),
            filled + 1
        );
        self.writer.finish()
    }

    fn write_member(&mut self, index: usize) -> Result<()> {
        let model = self.model;
        let record = model.member(index)?;
        let writer = &mut self.writer;
        match (record.kind, &record.payload) {
            (Kind::Bool, Payload::Bool(v)) => writer.write_bool(*v),
            (Kind::Bitset, Payload::Bitset(v)) => writer.write_u8(*v),
            (Kind::Int8, Payload::Int8(v)) => writer.write_i8(*v),
            (Kind::Uint8, Payload::Uint8(v)) => writer.write_u8(*v),
            (Kind::Int16, Payload::Int16(v)) => writer.write_i16(*v),
            (Kind::Uint16, Payload::Uint16(v)) => writer.write_u16(*v),
            (Kind::Int32, Payload::Int32(v)) => writer.write_i32(*v),
            (Kind::Uint32, Payload::Uint32(v)) => writer.write_u32(*v),
            (Kind::Int64, Payload::Int64(v)) => writer.write_i64(*v),
            (Kind::Uint64, Payload::Uint64(v)) => writer.write_u64(*v),
            (Kind::Float32, Payload::Float32(v)) => writer.write_f32(*v),
            (Kind::Float64, Payload::Float64(v)) => writer.write_f64(*v),
            (Kind::String, Payload::String(i)) => writer.write_reference_with_length(
                self.strings.reference_of(*i),
                self.strings.length_of(*i) as u64,
            ),
            (Kind::Enum, Payload::Enum { value, .. }) => writer.write_u32(*value),
            (Kind::Struct, Payload::Struct(value)) => writer.write_struct(value.as_ref()),
            (Kind::Class | Kind::Array | Kind::Dictionary, _) => self.write_composite(index),
            (Kind::Unknown, _) => Err(BuildError::invalid_member(index, "unknown member kind")),
            (kind, payload) => Err(BuildError::invalid_member(
                index,
                format!("{kind:?} member carries a {payload:?} payload"),
            )),
        }
    }

    /// Writes the pointer (and count) to a composite and queues its content.
    ///
    /// Composites without children are written as a null pointer.
    fn write_composite(&mut self, index: usize) -> Result<()> {
        let record = self.model.member(index)?;
        let kind = record.kind;
        let count = record.children_count;

        if count == 0 {
            return match kind {
                Kind::Class => self.writer.write_reference(StreamReference::NULL),
                _ => self
                    .writer
                    .write_reference_with_length(StreamReference::NULL, 0),
            };
        }

        let size = self.rules.data_size(index)?;
        let alignment = self.rules.data_alignment(index)?;
        let reference = self.references.allocate();
        self.writer.new_block(reference, alignment, size)?;
        match kind {
            Kind::Class => self.writer.write_reference(reference)?,
            _ => self
                .writer
                .write_reference_with_length(reference, count as u64)?,
        }

        self.queue.push_back(FillTask {
            member: index,
            kind,
            reference,
        });
        Ok(())
    }

    fn fill(&mut self, task: FillTask) -> Result<()> {
        let model = self.model;
        let record = model.member(task.member)?;
        model.children(task.member)?;

        self.writer.open_block(task.reference)?;
        match task.kind {
            Kind::Dictionary => {
                for key in record.keys() {
                    self.write_member(key)?;
                }
                let values = record.values();
                self.writer
                    .align(self.rules.member_alignment(values.start)?)?;
                for value in values {
                    self.write_member(value)?;
                }
            }
            _ => {
                for child in record.children() {
                    self.write_member(child)?;
                }
            }
        }
        self.writer.close_block()
    }
}
