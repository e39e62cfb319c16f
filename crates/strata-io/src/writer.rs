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

//! The block writer: fixed-size output regions filled one at a time.
//!
//! Blocks are registered with their final size up front, then opened,
//! written and closed in any order, with at most one block open at a time.
//! Primitive writes align the cursor themselves; reference writes leave a
//! placeholder holding the target id and record the field for the resolver.

use crate::block::DataBlock;
use ahash::{AHashMap, AHashSet};
use strata_core::{
    align_up, is_aligned, BuildError, Platform, Result, StreamReference, StructSink, ValueStruct,
};

/// Closed output of a [`BlockWriter`], in allocation order.
#[derive(Debug, Clone)]
pub struct BlockSet {
    platform: Platform,
    blocks: Vec<DataBlock>,
}

impl BlockSet {
    /// Target encoding the blocks were written for.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Every block, in allocation order.
    pub fn blocks(&self) -> &[DataBlock] {
        &self.blocks
    }

    /// The first allocated block, which is the entry point of the image.
    pub fn entry(&self) -> Option<StreamReference> {
        self.blocks.first().map(DataBlock::reference)
    }

    /// Finds a block by reference.
    pub fn get(&self, reference: StreamReference) -> Option<&DataBlock> {
        self.blocks.iter().find(|b| b.reference == reference)
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if no block was allocated.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenBlock {
    slot: usize,
    cursor: usize,
}

/// Writes primitives, references and value structs into registered blocks.
#[derive(Debug)]
pub struct BlockWriter {
    platform: Platform,
    blocks: Vec<DataBlock>,
    lookup: AHashMap<StreamReference, usize>,
    markers: AHashSet<StreamReference>,
    open: Option<OpenBlock>,
}

impl BlockWriter {
    /// Creates a writer for the given target encoding.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            blocks: Vec::new(),
            lookup: AHashMap::new(),
            markers: AHashSet::new(),
            open: None,
        }
    }

    /// Target encoding.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Registers a zero-filled block of a pre-computed size.
    pub fn new_block(
        &mut self,
        reference: StreamReference,
        alignment: usize,
        size: usize,
    ) -> Result<()> {
        if reference.is_reserved()
            || self.lookup.contains_key(&reference)
            || self.markers.contains(&reference)
        {
            return Err(BuildError::DuplicateBlockRegistration(reference));
        }
        let block = DataBlock::new(reference, alignment, size);
        log::trace!(
            "New block {reference} (align {}, size {})",
            block.alignment(),
            block.size()
        );
        self.lookup.insert(reference, self.blocks.len());
        self.blocks.push(block);
        Ok(())
    }

    /// Makes `reference` the target of subsequent writes, cursor at 0.
    pub fn open_block(&mut self, reference: StreamReference) -> Result<()> {
        if let Some(open) = self.open {
            return Err(BuildError::BlockAlreadyOpen(self.blocks[open.slot].reference));
        }
        let slot = *self
            .lookup
            .get(&reference)
            .ok_or(BuildError::UnknownBlock(reference))?;
        if self.blocks[slot].closed {
            return Err(BuildError::BlockClosed(reference));
        }
        self.open = Some(OpenBlock { slot, cursor: 0 });
        Ok(())
    }

    /// Closes the open block. It can no longer be written.
    pub fn close_block(&mut self) -> Result<()> {
        let open = self.open.take().ok_or(BuildError::NoOpenBlock)?;
        self.blocks[open.slot].closed = true;
        Ok(())
    }

    /// Reference of the open block, if any.
    pub fn current_block(&self) -> Option<StreamReference> {
        self.open.map(|open| self.blocks[open.slot].reference)
    }

    /// Cursor position inside the open block.
    pub fn position(&self) -> Result<usize> {
        self.open.map(|open| open.cursor).ok_or(BuildError::NoOpenBlock)
    }

    /// Moves the cursor forward to a multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let open = self.open.ok_or(BuildError::NoOpenBlock)?;
        let aligned = align_up(open.cursor, alignment);
        self.check_bounds(open.slot, aligned)?;
        self.set_cursor(aligned);
        Ok(())
    }

    /// Aligns the cursor, claims `len` bytes, and returns their offset.
    fn reserve(&mut self, len: usize, alignment: usize) -> Result<(usize, usize)> {
        let open = self.open.ok_or(BuildError::NoOpenBlock)?;
        let start = align_up(open.cursor, alignment);
        self.check_bounds(open.slot, start + len)?;
        self.set_cursor(start + len);
        Ok((open.slot, start))
    }

    fn check_bounds(&self, slot: usize, end: usize) -> Result<()> {
        let block = &self.blocks[slot];
        if end > block.size() {
            return Err(BuildError::BlockOverflow {
                reference: block.reference,
                size: block.size(),
                requested: end,
            });
        }
        Ok(())
    }

    fn set_cursor(&mut self, cursor: usize) {
        if let Some(open) = self.open.as_mut() {
            open.cursor = cursor;
        }
    }

    fn put(&mut self, bytes: &[u8], alignment: usize) -> Result<usize> {
        let (slot, at) = self.reserve(bytes.len(), alignment)?;
        self.blocks[slot].bytes[at..at + bytes.len()].copy_from_slice(bytes);
        Ok(at)
    }

    /// Writes raw bytes at the cursor without aligning.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.put(bytes, 1).map(|_| ())
    }

    /// Writes a boolean as one byte.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    /// Writes an unsigned byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.put(&[value], 1).map(|_| ())
    }

    /// Writes a signed byte.
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    /// Writes an unsigned 16-bit integer, 2-aligned.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        let mut buf = [0u8; 2];
        self.platform.put_u16(&mut buf, value);
        self.put(&buf, 2).map(|_| ())
    }

    /// Writes a signed 16-bit integer, 2-aligned.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_u16(value as u16)
    }

    /// Writes an unsigned 32-bit integer, 4-aligned.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        self.platform.put_u32(&mut buf, value);
        self.put(&buf, 4).map(|_| ())
    }

    /// Writes a signed 32-bit integer, 4-aligned.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_u32(value as u32)
    }

    /// Writes an unsigned 64-bit integer, 8-aligned.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        self.platform.put_u64(&mut buf, value);
        self.put(&buf, 8).map(|_| ())
    }

    /// Writes a signed 64-bit integer, 8-aligned.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_u64(value as u64)
    }

    /// Writes a single-precision float, 4-aligned.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_u32(value.to_bits())
    }

    /// Writes a double-precision float, 8-aligned.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_u64(value.to_bits())
    }

    /// Writes a pointer-width length or count.
    pub fn write_length(&mut self, value: u64) -> Result<()> {
        let width = self.platform.pointer_size();
        let mut buf = [0u8; 8];
        self.platform.put_pointer(&mut buf, value);
        self.put(&buf[..width], width).map(|_| ())
    }

    /// Writes a placeholder pointer to `target` and records the field.
    ///
    /// [`StreamReference::NULL`] is recorded too, and resolves to zero.
    pub fn write_reference(&mut self, target: StreamReference) -> Result<()> {
        let width = self.platform.pointer_size();
        let mut buf = [0u8; 8];
        self.platform.put_pointer(&mut buf, target.raw());
        let at = self.put(&buf[..width], width)?;
        if let Some(open) = self.open {
            self.blocks[open.slot].outgoing.push((at, target));
        }
        Ok(())
    }

    /// Writes a pointer to `target` followed by a pointer-width length.
    pub fn write_reference_with_length(&mut self, target: StreamReference, len: u64) -> Result<()> {
        self.write_reference(target)?;
        self.write_length(len)
    }

    /// Places the marker `reference` at the cursor of the open block.
    pub fn mark(&mut self, reference: StreamReference) -> Result<()> {
        let open = self.open.ok_or(BuildError::NoOpenBlock)?;
        if reference.is_reserved()
            || self.lookup.contains_key(&reference)
            || !self.markers.insert(reference)
        {
            return Err(BuildError::DuplicateMarker(reference));
        }
        self.blocks[open.slot]
            .markers
            .push((reference, open.cursor));
        Ok(())
    }

    /// Aligns to the value's alignment and lets it write itself.
    ///
    /// The value must not write more than its declared size; any remainder
    /// stays zero.
    pub fn write_struct(&mut self, value: &dyn ValueStruct) -> Result<()> {
        let size = value.struct_size();
        let (slot, start) = self.reserve(size, value.struct_align())?;
        let mut sink = BlockStructSink {
            platform: self.platform,
            block: &mut self.blocks[slot],
            start,
            cursor: start,
            end: start + size,
        };
        value.write_struct(&mut sink)
    }

    /// Hands every block over for resolution.
    pub fn finish(self) -> Result<BlockSet> {
        if let Some(open) = self.open {
            return Err(BuildError::BlockAlreadyOpen(self.blocks[open.slot].reference));
        }
        for block in self.blocks.iter().filter(|b| !b.closed) {
            log::warn!(
                "Block {} was never written, emitting it zero-filled",
                block.reference
            );
        }
        Ok(BlockSet {
            platform: self.platform,
            blocks: self.blocks,
        })
    }
}

/// [`StructSink`] over a claimed byte range of a block.
struct BlockStructSink<'b> {
    platform: Platform,
    block: &'b mut DataBlock,
    start: usize,
    cursor: usize,
    end: usize,
}

impl StructSink for BlockStructSink<'_> {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn position(&self) -> usize {
        self.cursor
    }

    fn put_raw(&mut self, bytes: &[u8], alignment: usize) -> Result<()> {
        if !is_aligned(self.cursor, alignment) {
            return Err(BuildError::AlignmentViolation {
                offset: self.cursor,
                alignment,
            });
        }
        let end = self.cursor + bytes.len();
        if end > self.end {
            // Sizes are relative to the struct, not to the block.
            return Err(BuildError::BlockOverflow {
                reference: self.block.reference,
                size: self.end - self.start,
                requested: end - self.start,
            });
        }
        self.block.bytes[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;
        Ok(())
    }
}
