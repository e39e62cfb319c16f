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

//! A single independently addressable region of the output image.

use strata_core::{align_up, ContentHash, ContentHasher, Platform, StreamReference};

/// Minimum granularity of every block size.
pub const BLOCK_GRANULARITY: usize = 8;

/// One allocated output region with its outgoing references and markers.
///
/// The size is fixed at allocation and padded to a multiple of
/// `max(alignment, 8)`, so consecutive blocks stay aligned.
#[derive(Debug, Clone)]
pub struct DataBlock {
    pub(crate) reference: StreamReference,
    pub(crate) alignment: usize,
    pub(crate) bytes: Vec<u8>,
    pub(crate) outgoing: Vec<(usize, StreamReference)>,
    pub(crate) markers: Vec<(StreamReference, usize)>,
    pub(crate) closed: bool,
}

impl DataBlock {
    pub(crate) fn new(reference: StreamReference, alignment: usize, size: usize) -> Self {
        let alignment = alignment.max(1);
        let size = align_up(size, alignment.max(BLOCK_GRANULARITY));
        Self {
            reference,
            alignment,
            bytes: vec![0; size],
            outgoing: Vec::new(),
            markers: Vec::new(),
            closed: false,
        }
    }

    /// The reference naming the block.
    pub fn reference(&self) -> StreamReference {
        self.reference
    }

    /// Required alignment of the block in the image.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Padded size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Raw content. Reference fields still hold symbolic placeholders.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Every `(local offset, target)` pointer field, in write order.
    pub fn outgoing(&self) -> &[(usize, StreamReference)] {
        &self.outgoing
    }

    /// Named sub-positions other blocks may point at.
    pub fn markers(&self) -> &[(StreamReference, usize)] {
        &self.markers
    }

    /// Whether writing to the block is finished.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Hash of everything that identifies the content: alignment, bytes
    /// and outgoing references. Markers are not part of it.
    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = ContentHasher::new();
        hasher.update_u64(self.alignment as u64).update(&self.bytes);
        for &(offset, target) in &self.outgoing {
            hasher.update_u64(offset as u64).update_u64(target.raw());
        }
        hasher.finalize()
    }

    /// Exact comparison backing a hash match.
    pub fn same_content(&self, other: &DataBlock) -> bool {
        self.alignment == other.alignment
            && self.bytes == other.bytes
            && self.outgoing == other.outgoing
    }

    /// Retargets every field pointing at `from`, placeholder bytes included.
    ///
    /// Returns the number of rewritten fields.
    pub(crate) fn replace_reference(
        &mut self,
        platform: &Platform,
        from: StreamReference,
        to: StreamReference,
    ) -> usize {
        let mut replaced = 0;
        for (offset, target) in self.outgoing.iter_mut() {
            if *target == from {
                *target = to;
                platform.put_pointer(&mut self.bytes[*offset..], to.raw());
                replaced += 1;
            }
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(raw: u64, size: usize) -> DataBlock {
        DataBlock::new(StreamReference::from_raw(raw), 8, size)
    }

    #[test]
    fn test_size_is_padded_to_granularity() {
        assert_eq!(block(1, 0).size(), 0);
        assert_eq!(block(1, 3).size(), 8);
        assert_eq!(block(1, 21).size(), 24);
        assert_eq!(DataBlock::new(StreamReference::from_raw(1), 16, 20).size(), 32);
        assert_eq!(DataBlock::new(StreamReference::from_raw(1), 1, 1).size(), 8);
    }

    #[test]
    fn test_hash_ignores_identity_but_not_targets() {
        let mut a = block(1, 8);
        let mut b = block(2, 8);
        assert_eq!(a.content_hash(), b.content_hash());

        a.outgoing.push((0, StreamReference::from_raw(10)));
        b.outgoing.push((0, StreamReference::from_raw(11)));
        assert_ne!(a.content_hash(), b.content_hash());
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_replace_reference_rewrites_placeholder() {
        let platform = Platform::PC;
        let mut a = block(1, 16);
        let old = StreamReference::from_raw(10);
        let new = StreamReference::from_raw(4);
        platform.put_pointer(&mut a.bytes[8..], old.raw());
        a.outgoing.push((8, old));

        assert_eq!(a.replace_reference(&platform, old, new), 1);
        assert_eq!(a.outgoing(), &[(8, new)]);
        assert_eq!(platform.get_pointer(&a.bytes[8..]), 4);
    }
}
