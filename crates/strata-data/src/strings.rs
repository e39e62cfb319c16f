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

//! Interning of string content for one build.
//!
//! The table is emitted once, at the very start of the image. Each entry is
//! its UTF-8 bytes followed by a NUL byte, and the region is padded to 8.

use ahash::AHashMap;
use strata_core::{align_up, StreamReference};

/// Alignment of the string region.
pub const STRING_TABLE_ALIGNMENT: usize = 8;

/// Ordered set of unique strings.
#[derive(Debug, Default, Clone)]
pub struct StringTable {
    strings: Vec<String>,
    lookup: AHashMap<String, u32>,
}

impl StringTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text`, returning the index of the existing entry when present.
    pub fn add(&mut self, text: &str) -> u32 {
        if let Some(&index) = self.lookup.get(text) {
            return index;
        }
        let index = self.strings.len() as u32;
        self.strings.push(text.to_owned());
        self.lookup.insert(text.to_owned(), index);
        index
    }

    /// The string at `index`.
    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// Byte length of the string at `index`, terminator excluded.
    pub fn length_of(&self, index: u32) -> usize {
        self.get(index).map(str::len).unwrap_or(0)
    }

    /// The reference pointer fields use to target the string at `index`.
    pub fn reference_of(&self, index: u32) -> StreamReference {
        StreamReference::string(index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns `true` if nothing was interned.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterates entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Offset of each entry inside the region, in index order.
    pub fn local_offsets(&self) -> Vec<usize> {
        let mut offset = 0;
        self.strings
            .iter()
            .map(|s| {
                let at = offset;
                offset += s.len() + 1;
                at
            })
            .collect()
    }

    /// Size of the emitted region, terminators and padding included.
    pub fn region_size(&self) -> usize {
        let raw: usize = self.strings.iter().map(|s| s.len() + 1).sum();
        align_up(raw, STRING_TABLE_ALIGNMENT)
    }

    /// Appends the emitted region to `out`.
    pub fn write_region(&self, out: &mut Vec<u8>) {
        let start = out.len();
        for s in &self.strings {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        out.resize(start + self.region_size(), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_deduplicates_by_value() {
        let mut table = StringTable::new();
        let first = table.add("hi");
        let owned = String::from("hi");
        let second = table.add(&owned);
        let other = table.add("there");
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(table.len(), 2);
        assert_eq!(table.length_of(other), 5);
    }

    #[test]
    fn test_region_layout() {
        let mut table = StringTable::new();
        table.add("hi");
        table.add("there");
        assert_eq!(table.local_offsets(), vec![0, 3]);
        assert_eq!(table.region_size(), 16);

        let mut out = Vec::new();
        table.write_region(&mut out);
        assert_eq!(out.len(), 16);
        assert_eq!(&out[..9], b"hi\0there\0");
        assert!(out[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_region() {
        let table = StringTable::new();
        assert_eq!(table.region_size(), 0);
        assert!(table.local_offsets().is_empty());
    }

    #[test]
    fn test_references_use_string_namespace() {
        let mut table = StringTable::new();
        let index = table.add("name");
        assert_eq!(table.reference_of(index).string_index(), Some(index));
    }
}
