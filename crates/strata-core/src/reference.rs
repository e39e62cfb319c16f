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

//! Symbolic handles for output regions that have not been placed yet.

use std::fmt;

const STRING_BIT: u64 = 1 << 63;

/// An opaque identifier of a block, a marker or an interned string.
///
/// References are compared by identity only. They become byte offsets when the
/// resolver places the blocks they name.
///
/// The id space is split in three:
/// - `0` is [`StreamReference::NULL`];
/// - ids with the top bit set name interned strings, or the string table itself;
/// - everything else is minted by a [`ReferenceAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StreamReference(u64);

impl StreamReference {
    /// "No reference". Always resolves to zero and is never relocated.
    pub const NULL: StreamReference = StreamReference(0);
    /// The string table region at the start of the image.
    pub const STRING_TABLE: StreamReference = StreamReference(u64::MAX);

    /// Wraps a raw id.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id, as written into reference placeholders.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// The reference of the interned string at `index`.
    pub const fn string(index: u32) -> Self {
        Self(STRING_BIT | index as u64)
    }

    /// Returns `true` for [`StreamReference::NULL`].
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns the interned string index if this reference names a string.
    pub fn string_index(self) -> Option<u32> {
        if self == Self::STRING_TABLE || self.0 & STRING_BIT == 0 {
            None
        } else {
            u32::try_from(self.0 & !STRING_BIT).ok()
        }
    }

    /// Returns `true` for ids that can never name a block.
    pub fn is_reserved(self) -> bool {
        self.is_null() || self.0 & STRING_BIT != 0
    }
}

impl fmt::Display for StreamReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else if *self == Self::STRING_TABLE {
            write!(f, "string-table")
        } else if let Some(index) = self.string_index() {
            write!(f, "string#{index}")
        } else {
            write!(f, "ref#{}", self.0)
        }
    }
}

/// Mints fresh block and marker references for one build.
#[derive(Debug)]
pub struct ReferenceAllocator {
    next: u64,
}

impl ReferenceAllocator {
    /// Creates an allocator whose first reference is `ref#1`.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns a reference never handed out before by this allocator.
    pub fn allocate(&mut self) -> StreamReference {
        let reference = StreamReference(self.next);
        self.next += 1;
        reference
    }

    /// How many references have been minted so far.
    pub fn allocated(&self) -> u64 {
        self.next - 1
    }
}

impl Default for ReferenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}
