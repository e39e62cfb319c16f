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

//! The closed set of member kinds and their fixed layout table.

use strata_core::PointerWidth;

/// Type tag of a [`MemberRecord`](crate::MemberRecord).
///
/// The discriminant is the kind index used by the default member ordering.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// Placeholder for a record that was never filled in.
    Unknown = 0,
    /// A single flag, packed into a [`Kind::Bitset`] inside classes.
    Bool,
    /// Up to eight packed flags in one byte.
    Bitset,
    /// `i8`.
    Int8,
    /// `u8`.
    Uint8,
    /// `i16`.
    Int16,
    /// `u16`.
    Uint16,
    /// `i32`.
    Int32,
    /// `u32`.
    Uint32,
    /// `i64`.
    Int64,
    /// `u64`.
    Uint64,
    /// `f32`.
    Float32,
    /// `f64`.
    Float64,
    /// Pointer into the string table plus a byte length.
    String,
    /// A `u32` enumerator value.
    Enum,
    /// A value with its own layout, see [`ValueStruct`](strata_core::ValueStruct).
    Struct,
    /// Pointer to a block holding the class members.
    Class,
    /// Pointer to a block of elements plus a count.
    Array,
    /// Pointer to a block of keys followed by values, plus a count.
    Dictionary,
}

struct KindInfo {
    bits: usize,
    alignment: usize,
    pointer_slots: usize,
    type_name: &'static str,
}

const fn info(bits: usize, alignment: usize, type_name: &'static str) -> KindInfo {
    KindInfo {
        bits,
        alignment,
        pointer_slots: 0,
        type_name,
    }
}

const fn pointers(pointer_slots: usize, type_name: &'static str) -> KindInfo {
    KindInfo {
        bits: 0,
        alignment: 0,
        pointer_slots,
        type_name,
    }
}

// Indexed by `Kind as usize`.
const KIND_TABLE: [KindInfo; 19] = [
    info(0, 1, "unknown"),
    info(1, 1, "bool"),
    info(8, 1, "u8"),
    info(8, 1, "s8"),
    info(8, 1, "u8"),
    info(16, 2, "s16"),
    info(16, 2, "u16"),
    info(32, 4, "s32"),
    info(32, 4, "u32"),
    info(64, 8, "s64"),
    info(64, 8, "u64"),
    info(32, 4, "f32"),
    info(64, 8, "f64"),
    pointers(2, "string_t"),
    info(32, 4, "enum_t"),
    info(0, 0, "struct"),
    pointers(1, "class"),
    pointers(2, "array_t"),
    pointers(2, "dict_t"),
];

impl Kind {
    /// Every kind, in index order.
    pub const ALL: [Kind; 19] = [
        Kind::Unknown,
        Kind::Bool,
        Kind::Bitset,
        Kind::Int8,
        Kind::Uint8,
        Kind::Int16,
        Kind::Uint16,
        Kind::Int32,
        Kind::Uint32,
        Kind::Int64,
        Kind::Uint64,
        Kind::Float32,
        Kind::Float64,
        Kind::String,
        Kind::Enum,
        Kind::Struct,
        Kind::Class,
        Kind::Array,
        Kind::Dictionary,
    ];

    fn info(self) -> &'static KindInfo {
        &KIND_TABLE[self as usize]
    }

    /// Position of the kind in the closed set.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Width of the in-parent field in bits. Zero for [`Kind::Struct`].
    pub fn size_in_bits(self, width: PointerWidth) -> usize {
        let info = self.info();
        if info.pointer_slots > 0 {
            info.pointer_slots * width.bits() as usize
        } else {
            info.bits
        }
    }

    /// Width of the in-parent field in bytes, rounded up.
    pub fn size_in_bytes(self, width: PointerWidth) -> usize {
        self.size_in_bits(width).div_ceil(8)
    }

    /// Alignment of the in-parent field. Zero for [`Kind::Struct`].
    pub fn alignment(self, width: PointerWidth) -> usize {
        let info = self.info();
        if info.pointer_slots > 0 {
            width.bytes()
        } else {
            info.alignment
        }
    }

    /// Number of pointer-width slots the field occupies.
    pub fn pointer_slots(self) -> usize {
        self.info().pointer_slots
    }

    /// Short type name used in listings.
    pub fn type_name(self) -> &'static str {
        self.info().type_name
    }

    /// Kinds whose content lives in a separate block.
    pub fn is_composite(self) -> bool {
        matches!(self, Kind::Class | Kind::Array | Kind::Dictionary)
    }

    /// Kinds encoded as a pointer (plus a length) inside their parent.
    pub fn is_reference_like(self) -> bool {
        self.pointer_slots() > 0
    }
}
