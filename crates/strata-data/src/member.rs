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

//! The flat member table describing one object graph.
//!
//! Every value of the source graph becomes one [`MemberRecord`]. Composite
//! records (classes, arrays, dictionaries) own a contiguous range of the same
//! table; a dictionary's range holds all keys followed by all values.

use crate::kind::Kind;
use ahash::{AHashMap, AHashSet};
use std::ops::Range;
use std::sync::Arc;
use strata_core::{BuildError, Result, ValueStruct};

/// The originating value of a record.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Composites without extra data (arrays, dictionaries).
    None,
    /// A flag.
    Bool(bool),
    /// Packed flags, bit *i* being the *i*-th boolean child.
    Bitset(u8),
    /// `i8`.
    Int8(i8),
    /// `u8`.
    Uint8(u8),
    /// `i16`.
    Int16(i16),
    /// `u16`.
    Uint16(u16),
    /// `i32`.
    Int32(i32),
    /// `u32`.
    Uint32(u32),
    /// `i64`.
    Int64(i64),
    /// `u64`.
    Uint64(u64),
    /// `f32`.
    Float32(f32),
    /// `f64`.
    Float64(f64),
    /// Index into the build's [`StringTable`](crate::StringTable).
    String(u32),
    /// An enumerator.
    Enum {
        /// Name of the enum type.
        type_name: String,
        /// Enumerator value.
        value: u32,
    },
    /// A self-describing value.
    Struct(Arc<dyn ValueStruct>),
    /// A class instance.
    Class {
        /// Name of the class type.
        type_name: String,
    },
}

/// One entry of the [`MemberModel`].
#[derive(Debug, Clone)]
pub struct MemberRecord {
    /// Type tag.
    pub kind: Kind,
    /// Index into the model's name list.
    pub name_id: usize,
    /// First child record, for composites.
    pub children_start: usize,
    /// Number of children. For dictionaries, the number of key/value pairs.
    pub children_count: usize,
    /// The originating value.
    pub payload: Payload,
}

impl MemberRecord {
    /// Creates a record without children.
    pub fn new(kind: Kind, name_id: usize, payload: Payload) -> Self {
        Self {
            kind,
            name_id,
            children_start: 0,
            children_count: 0,
            payload,
        }
    }

    /// Every record index owned by this record.
    ///
    /// For a dictionary this spans keys and values, twice `children_count`.
    pub fn children(&self) -> Range<usize> {
        let len = match self.kind {
            Kind::Dictionary => self.children_count * 2,
            _ => self.children_count,
        };
        self.children_start..self.children_start + len
    }

    /// Key records of a dictionary.
    pub fn keys(&self) -> Range<usize> {
        self.children_start..self.children_start + self.children_count
    }

    /// Value records of a dictionary.
    pub fn values(&self) -> Range<usize> {
        let start = self.children_start + self.children_count;
        start..start + self.children_count
    }
}

/// The flat, addressable member table of one build.
///
/// Record 0 is the root and must be a class.
#[derive(Debug, Default)]
pub struct MemberModel {
    members: Vec<MemberRecord>,
    names: Vec<String>,
    name_lookup: AHashMap<String, usize>,
    packed_classes: AHashSet<usize>,
}

impl MemberModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `name`, registering it on first use.
    pub fn register_name(&mut self, name: &str) -> usize {
        if let Some(&id) = self.name_lookup.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_owned());
        self.name_lookup.insert(name.to_owned(), id);
        id
    }

    /// The registered name with the given id.
    pub fn name(&self, name_id: usize) -> &str {
        self.names.get(name_id).map(String::as_str).unwrap_or("")
    }

    /// Every registered name, in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Appends a record and returns its index.
    pub fn add_member(
        &mut self,
        kind: Kind,
        name: &str,
        children_start: usize,
        children_count: usize,
        payload: Payload,
    ) -> usize {
        let name_id = self.register_name(name);
        self.push(MemberRecord {
            kind,
            name_id,
            children_start,
            children_count,
            payload,
        })
    }

    /// Appends a prepared record and returns its index.
    pub fn push(&mut self, record: MemberRecord) -> usize {
        self.members.push(record);
        self.members.len() - 1
    }

    /// Sets the child range of a composite record.
    pub fn update_range(&mut self, index: usize, start: usize, count: usize) -> Result<()> {
        let record = self.member_mut(index)?;
        record.children_start = start;
        record.children_count = count;
        Ok(())
    }

    /// Exchanges two records.
    pub fn swap_members(&mut self, a: usize, b: usize) -> Result<()> {
        self.member(a)?;
        self.member(b)?;
        self.members.swap(a, b);
        Ok(())
    }

    /// Appends a copy of a record and returns the index of the copy.
    pub fn duplicate_member(&mut self, index: usize) -> Result<usize> {
        let copy = self.member(index)?.clone();
        Ok(self.push(copy))
    }

    /// Overwrites a record.
    pub fn set_member(&mut self, index: usize, record: MemberRecord) -> Result<()> {
        *self.member_mut(index)? = record;
        Ok(())
    }

    /// The record at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&MemberRecord> {
        self.members.get(index)
    }

    /// The record at `index`, or [`BuildError::InvalidMember`].
    pub fn member(&self, index: usize) -> Result<&MemberRecord> {
        self.members
            .get(index)
            .ok_or_else(|| BuildError::invalid_member(index, "index out of range"))
    }

    fn member_mut(&mut self, index: usize) -> Result<&mut MemberRecord> {
        self.members
            .get_mut(index)
            .ok_or_else(|| BuildError::invalid_member(index, "index out of range"))
    }

    pub(crate) fn records_mut(&mut self, range: Range<usize>) -> Result<&mut [MemberRecord]> {
        let len = self.members.len();
        self.members.get_mut(range.clone()).ok_or_else(|| {
            BuildError::invalid_member(
                range.start,
                format!("range {}..{} exceeds {len} records", range.start, range.end),
            )
        })
    }

    /// The child range of a record, checked against the table length.
    pub fn children(&self, index: usize) -> Result<Range<usize>> {
        let range = self.member(index)?.children();
        if range.end > self.members.len() {
            return Err(BuildError::invalid_member(
                index,
                format!(
                    "children {}..{} exceed the table of {} records",
                    range.start,
                    range.end,
                    self.members.len()
                ),
            ));
        }
        Ok(range)
    }

    /// Name of the record at `index`.
    pub fn name_of(&self, index: usize) -> &str {
        self.get(index).map(|r| self.name(r.name_id)).unwrap_or("")
    }

    /// Index of the root class.
    pub fn root(&self) -> Result<usize> {
        match self.members.first() {
            Some(record) if record.kind == Kind::Class => Ok(0),
            Some(record) => Err(BuildError::invalid_member(
                0,
                format!("root must be a class, found {:?}", record.kind),
            )),
            None => Err(BuildError::invalid_member(0, "the member model is empty")),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no record was added.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates records in index order.
    pub fn iter(&self) -> impl Iterator<Item = &MemberRecord> {
        self.members.iter()
    }

    /// Flags a class as packed. Returns `false` if it already was.
    pub(crate) fn mark_packed(&mut self, class_index: usize) -> bool {
        self.packed_classes.insert(class_index)
    }

    /// Whether booleans of the class were already combined.
    pub fn is_packed(&self, class_index: usize) -> bool {
        self.packed_classes.contains(&class_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_deduplicated() {
        let mut model = MemberModel::new();
        let a = model.register_name("speed");
        let b = model.register_name("speed");
        let c = model.register_name("hp");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(model.name(c), "hp");
    }

    #[test]
    fn test_root_must_be_a_class() {
        let mut model = MemberModel::new();
        assert!(model.root().is_err());

        model.add_member(Kind::Int32, "x", 0, 0, Payload::Int32(1));
        assert!(matches!(
            model.root(),
            Err(BuildError::InvalidMember { index: 0, .. })
        ));
    }

    #[test]
    fn test_update_swap_duplicate() {
        let mut model = MemberModel::new();
        let root = model.add_member(Kind::Class, "root", 0, 0, Payload::None);
        let a = model.add_member(Kind::Int8, "a", 0, 0, Payload::Int8(1));
        let b = model.add_member(Kind::Int8, "b", 0, 0, Payload::Int8(2));
        model.update_range(root, a, 2).unwrap();
        assert_eq!(model.children(root).unwrap(), 1..3);

        model.swap_members(a, b).unwrap();
        assert_eq!(model.name_of(a), "b");

        let copy = model.duplicate_member(a).unwrap();
        assert_eq!(copy, 3);
        assert_eq!(model.name_of(copy), "b");
        assert!(model.swap_members(0, 99).is_err());
    }

    #[test]
    fn test_dictionary_children_span_keys_and_values() {
        let mut model = MemberModel::new();
        let dict = model.add_member(Kind::Dictionary, "d", 1, 2, Payload::None);
        let record = model.member(dict).unwrap();
        assert_eq!(record.children(), 1..5);
        assert_eq!(record.keys(), 1..3);
        assert_eq!(record.values(), 3..5);
        assert!(
            model.children(dict).is_err(),
            "children past the end of the table must be rejected"
        );
    }
}
