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

//! Layout rules: boolean packing, deterministic member order, sizes and alignments.
//!
//! Packing and ordering mutate the [`MemberModel`] in place and must run
//! before any block is sized. Two structurally identical classes always end
//! up with identical layouts, which is what lets the resolver fold them.

use crate::kind::Kind;
use crate::member::{MemberModel, MemberRecord, Payload};
use ahash::AHashSet;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::ops::Range;
use strata_core::{align_up, BuildError, PointerWidth, Result};

/// Number of flags one bitset byte holds.
pub const BITS_PER_BITSET: usize = 8;

/// Packs the boolean members of a class into bitset records.
///
/// Booleans are moved behind the other members (both groups keep their
/// relative order), then every run of up to eight becomes one [`Kind::Bitset`]
/// whose bit *i* is the *i*-th boolean of the run. The original booleans are
/// duplicated at the end of the table and become the bitset's children.
///
/// Returns `false`, and changes nothing, if the class was already packed.
pub fn combine_booleans(model: &mut MemberModel, class_index: usize) -> Result<bool> {
    let kind = model.member(class_index)?.kind;
    if kind != Kind::Class {
        return Err(BuildError::invalid_member(
            class_index,
            format!("cannot pack booleans of a {kind:?}"),
        ));
    }
    if !model.mark_packed(class_index) {
        log::warn!(
            "Booleans of class '{}' (#{class_index}) are already packed, skipping",
            model.name_of(class_index)
        );
        return Ok(false);
    }

    let range = model.children(class_index)?;
    let start = range.start;
    let slots = model.records_mut(range)?;
    let (mut ordered, booleans): (Vec<MemberRecord>, Vec<MemberRecord>) =
        slots.iter().cloned().partition(|r| r.kind != Kind::Bool);
    let prefix = ordered.len();
    if booleans.is_empty() {
        return Ok(true);
    }
    ordered.extend(booleans.iter().cloned());
    slots.clone_from_slice(&ordered);

    let tail_start = start + prefix;
    let mut runs = 0;
    for (run_index, run) in booleans.chunks(BITS_PER_BITSET).enumerate() {
        let first_copy = model.len();
        let mut byte = 0u8;
        for (bit, record) in run.iter().enumerate() {
            match record.payload {
                Payload::Bool(true) => byte |= 1 << bit,
                Payload::Bool(false) => {}
                _ => {
                    return Err(BuildError::invalid_member(
                        tail_start + run_index * BITS_PER_BITSET + bit,
                        "boolean record without a boolean payload",
                    ))
                }
            }
            model.push(record.clone());
        }

        let bitset = MemberRecord {
            kind: Kind::Bitset,
            name_id: booleans[run_index].name_id,
            children_start: first_copy,
            children_count: run.len(),
            payload: Payload::Bitset(byte),
        };
        model.set_member(tail_start + run_index, bitset)?;
        runs += 1;
    }

    model.update_range(class_index, start, prefix + runs)?;
    log::debug!(
        "Packed {} booleans of '{}' into {runs} bitset(s)",
        booleans.len(),
        model.name_of(class_index)
    );
    Ok(true)
}

/// Stable-sorts the members of a class with `compare`.
pub fn sort_members<F>(model: &mut MemberModel, class_index: usize, mut compare: F) -> Result<()>
where
    F: FnMut(&MemberRecord, &MemberRecord) -> Ordering,
{
    let range = model.children(class_index)?;
    let slots = model.records_mut(range)?;
    let mut sorted = slots.to_vec();
    sorted.sort_by(&mut compare);
    slots.clone_from_slice(&sorted);
    Ok(())
}

/// The default member order: larger fields first, then kind index, then name id.
///
/// Bitsets of one class keep their run order, so byte *k* always holds
/// booleans `8k..8k + 8` whatever names they carry.
pub fn default_member_order(
    width: PointerWidth,
) -> impl Fn(&MemberRecord, &MemberRecord) -> Ordering {
    move |a, b| {
        sort_bits(b, width)
            .cmp(&sort_bits(a, width))
            .then_with(|| a.kind.index().cmp(&b.kind.index()))
            .then_with(|| match (a.kind, b.kind) {
                // Runs are duplicated to the table end in order.
                (Kind::Bitset, Kind::Bitset) => a.children_start.cmp(&b.children_start),
                _ => Ordering::Equal,
            })
            .then_with(|| a.name_id.cmp(&b.name_id))
    }
}

fn sort_bits(record: &MemberRecord, width: PointerWidth) -> usize {
    match (&record.kind, &record.payload) {
        (Kind::Struct, Payload::Struct(value)) => value.struct_size() * 8,
        (Kind::Struct, _) => 64,
        (kind, _) => kind.size_in_bits(width),
    }
}

/// Packs and sorts every class reachable from the root, each exactly once.
///
/// Returns the number of classes laid out.
pub fn prepare_layout(model: &mut MemberModel, width: PointerWidth) -> Result<usize> {
    let root = model.root()?;
    let mut queue = VecDeque::from([root]);
    let mut visited = AHashSet::new();
    let mut classes = 0;

    while let Some(index) = queue.pop_front() {
        if !visited.insert(index) {
            continue;
        }
        if model.member(index)?.kind == Kind::Class {
            combine_booleans(model, index)?;
            sort_members(model, index, default_member_order(width))?;
            classes += 1;
        }
        for child in model.children(index)? {
            if model.member(child)?.kind.is_composite() {
                queue.push_back(child);
            }
        }
    }

    log::debug!("Laid out {classes} class(es) over {} records", model.len());
    Ok(classes)
}

/// Size and alignment queries over a laid-out model.
#[derive(Debug, Clone, Copy)]
pub struct LayoutRules<'a> {
    model: &'a MemberModel,
    width: PointerWidth,
}

impl<'a> LayoutRules<'a> {
    /// Creates the rules for a target pointer width.
    pub fn new(model: &'a MemberModel, width: PointerWidth) -> Self {
        Self { model, width }
    }

    /// The pointer width the rules are computed for.
    pub fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    /// Alignment of the record's field inside its parent.
    pub fn member_alignment(&self, index: usize) -> Result<usize> {
        let record = self.model.member(index)?;
        match record.kind {
            Kind::Struct => Ok(struct_payload(record, index)?.struct_align().max(1)),
            kind => Ok(kind.alignment(self.width).max(1)),
        }
    }

    /// Size in bytes of the record's field inside its parent.
    pub fn member_size(&self, index: usize) -> Result<usize> {
        let record = self.model.member(index)?;
        match record.kind {
            Kind::Struct => Ok(struct_payload(record, index)?.struct_size()),
            kind => Ok(kind.size_in_bytes(self.width)),
        }
    }

    /// Alignment of the block holding the record's content.
    ///
    /// Composites take the alignment of their first child, or the pointer
    /// width when they have none.
    pub fn data_alignment(&self, index: usize) -> Result<usize> {
        let record = self.model.member(index)?;
        if !record.kind.is_composite() {
            return self.member_alignment(index);
        }
        if record.children_count == 0 {
            return Ok(self.width.bytes());
        }
        self.member_alignment(record.children_start)
    }

    /// Size in bytes of the record's content.
    ///
    /// For non-composites this is the field size; composites sum their
    /// children as they will be written.
    pub fn data_size(&self, index: usize) -> Result<usize> {
        let record = self.model.member(index)?;
        match record.kind {
            Kind::Class => {
                let total = self.packed_size(self.model.children(index)?)?;
                Ok(align_up(total, self.data_alignment(index)?))
            }
            Kind::Array => self.packed_size(self.model.children(index)?),
            Kind::Dictionary => {
                self.model.children(index)?;
                if record.children_count == 0 {
                    return Ok(0);
                }
                let keys = self.packed_size(record.keys())?;
                let value_align = self.member_alignment(record.values().start)?;
                Ok(align_up(keys, value_align) + self.packed_size(record.values())?)
            }
            _ => self.member_size(index),
        }
    }

    /// Offset of the value range inside a dictionary block.
    pub fn dictionary_values_offset(&self, index: usize) -> Result<usize> {
        let record = self.model.member(index)?;
        if record.children_count == 0 {
            return Ok(0);
        }
        let keys = self.packed_size(record.keys())?;
        Ok(align_up(keys, self.member_alignment(record.values().start)?))
    }

    fn packed_size(&self, range: Range<usize>) -> Result<usize> {
        let mut total = 0;
        let mut last_align = 1;
        for child in range {
            last_align = self.member_alignment(child)?;
            total = align_up(total, last_align) + self.member_size(child)?;
        }
        Ok(align_up(total, last_align))
    }
}

fn struct_payload(
    record: &MemberRecord,
    index: usize,
) -> Result<&std::sync::Arc<dyn strata_core::ValueStruct>> {
    match &record.payload {
        Payload::Struct(value) => Ok(value),
        _ => Err(BuildError::invalid_member(
            index,
            "struct record without a struct payload",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_id::FileId;
    use std::sync::Arc;

    const W: PointerWidth = PointerWidth::Bits64;

    /// Builds a root class whose children are the given records.
    fn class_with(children: Vec<(Kind, &str, Payload)>) -> MemberModel {
        let mut model = MemberModel::new();
        let root = model.add_member(
            Kind::Class,
            "root",
            0,
            0,
            Payload::Class {
                type_name: "Root".into(),
            },
        );
        let start = model.len();
        let count = children.len();
        for (kind, name, payload) in children {
            model.add_member(kind, name, 0, 0, payload);
        }
        model.update_range(root, start, count).unwrap();
        model
    }

    fn kinds_of(model: &MemberModel, class_index: usize) -> Vec<Kind> {
        model
            .children(class_index)
            .unwrap()
            .map(|i| model.member(i).unwrap().kind)
            .collect()
    }

    #[test]
    fn test_ten_booleans_pack_into_two_bytes() {
        let names: Vec<String> = (0..10).map(|i| format!("flag{i}")).collect();
        let model_children = names
            .iter()
            .enumerate()
            .map(|(i, n)| (Kind::Bool, n.as_str(), Payload::Bool(i % 3 == 0)))
            .collect();
        let mut model = class_with(model_children);

        assert!(combine_booleans(&mut model, 0).unwrap());
        assert_eq!(kinds_of(&model, 0), vec![Kind::Bitset, Kind::Bitset]);

        let first = model.member(1).unwrap();
        let second = model.member(2).unwrap();
        // Flags 0, 3 and 6 in the first byte, flag 9 in the second.
        assert!(matches!(first.payload, Payload::Bitset(0b0100_1001)));
        assert!(matches!(second.payload, Payload::Bitset(0b0000_0010)));
        assert_eq!(first.children_count, 8);
        assert_eq!(second.children_count, 2);

        // Every boolean stays reachable by name under its bitset.
        let copies: Vec<&str> = first
            .children()
            .chain(second.children())
            .map(|i| model.name_of(i))
            .collect();
        assert_eq!(copies, names.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_packing_keeps_non_boolean_order() {
        let mut model = class_with(vec![
            (Kind::Bool, "a", Payload::Bool(true)),
            (Kind::Int32, "x", Payload::Int32(5)),
            (Kind::Bool, "b", Payload::Bool(false)),
            (Kind::Int8, "y", Payload::Int8(1)),
        ]);
        combine_booleans(&mut model, 0).unwrap();

        assert_eq!(kinds_of(&model, 0), vec![Kind::Int32, Kind::Int8, Kind::Bitset]);
        let bitset = model.member(3).unwrap();
        assert!(matches!(bitset.payload, Payload::Bitset(0b01)));
        assert_eq!(model.name(bitset.name_id), "a");
    }

    #[test]
    fn test_second_packing_is_a_no_op() {
        let mut model = class_with(vec![
            (Kind::Bool, "a", Payload::Bool(true)),
            (Kind::Bool, "b", Payload::Bool(true)),
        ]);
        assert!(combine_booleans(&mut model, 0).unwrap());
        let len = model.len();
        assert!(!combine_booleans(&mut model, 0).unwrap());
        assert_eq!(model.len(), len, "a second pass must not duplicate again");
        assert_eq!(model.member(0).unwrap().children_count, 1);
    }

    #[test]
    fn test_default_order_is_size_then_kind_then_name() {
        let mut model = class_with(vec![
            (Kind::Bitset, "flags", Payload::Bitset(1)),
            (Kind::Int32, "x", Payload::Int32(5)),
            (Kind::Uint32, "u", Payload::Uint32(1)),
            (Kind::String, "s", Payload::String(0)),
            (Kind::Float32, "b", Payload::Float32(1.0)),
            (Kind::Float32, "a", Payload::Float32(2.0)),
        ]);
        sort_members(&mut model, 0, default_member_order(W)).unwrap();

        let names: Vec<&str> = model.children(0).unwrap().map(|i| model.name_of(i)).collect();
        // Names were registered root, flags, x, u, s, b, a: "b" has the smaller id.
        assert_eq!(names, vec!["s", "x", "u", "b", "a", "flags"]);
    }

    #[test]
    fn test_bitset_runs_keep_their_order_with_reused_names() {
        let mut model = MemberModel::new();
        // An earlier class already registered the second flag's name.
        model.register_name("flag1");
        let root = model.add_member(
            Kind::Class,
            "root",
            0,
            0,
            Payload::Class {
                type_name: "Flags".into(),
            },
        );
        let start = model.len();
        for i in 0..10 {
            model.add_member(Kind::Bool, &format!("flag{i}"), 0, 0, Payload::Bool(i < 8));
        }
        model.update_range(root, start, 10).unwrap();

        combine_booleans(&mut model, root).unwrap();
        sort_members(&mut model, root, default_member_order(W)).unwrap();

        let bytes: Vec<u8> = model
            .children(root)
            .unwrap()
            .map(|i| match model.member(i).unwrap().payload {
                Payload::Bitset(byte) => byte,
                ref other => panic!("expected a bitset, got {other:?}"),
            })
            .collect();
        assert_eq!(bytes, vec![0b1111_1111, 0b0000_0000], "byte 0 must hold booleans 0..8");
    }

    #[test]
    fn test_struct_sorts_by_declared_size() {
        let mut model = class_with(vec![
            (Kind::Int8, "small", Payload::Int8(0)),
            (Kind::Struct, "file", Payload::Struct(Arc::new(FileId(3)))),
        ]);
        sort_members(&mut model, 0, default_member_order(W)).unwrap();
        assert_eq!(kinds_of(&model, 0), vec![Kind::Struct, Kind::Int8]);
    }

    #[test]
    fn test_class_size_pads_to_its_alignment() {
        // {a, b, x: i32, s: string} once packed and sorted: s@0, x@16, flags@20.
        let mut model = class_with(vec![
            (Kind::Bool, "a", Payload::Bool(true)),
            (Kind::Bool, "b", Payload::Bool(false)),
            (Kind::Int32, "x", Payload::Int32(5)),
            (Kind::String, "s", Payload::String(0)),
        ]);
        assert_eq!(prepare_layout(&mut model, W).unwrap(), 1);

        let rules = LayoutRules::new(&model, W);
        assert_eq!(kinds_of(&model, 0), vec![Kind::String, Kind::Int32, Kind::Bitset]);
        assert_eq!(rules.data_alignment(0).unwrap(), 8);
        assert_eq!(rules.data_size(0).unwrap(), 24);
    }

    #[test]
    fn test_dictionary_values_start_aligned() {
        let mut model = MemberModel::new();
        model.add_member(Kind::Class, "root", 1, 1, Payload::None);
        model.add_member(Kind::Dictionary, "d", 2, 3, Payload::None);
        for i in 0..3 {
            model.add_member(Kind::Int32, "k", 0, 0, Payload::Int32(i));
        }
        for i in 0..3 {
            model.add_member(Kind::Int64, "v", 0, 0, Payload::Int64(i));
        }

        let rules = LayoutRules::new(&model, W);
        assert_eq!(rules.dictionary_values_offset(1).unwrap(), 16);
        assert_eq!(rules.data_size(1).unwrap(), 16 + 24);
        assert_eq!(rules.data_alignment(1).unwrap(), 4);
        assert_eq!(rules.member_size(1).unwrap(), 16);
    }

    #[test]
    fn test_empty_composite_uses_pointer_alignment() {
        let model = class_with(vec![]);
        let rules = LayoutRules::new(&model, PointerWidth::Bits32);
        assert_eq!(rules.data_alignment(0).unwrap(), 4);
        assert_eq!(rules.data_size(0).unwrap(), 0);
    }

    #[test]
    fn test_struct_without_payload_is_rejected() {
        let model = class_with(vec![(Kind::Struct, "broken", Payload::None)]);
        let rules = LayoutRules::new(&model, W);
        assert!(matches!(
            rules.member_size(1),
            Err(BuildError::InvalidMember { index: 1, .. })
        ));
    }
}
