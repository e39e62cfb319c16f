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

//! Finalization: identical-block folding, placement and relocation.
//!
//! 1. Blocks are hashed over their content and outgoing references. The first
//!    block of each hash group is canonical, every later one is folded into it
//!    and all referrers are retargeted.
//! 2. Retargeting changes referrer content, so passes repeat until one folds
//!    nothing.
//! 3. Survivors are placed after the string table in allocation order, every
//!    pointer field is patched with an absolute offset and its position is
//!    added to the relocation table.

use crate::block::DataBlock;
use crate::writer::BlockSet;
use ahash::{AHashMap, AHashSet};
use std::hash::Hash;
use strata_core::{
    align_up, is_aligned, BuildError, Platform, Result, StreamReference,
    UnresolvedReport,
};
use strata_data::StringTable;

/// Counters describing one finalize run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Blocks handed to the resolver.
    pub blocks_in: usize,
    /// Blocks emitted.
    pub blocks_out: usize,
    /// Hashing passes run, the final non-folding pass included.
    pub passes: usize,
    /// Passes that folded at least one block.
    pub folding_passes: usize,
    /// Blocks folded into a canonical block.
    pub folded: usize,
}

/// Folds, places and patches a [`BlockSet`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    verify_hash_matches: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            verify_hash_matches: true,
        }
    }
}

/// The immutable result of a successful finalize run.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    platform: Platform,
    data: Vec<u8>,
    relocations: Vec<usize>,
    locations: AHashMap<StreamReference, usize>,
    patch_sites: AHashMap<StreamReference, Vec<usize>>,
    folded: AHashMap<StreamReference, StreamReference>,
    entry_offset: usize,
    string_table_size: usize,
    stats: ResolveStats,
}

impl ResolvedImage {
    /// Target encoding of the image.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// `[string table][blocks]`, pointers patched to absolute offsets.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Absolute offsets of every patched pointer field, ascending.
    pub fn relocations(&self) -> &[usize] {
        &self.relocations
    }

    /// Final offset of a block, folded block, marker or string.
    pub fn offset_of(&self, reference: StreamReference) -> Option<usize> {
        self.locations.get(&reference).copied()
    }

    /// Absolute offsets of the pointer fields patched to a reference.
    ///
    /// A folded reference reports the sites of its canonical block.
    pub fn patch_sites(&self, reference: StreamReference) -> &[usize] {
        let mut current = reference;
        while let Some(&next) = self.folded.get(&current) {
            current = next;
        }
        self.patch_sites
            .get(&current)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every referenced target with its final offset and patch sites.
    pub fn references(&self) -> impl Iterator<Item = (StreamReference, usize, &[usize])> + '_ {
        self.patch_sites.iter().filter_map(|(&reference, sites)| {
            self.offset_of(reference)
                .map(|offset| (reference, offset, sites.as_slice()))
        })
    }

    /// Offset of the root block.
    pub fn entry_offset(&self) -> usize {
        self.entry_offset
    }

    /// Size of the string table region at offset 0.
    pub fn string_table_size(&self) -> usize {
        self.string_table_size
    }

    /// Counters of the run that produced the image.
    pub fn stats(&self) -> ResolveStats {
        self.stats
    }

    /// Encodes the relocation table: entry offset, count, then each offset,
    /// all pointer-width.
    pub fn relocation_bytes(&self) -> Vec<u8> {
        let width = self.platform.pointer_size();
        let mut out = vec![0u8; width * (2 + self.relocations.len())];
        let fields = std::iter::once(self.entry_offset)
            .chain(std::iter::once(self.relocations.len()))
            .chain(self.relocations.iter().copied());
        for (slot, value) in fields.enumerate() {
            self.platform
                .put_pointer(&mut out[slot * width..], value as u64);
        }
        out
    }
}

enum Target {
    Null,
    At(usize),
    Missing,
}

impl Resolver {
    /// Creates a resolver that verifies content on every hash match.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the byte comparison that backs a hash match.
    ///
    /// Without it, equal hashes alone fold two blocks.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_hash_matches = verify;
        self
    }

    /// Produces the final image. The block set is left untouched.
    ///
    /// Fails with [`BuildError::UnresolvedReferences`] listing every pointer
    /// field whose target is unknown; no image is produced in that case.
    pub fn finalize(&self, strings: &StringTable, set: &BlockSet) -> Result<ResolvedImage> {
        let platform = set.platform();
        let mut live: Vec<DataBlock> = set.blocks().to_vec();
        let mut folded: AHashMap<StreamReference, StreamReference> = AHashMap::new();
        let mut stats = ResolveStats {
            blocks_in: live.len(),
            ..ResolveStats::default()
        };

        loop {
            stats.passes += 1;
            let duplicates = self.find_duplicates(&live);
            if duplicates.is_empty() {
                break;
            }
            stats.folding_passes += 1;
            stats.folded += duplicates.len();
            fold(&platform, &mut live, &duplicates, &mut folded);
            log::debug!(
                "Fold pass {} merged {} block(s), {} left",
                stats.passes,
                duplicates.len(),
                live.len()
            );
        }
        stats.blocks_out = live.len();

        // Placement.
        let string_table_size = strings.region_size();
        let mut locations: AHashMap<StreamReference, usize> = AHashMap::new();
        let mut offset = string_table_size;
        for block in &live {
            offset = align_up(offset, block.alignment);
            debug_assert!(is_aligned(offset, block.alignment));
            locations.insert(block.reference, offset);
            offset += block.size();
        }
        for block in &live {
            let base = locations[&block.reference];
            for &(marker, local) in &block.markers {
                locations.insert(marker, base + local);
            }
        }
        for (index, local) in strings.local_offsets().into_iter().enumerate() {
            locations.insert(StreamReference::string(index as u32), local);
        }
        locations.insert(StreamReference::STRING_TABLE, 0);
        let folded_locations: Vec<(StreamReference, usize)> = folded
            .keys()
            .filter_map(|&duplicate| match lookup(&locations, &folded, duplicate) {
                Target::At(at) => Some((duplicate, at)),
                _ => None,
            })
            .collect();
        locations.extend(folded_locations);

        // Emission.
        let mut data = Vec::with_capacity(offset);
        strings.write_region(&mut data);
        let mut relocations = Vec::new();
        let mut patch_sites: AHashMap<StreamReference, Vec<usize>> = AHashMap::new();
        let mut report = UnresolvedReport::default();
        for block in &live {
            let base = locations[&block.reference];
            data.resize(base, 0);
            data.extend_from_slice(&block.bytes);
            for &(local, target) in &block.outgoing {
                let at = base + local;
                match lookup(&locations, &folded, target) {
                    Target::Null => platform.put_pointer(&mut data[at..], 0),
                    Target::At(resolved) => {
                        platform.put_pointer(&mut data[at..], resolved as u64);
                        relocations.push(at);
                        patch_sites.entry(target).or_default().push(at);
                    }
                    Target::Missing => report.record(target, at),
                }
            }
        }
        if !report.is_empty() {
            return Err(BuildError::UnresolvedReferences(report));
        }
        relocations.sort_unstable();
        for sites in patch_sites.values_mut() {
            sites.sort_unstable();
        }

        let entry_offset = set
            .entry()
            .and_then(|entry| locations.get(&entry).copied())
            .unwrap_or(0);

        log::info!(
            "Resolved {} -> {} blocks in {} pass(es): {} bytes, {} relocations",
            stats.blocks_in,
            stats.blocks_out,
            stats.passes,
            data.len(),
            relocations.len()
        );

        Ok(ResolvedImage {
            platform,
            data,
            relocations,
            locations,
            patch_sites,
            folded,
            entry_offset,
            string_table_size,
            stats,
        })
    }

    /// Pairs every non-canonical block with its canonical block, by live index.
    fn find_duplicates(&self, live: &[DataBlock]) -> Vec<(usize, usize)> {
        group_duplicates(live, self.verify_hash_matches, DataBlock::content_hash)
    }
}

/// Groups blocks by `key`; the first block of a group is canonical.
///
/// With `verify`, a key match folds only when the bytes and outgoing
/// references also match, otherwise both blocks are kept.
fn group_duplicates<K, F>(live: &[DataBlock], verify: bool, key: F) -> Vec<(usize, usize)>
where
    K: Eq + Hash,
    F: Fn(&DataBlock) -> K,
{
    let mut groups: AHashMap<K, Vec<usize>> = AHashMap::new();
    let mut duplicates = Vec::new();
    for (index, block) in live.iter().enumerate() {
        let candidates = groups.entry(key(block)).or_default();
        let canonical = candidates
            .iter()
            .copied()
            .find(|&c| !verify || live[c].same_content(block));
        match canonical {
            Some(canonical) => duplicates.push((index, canonical)),
            None => {
                if !candidates.is_empty() {
                    log::warn!(
                        "Hash collision between {} and {}, keeping both",
                        live[candidates[0]].reference,
                        block.reference
                    );
                }
                candidates.push(index);
            }
        }
    }
    duplicates
}

fn fold(
    platform: &Platform,
    live: &mut Vec<DataBlock>,
    duplicates: &[(usize, usize)],
    folded: &mut AHashMap<StreamReference, StreamReference>,
) {
    let mut redirect: AHashMap<StreamReference, StreamReference> = AHashMap::new();
    let mut removed: AHashSet<usize> = AHashSet::new();
    for &(duplicate, canonical) in duplicates {
        let from = live[duplicate].reference;
        let to = live[canonical].reference;
        let markers = std::mem::take(&mut live[duplicate].markers);
        live[canonical].markers.extend(markers);
        redirect.insert(from, to);
        folded.insert(from, to);
        removed.insert(duplicate);
    }

    for block in live.iter_mut() {
        let targets: Vec<StreamReference> = block
            .outgoing
            .iter()
            .map(|&(_, target)| target)
            .filter(|target| redirect.contains_key(target))
            .collect();
        for target in targets {
            block.replace_reference(platform, target, redirect[&target]);
        }
    }

    let mut index = 0;
    live.retain(|_| {
        let keep = !removed.contains(&index);
        index += 1;
        keep
    });
}

fn lookup(
    locations: &AHashMap<StreamReference, usize>,
    folded: &AHashMap<StreamReference, StreamReference>,
    target: StreamReference,
) -> Target {
    if target.is_null() {
        return Target::Null;
    }
    let mut current = target;
    while let Some(&next) = folded.get(&current) {
        current = next;
    }
    match locations.get(&current) {
        Some(&at) => Target::At(at),
        None => Target::Missing,
    }
}
