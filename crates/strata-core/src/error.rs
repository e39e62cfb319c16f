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

//! Defines the error type shared by every stage of a data build.

use crate::reference::StreamReference;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used across the pipeline crates.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Every way a build can fail. A failed build never yields partial output.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A primitive was written at an offset not aligned to its width.
    #[error("misaligned write at offset {offset} (requires {alignment}-byte alignment)")]
    AlignmentViolation {
        /// Offset of the write inside its block.
        offset: usize,
        /// Required alignment.
        alignment: usize,
    },

    /// A block reference was registered twice, or a reserved reference was registered.
    #[error("block {0} is already registered")]
    DuplicateBlockRegistration(StreamReference),

    /// A block operation named a reference that was never registered.
    #[error("block {0} was never registered")]
    UnknownBlock(StreamReference),

    /// A write was attempted while no block was open.
    #[error("no block is open")]
    NoOpenBlock,

    /// A block was opened, or the writer finished, while another block was still open.
    #[error("block {0} is still open")]
    BlockAlreadyOpen(StreamReference),

    /// A closed block was opened again.
    #[error("block {0} is already closed")]
    BlockClosed(StreamReference),

    /// A write would run past the fixed size of its block.
    #[error("write of {requested} bytes overflows block {reference} of size {size}")]
    BlockOverflow {
        /// The block being written.
        reference: StreamReference,
        /// Fixed size of the block, or of the struct being written.
        size: usize,
        /// End offset the write would have reached, from the same start.
        requested: usize,
    },

    /// The same marker reference was placed twice.
    #[error("marker {0} is already placed")]
    DuplicateMarker(StreamReference),

    /// Some references could not be resolved to an offset.
    #[error("{0}")]
    UnresolvedReferences(UnresolvedReport),

    /// The source object graph references itself.
    #[error("cyclic member graph: {}", .path.join(" -> "))]
    CyclicMemberGraph {
        /// Object names from the outermost object to the repeated one.
        path: Vec<String>,
    },

    /// A member record is inconsistent with its kind.
    #[error("invalid member #{index}: {reason}")]
    InvalidMember {
        /// Index of the record in the member model.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Flushing the finished image to its destination failed.
    #[error("failed to write '{}'", .path.display())]
    SinkFailure {
        /// Destination that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Shorthand for [`BuildError::InvalidMember`].
    pub fn invalid_member(index: usize, reason: impl Into<String>) -> Self {
        BuildError::InvalidMember {
            index,
            reason: reason.into(),
        }
    }
}

/// One reference that no block, marker or string could satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedEntry {
    /// The missing target.
    pub target: StreamReference,
    /// Absolute image offsets of the pointer fields that named it.
    pub referenced_from: Vec<usize>,
}

/// Every unresolved reference found by a single finalize run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnresolvedReport {
    /// One entry per missing target, in first-seen order.
    pub entries: Vec<UnresolvedEntry>,
}

impl UnresolvedReport {
    /// Records that the field at `offset` points at `target`.
    pub fn record(&mut self, target: StreamReference, offset: usize) {
        match self.entries.iter_mut().find(|e| e.target == target) {
            Some(entry) => entry.referenced_from.push(offset),
            None => self.entries.push(UnresolvedEntry {
                target,
                referenced_from: vec![offset],
            }),
        }
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct missing targets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for UnresolvedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unresolved reference(s):", self.entries.len())?;
        for entry in &self.entries {
            let sites: Vec<String> = entry
                .referenced_from
                .iter()
                .map(|offset| format!("{offset:#x}"))
                .collect();
            write!(f, " {} (from {})", entry.target, sites.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_groups_sites_per_target() {
        let mut report = UnresolvedReport::default();
        let missing = StreamReference::from_raw(5);
        report.record(missing, 0x10);
        report.record(StreamReference::from_raw(6), 0x18);
        report.record(missing, 0x20);

        assert_eq!(report.len(), 2);
        assert_eq!(report.entries[0].referenced_from, vec![0x10, 0x20]);
        assert_eq!(
            report.to_string(),
            "2 unresolved reference(s): ref#5 (from 0x10, 0x20) ref#6 (from 0x18)"
        );
    }

    #[test]
    fn test_cycle_message_lists_path() {
        let err = BuildError::CyclicMemberGraph {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic member graph: a -> b -> a");
    }
}
