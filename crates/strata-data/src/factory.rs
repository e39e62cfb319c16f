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

//! The entry points an object-graph walker uses to populate a [`MemberModel`].
//!
//! A walker calls one `new_*_member` per value it discovers. For composites it
//! first adds the composite itself, then adds all direct children in one
//! contiguous run, and finally records that run with
//! [`MemberFactory::close_composite`].

use crate::kind::Kind;
use crate::member::{MemberModel, Payload};
use crate::strings::StringTable;
use ahash::AHashSet;
use std::sync::Arc;
use strata_core::{BuildError, Result, ValueStruct};

macro_rules! primitive_member {
    ($fn_name:ident, $ty:ty, $kind:ident) => {
        #[doc = concat!("Adds a `", stringify!($ty), "` member.")]
        pub fn $fn_name(&mut self, value: $ty, name: &str) -> usize {
            self.model
                .add_member(Kind::$kind, name, 0, 0, Payload::$kind(value))
        }
    };
}

/// Mutable access to the member model and string table of one build.
pub struct MemberFactory<'a> {
    model: &'a mut MemberModel,
    strings: &'a mut StringTable,
}

impl<'a> MemberFactory<'a> {
    /// Wraps the model and string table being populated.
    pub fn new(model: &'a mut MemberModel, strings: &'a mut StringTable) -> Self {
        Self { model, strings }
    }

    /// Index the next added member will get.
    pub fn next_index(&self) -> usize {
        self.model.len()
    }

    /// Adds a boolean member.
    pub fn new_bool_member(&mut self, value: bool, name: &str) -> usize {
        self.model
            .add_member(Kind::Bool, name, 0, 0, Payload::Bool(value))
    }

    primitive_member!(new_int8_member, i8, Int8);
    primitive_member!(new_uint8_member, u8, Uint8);
    primitive_member!(new_int16_member, i16, Int16);
    primitive_member!(new_uint16_member, u16, Uint16);
    primitive_member!(new_int32_member, i32, Int32);
    primitive_member!(new_uint32_member, u32, Uint32);
    primitive_member!(new_int64_member, i64, Int64);
    primitive_member!(new_uint64_member, u64, Uint64);
    primitive_member!(new_float32_member, f32, Float32);
    primitive_member!(new_float64_member, f64, Float64);

    /// Interns `value` and adds a string member pointing at it.
    pub fn new_string_member(&mut self, value: &str, name: &str) -> usize {
        let index = self.strings.add(value);
        self.model
            .add_member(Kind::String, name, 0, 0, Payload::String(index))
    }

    /// Adds an enumerator member.
    pub fn new_enum_member(&mut self, type_name: &str, value: u32, name: &str) -> usize {
        self.model.add_member(
            Kind::Enum,
            name,
            0,
            0,
            Payload::Enum {
                type_name: type_name.to_owned(),
                value,
            },
        )
    }

    /// Adds a self-describing value.
    pub fn new_struct_member(&mut self, value: Arc<dyn ValueStruct>, name: &str) -> usize {
        self.model
            .add_member(Kind::Struct, name, 0, 0, Payload::Struct(value))
    }

    /// Adds a class member. Its members must be closed with [`Self::close_composite`].
    pub fn new_class_member(&mut self, type_name: &str, name: &str) -> usize {
        self.model.add_member(
            Kind::Class,
            name,
            0,
            0,
            Payload::Class {
                type_name: type_name.to_owned(),
            },
        )
    }

    /// Adds an array member. Its elements must be closed with [`Self::close_composite`].
    pub fn new_array_member(&mut self, name: &str) -> usize {
        self.model.add_member(Kind::Array, name, 0, 0, Payload::None)
    }

    /// Adds a dictionary member.
    ///
    /// Its keys, then its values, must be added contiguously and closed with
    /// [`Self::close_composite`] using the number of pairs as `count`.
    pub fn new_dictionary_member(&mut self, name: &str) -> usize {
        self.model
            .add_member(Kind::Dictionary, name, 0, 0, Payload::None)
    }

    /// Records the child range of a composite added earlier.
    pub fn close_composite(&mut self, index: usize, start: usize, count: usize) -> Result<()> {
        let kind = self.model.member(index)?.kind;
        if !kind.is_composite() {
            return Err(BuildError::invalid_member(
                index,
                format!("{kind:?} has no children"),
            ));
        }
        self.model.update_range(index, start, count)
    }

    /// The model being populated.
    pub fn model(&self) -> &MemberModel {
        self.model
    }

    /// The string table being populated.
    pub fn strings(&self) -> &StringTable {
        self.strings
    }
}

/// Tracks the objects on the current walk path to reject cyclic graphs.
#[derive(Debug, Default)]
pub struct CycleGuard {
    path: Vec<String>,
    on_path: AHashSet<String>,
}

impl CycleGuard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an object onto the path.
    ///
    /// Fails with [`BuildError::CyclicMemberGraph`] if it is already on it.
    pub fn enter(&mut self, identity: &str) -> Result<()> {
        if !self.on_path.insert(identity.to_owned()) {
            let mut path = self.path.clone();
            path.push(identity.to_owned());
            return Err(BuildError::CyclicMemberGraph { path });
        }
        self.path.push(identity.to_owned());
        Ok(())
    }

    /// Pops the innermost object.
    pub fn leave(&mut self) {
        if let Some(identity) = self.path.pop() {
            self.on_path.remove(&identity);
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}
