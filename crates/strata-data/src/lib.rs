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

//! Data descriptions for a Strata build.
//!
//! This crate owns the flat [`MemberModel`] an object-graph walker produces,
//! the [`StringTable`] interning every string of the build, and the
//! [`layout`] rules that pack, order and size members before writing.

#![warn(missing_docs)]

pub mod factory;
pub mod file_id;
pub mod kind;
pub mod layout;
pub mod member;
pub mod strings;

pub use factory::{CycleGuard, MemberFactory};
pub use file_id::FileId;
pub use kind::Kind;
pub use layout::{
    combine_booleans, default_member_order, prepare_layout, sort_members, LayoutRules,
};
pub use member::{MemberModel, MemberRecord, Payload};
pub use strings::StringTable;
