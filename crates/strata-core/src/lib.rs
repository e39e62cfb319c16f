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

//! The foundational crate of the Strata data pipeline.
//!
//! `strata-core` holds the vocabulary every other crate speaks: the target
//! [`Platform`] (byte order and pointer width), symbolic [`StreamReference`]s,
//! the [`ContentHash`] used to fold identical blocks, alignment helpers, the
//! [`ValueStruct`] contract for values that serialize themselves, and the
//! shared [`BuildError`] type.

#![warn(missing_docs)]

pub mod align;
pub mod error;
pub mod hash;
pub mod platform;
pub mod reference;
pub mod value_struct;

pub use align::{align_up, is_aligned};
pub use error::{BuildError, Result, UnresolvedEntry, UnresolvedReport};
pub use hash::{ContentHash, ContentHasher};
pub use platform::{Endian, Platform, PointerWidth};
pub use reference::{ReferenceAllocator, StreamReference};
pub use value_struct::{StructSink, ValueStruct};
