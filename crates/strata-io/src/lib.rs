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

//! Writing and finalizing Strata data images.
//!
//! A [`BuildContext`] collects the member model of one build. The
//! [`MemberSerializer`] turns it into a [`BlockSet`], the [`Resolver`] folds
//! identical blocks and patches every pointer into a [`ResolvedImage`], and an
//! [`ImageSink`] flushes that image as a data file plus a relocation file.

#![warn(missing_docs)]

pub mod block;
pub mod context;
pub mod reader;
pub mod resolver;
pub mod serializer;
pub mod sink;
pub mod writer;

pub use block::DataBlock;
pub use context::BuildContext;
pub use reader::{ImageReader, ReadError, RelocationTable};
pub use resolver::{ResolveStats, ResolvedImage, Resolver};
pub use serializer::MemberSerializer;
pub use sink::{FileSink, ImageSink, MemorySink};
pub use writer::{BlockSet, BlockWriter};
