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

//! Built-in value struct identifying another compiled data file.

use strata_core::{Result, StructSink, ValueStruct};

/// Index of a data file in the build, stored as a 64-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub i64);

impl ValueStruct for FileId {
    fn struct_size(&self) -> usize {
        8
    }

    fn struct_align(&self) -> usize {
        8
    }

    fn struct_name(&self) -> &str {
        "fileid_t"
    }

    fn write_struct(&self, sink: &mut dyn StructSink) -> Result<()> {
        sink.put_i64(self.0)
    }
}
