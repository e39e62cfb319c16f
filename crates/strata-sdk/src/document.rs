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


//! The RON source format compiled by Strata.
//!
//! ```ron
//! Document(
//!   root: Class("Root", [("enabled", Bool(true)), ("enemy", Ref("goblin"))]),
//!   objects: { "goblin": Class("Enemy", [("hp", I32(10))]) },
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use strata_data::Kind;

/// One value of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A boolean, packed into a bitset inside classes.
    Bool(bool),
    /// An `i8`.
    I8(i8),
    /// A `u8`.
    U8(u8),
    /// An `i16`.
    I16(i16),
    /// A `u16`.
    U16(u16),
    /// An `i32`.
    I32(i32),
    /// A `u32`.
    U32(u32),
    /// An `i64`.
    I64(i64),
    /// A `u64`.
    U64(u64),
    /// An `f32`.
    F32(f32),
    /// An `f64`.
    F64(f64),
    /// Interned text.
    Str(String),
    /// An enumerator of the named type, stored as its `u32` value.
    Enum(String, u32),
    /// A persistent file identifier.
    FileId(i64),
    /// An instance of the named class type with ordered fields.
    Class(String, Vec<(String, Value)>),
    /// A homogeneous sequence.
    Array(Vec<Value>),
    /// Homogeneous keys paired with homogeneous values.
    Dict(Vec<(Value, Value)>),
    /// The named entry of [`Document::objects`].
    Ref(String),
}

impl Value {
    /// Member kind this value becomes. `None` for references.
    pub fn kind(&self) -> Option<Kind> {
        let kind = match self {
            Value::Bool(_) => Kind::Bool,
            Value::I8(_) => Kind::Int8,
            Value::U8(_) => Kind::Uint8,
            Value::I16(_) => Kind::Int16,
            Value::U16(_) => Kind::Uint16,
            Value::I32(_) => Kind::Int32,
            Value::U32(_) => Kind::Uint32,
            Value::I64(_) => Kind::Int64,
            Value::U64(_) => Kind::Uint64,
            Value::F32(_) => Kind::Float32,
            Value::F64(_) => Kind::Float64,
            Value::Str(_) => Kind::String,
            Value::Enum(..) => Kind::Enum,
            Value::FileId(_) => Kind::Struct,
            Value::Class(..) => Kind::Class,
            Value::Array(_) => Kind::Array,
            Value::Dict(_) => Kind::Dictionary,
            Value::Ref(_) => return None,
        };
        Some(kind)
    }
}

/// A root class plus the named objects it may reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The value written behind the root block. Must be a class.
    pub root: Value,
    /// Shared objects, addressed by [`Value::Ref`].
    #[serde(default)]
    pub objects: BTreeMap<String, Value>,
}

impl Document {
    /// Creates a document without shared objects.
    pub fn new(root: Value) -> Self {
        Self {
            root,
            objects: BTreeMap::new(),
        }
    }

    /// Parses RON text.
    pub fn from_ron(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Reads and parses a RON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read document '{}'", path.display()))?;
        Self::from_ron(&text)
            .with_context(|| format!("Failed to parse RON from '{}'", path.display()))
    }

    /// Pretty-printed RON.
    pub fn to_ron(&self) -> anyhow::Result<String> {
        let config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, config)?)
    }
}
