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


//! Turns a [`Document`] into members of a [`MemberFactory`].
//!
//! Each composite's direct children are added as one contiguous run before
//! any of them is descended into, which is the shape the member model expects.

use crate::document::{Document, Value};
use anyhow::{bail, Result};
use std::sync::Arc;
use strata_data::{CycleGuard, FileId, Kind, MemberFactory};

/// A composite added to the model whose children are still to be walked.
struct Pending<'d> {
    index: usize,
    value: &'d Value,
    object: Option<&'d str>,
}

/// Walks one document, resolving references through its object table.
pub struct DocumentWalker<'d> {
    document: &'d Document,
    guard: CycleGuard,
}

impl<'d> DocumentWalker<'d> {
    /// Prepares a walk over `document`.
    pub fn new(document: &'d Document) -> Self {
        Self {
            document,
            guard: CycleGuard::new(),
        }
    }

    /// Adds the whole document and returns the root class index.
    pub fn walk(&mut self, factory: &mut MemberFactory<'_>) -> Result<usize> {
        let document = self.document;
        let (root, object) = self.resolve(&document.root)?;
        let Value::Class(type_name, _) = root else {
            bail!("document root must be a class, found {:?}", root.kind());
        };
        let index = factory.new_class_member(type_name, "root");
        self.descend(
            factory,
            Pending {
                index,
                value: root,
                object,
            },
        )?;
        log::debug!("Walked document into {} members", factory.next_index());
        Ok(index)
    }

    fn descend(&mut self, factory: &mut MemberFactory<'_>, pending: Pending<'d>) -> Result<()> {
        if let Some(object) = pending.object {
            self.guard.enter(object)?;
        }
        self.fill(factory, pending.index, pending.value)?;
        if pending.object.is_some() {
            self.guard.leave();
        }
        Ok(())
    }

    fn fill(&mut self, factory: &mut MemberFactory<'_>, index: usize, value: &'d Value) -> Result<()> {
        let children: Vec<(&'d str, &'d Value)> = match value {
            Value::Class(_, fields) => fields.iter().map(|(n, v)| (n.as_str(), v)).collect(),
            Value::Array(items) => {
                self.check_homogeneous(items.iter(), "array elements")?;
                items.iter().map(|v| ("", v)).collect()
            }
            Value::Dict(pairs) => {
                self.check_homogeneous(pairs.iter().map(|(k, _)| k), "dictionary keys")?;
                self.check_homogeneous(pairs.iter().map(|(_, v)| v), "dictionary values")?;
                pairs
                    .iter()
                    .map(|(k, _)| ("", k))
                    .chain(pairs.iter().map(|(_, v)| ("", v)))
                    .collect()
            }
            _ => return Ok(()),
        };
        let count = match value {
            Value::Dict(pairs) => pairs.len(),
            _ => children.len(),
        };

        let start = factory.next_index();
        let mut composites = Vec::new();
        for (name, child) in children {
            if let Some(pending) = self.add(factory, child, name)? {
                composites.push(pending);
            }
        }
        factory.close_composite(index, start, count)?;

        for pending in composites {
            self.descend(factory, pending)?;
        }
        Ok(())
    }

    /// Adds one member and returns it if its children are still to be walked.
    fn add(
        &mut self,
        factory: &mut MemberFactory<'_>,
        value: &'d Value,
        name: &str,
    ) -> Result<Option<Pending<'d>>> {
        let (value, object) = self.resolve(value)?;
        let index = match value {
            Value::Bool(v) => factory.new_bool_member(*v, name),
            Value::I8(v) => factory.new_int8_member(*v, name),
            Value::U8(v) => factory.new_uint8_member(*v, name),
            Value::I16(v) => factory.new_int16_member(*v, name),
            Value::U16(v) => factory.new_uint16_member(*v, name),
            Value::I32(v) => factory.new_int32_member(*v, name),
            Value::U32(v) => factory.new_uint32_member(*v, name),
            Value::I64(v) => factory.new_int64_member(*v, name),
            Value::U64(v) => factory.new_uint64_member(*v, name),
            Value::F32(v) => factory.new_float32_member(*v, name),
            Value::F64(v) => factory.new_float64_member(*v, name),
            Value::Str(v) => factory.new_string_member(v, name),
            Value::Enum(type_name, v) => factory.new_enum_member(type_name, *v, name),
            Value::FileId(v) => factory.new_struct_member(Arc::new(FileId(*v)), name),
            Value::Class(type_name, _) => factory.new_class_member(type_name, name),
            Value::Array(_) => factory.new_array_member(name),
            Value::Dict(_) => factory.new_dictionary_member(name),
            Value::Ref(name) => bail!("unresolved reference '{name}'"),
        };
        let composite = matches!(value, Value::Class(..) | Value::Array(_) | Value::Dict(_));
        Ok(composite.then_some(Pending {
            index,
            value,
            object,
        }))
    }

    /// Follows references to a concrete value, with the name of the last object hit.
    fn resolve(&self, value: &'d Value) -> Result<(&'d Value, Option<&'d str>)> {
        let mut current = value;
        let mut object = None;
        let mut chain: Vec<&'d str> = Vec::new();
        while let Value::Ref(name) = current {
            if chain.contains(&name.as_str()) {
                chain.push(name);
                bail!("reference chain loops: {}", chain.join(" -> "));
            }
            chain.push(name);
            let Some((key, target)) = self.document.objects.get_key_value(name.as_str()) else {
                bail!("reference to unknown object '{name}'");
            };
            object = Some(key.as_str());
            current = target;
        }
        Ok((current, object))
    }

    fn check_homogeneous(&self, values: impl Iterator<Item = &'d Value>, what: &str) -> Result<()> {
        let mut expected: Option<Kind> = None;
        for value in values {
            let kind = self.resolve(value)?.0.kind();
            match expected {
                None => expected = kind,
                Some(first) if kind != Some(first) => {
                    bail!("{what} mix {first:?} and {kind:?}");
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
