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

//! The contract for values that lay themselves out.
//!
//! A [`ValueStruct`] bypasses generic member decomposition: it declares a
//! fixed size and alignment and writes its own bytes through a [`StructSink`].

use crate::error::Result;
use crate::platform::Platform;
use std::fmt;

/// Destination of a [`ValueStruct::write_struct`] call.
///
/// Unlike the block writer, a sink never aligns on its own: every typed put
/// checks that the cursor is already aligned to the value's width and fails
/// with [`BuildError::AlignmentViolation`](crate::BuildError::AlignmentViolation)
/// otherwise.
pub trait StructSink {
    /// Encoding of the build target.
    fn platform(&self) -> Platform;

    /// Cursor position inside the enclosing block.
    fn position(&self) -> usize;

    /// Writes `bytes` at the cursor after checking it is aligned to `alignment`.
    fn put_raw(&mut self, bytes: &[u8], alignment: usize) -> Result<()>;

    /// Writes `count` zero bytes.
    fn pad(&mut self, count: usize) -> Result<()> {
        const ZEROS: [u8; 16] = [0; 16];
        let mut left = count;
        while left > 0 {
            let chunk = left.min(ZEROS.len());
            self.put_raw(&ZEROS[..chunk], 1)?;
            left -= chunk;
        }
        Ok(())
    }

    /// Writes a boolean as one byte.
    fn put_bool(&mut self, value: bool) -> Result<()> {
        self.put_raw(&[u8::from(value)], 1)
    }

    /// Writes a signed byte.
    fn put_i8(&mut self, value: i8) -> Result<()> {
        self.put_raw(&value.to_ne_bytes(), 1)
    }

    /// Writes an unsigned byte.
    fn put_u8(&mut self, value: u8) -> Result<()> {
        self.put_raw(&[value], 1)
    }

    /// Writes a 16-bit integer.
    fn put_i16(&mut self, value: i16) -> Result<()> {
        let mut buf = [0u8; 2];
        self.platform().put_i16(&mut buf, value);
        self.put_raw(&buf, 2)
    }

    /// Writes an unsigned 16-bit integer.
    fn put_u16(&mut self, value: u16) -> Result<()> {
        let mut buf = [0u8; 2];
        self.platform().put_u16(&mut buf, value);
        self.put_raw(&buf, 2)
    }

    /// Writes a 32-bit integer.
    fn put_i32(&mut self, value: i32) -> Result<()> {
        let mut buf = [0u8; 4];
        self.platform().put_i32(&mut buf, value);
        self.put_raw(&buf, 4)
    }

    /// Writes an unsigned 32-bit integer.
    fn put_u32(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        self.platform().put_u32(&mut buf, value);
        self.put_raw(&buf, 4)
    }

    /// Writes a 64-bit integer.
    fn put_i64(&mut self, value: i64) -> Result<()> {
        let mut buf = [0u8; 8];
        self.platform().put_i64(&mut buf, value);
        self.put_raw(&buf, 8)
    }

    /// Writes an unsigned 64-bit integer.
    fn put_u64(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        self.platform().put_u64(&mut buf, value);
        self.put_raw(&buf, 8)
    }

    /// Writes a single-precision float.
    fn put_f32(&mut self, value: f32) -> Result<()> {
        let mut buf = [0u8; 4];
        self.platform().put_f32(&mut buf, value);
        self.put_raw(&buf, 4)
    }

    /// Writes a double-precision float.
    fn put_f64(&mut self, value: f64) -> Result<()> {
        let mut buf = [0u8; 8];
        self.platform().put_f64(&mut buf, value);
        self.put_raw(&buf, 8)
    }
}

/// A value with its own fixed binary layout.
pub trait ValueStruct: fmt::Debug + Send + Sync {
    /// Size of the value in bytes.
    fn struct_size(&self) -> usize;

    /// Required alignment in bytes.
    fn struct_align(&self) -> usize;

    /// Type name used in listings and code generation.
    fn struct_name(&self) -> &str;

    /// Writes at most [`struct_size`](ValueStruct::struct_size) bytes; the remainder stays zero.
    fn write_struct(&self, sink: &mut dyn StructSink) -> Result<()>;
}
