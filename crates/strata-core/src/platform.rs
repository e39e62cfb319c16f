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

//! Byte order and pointer width of the target the data is built for.
//!
//! Everything above this module is endian-agnostic: primitives are encoded
//! and decoded exclusively through a [`Platform`] value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte order of every multi-byte value in the produced image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Endian {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

/// Width of a pointer field (and of the length fields stored next to one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointerWidth {
    /// 4-byte offsets.
    Bits32,
    /// 8-byte offsets.
    #[default]
    Bits64,
}

impl PointerWidth {
    /// Size of a pointer field in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }

    /// Parses a width expressed in bits (`32` or `64`).
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(PointerWidth::Bits32),
            64 => Some(PointerWidth::Bits64),
            _ => None,
        }
    }

    /// The width expressed in bits.
    pub const fn bits(self) -> u32 {
        (self.bytes() * 8) as u32
    }
}

/// Encoding strategy of a build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Platform {
    /// Byte order of multi-byte values.
    pub endian: Endian,
    /// Width of pointer and length fields.
    pub pointer_width: PointerWidth,
}

macro_rules! unsigned_codec {
    ($put:ident, $get:ident, $ty:ty, $n:expr) => {
        /// Encodes the value into the first bytes of `dst`.
        ///
        /// # Panics
        ///
        /// Panics if `dst` is shorter than the value.
        pub fn $put(&self, dst: &mut [u8], value: $ty) {
            let bytes = match self.endian {
                Endian::Little => value.to_le_bytes(),
                Endian::Big => value.to_be_bytes(),
            };
            dst[..$n].copy_from_slice(&bytes);
        }

        /// Decodes a value from the first bytes of `src`.
        ///
        /// # Panics
        ///
        /// Panics if `src` is shorter than the value.
        pub fn $get(&self, src: &[u8]) -> $ty {
            let mut bytes = [0u8; $n];
            bytes.copy_from_slice(&src[..$n]);
            match self.endian {
                Endian::Little => <$ty>::from_le_bytes(bytes),
                Endian::Big => <$ty>::from_be_bytes(bytes),
            }
        }
    };
}

impl Platform {
    /// Little-endian target with 64-bit pointers.
    pub const PC: Platform = Platform::new(Endian::Little, PointerWidth::Bits64);
    /// Big-endian target with 32-bit pointers.
    pub const LEGACY32: Platform = Platform::new(Endian::Big, PointerWidth::Bits32);

    /// Creates a platform from its two parameters.
    pub const fn new(endian: Endian, pointer_width: PointerWidth) -> Self {
        Self {
            endian,
            pointer_width,
        }
    }

    /// Size of a pointer field in bytes.
    pub const fn pointer_size(&self) -> usize {
        self.pointer_width.bytes()
    }

    unsigned_codec!(put_u16, get_u16, u16, 2);
    unsigned_codec!(put_u32, get_u32, u32, 4);
    unsigned_codec!(put_u64, get_u64, u64, 8);

    /// Encodes a signed 16-bit value.
    pub fn put_i16(&self, dst: &mut [u8], value: i16) {
        self.put_u16(dst, value as u16);
    }

    /// Encodes a signed 32-bit value.
    pub fn put_i32(&self, dst: &mut [u8], value: i32) {
        self.put_u32(dst, value as u32);
    }

    /// Encodes a signed 64-bit value.
    pub fn put_i64(&self, dst: &mut [u8], value: i64) {
        self.put_u64(dst, value as u64);
    }

    /// Encodes an IEEE-754 single.
    pub fn put_f32(&self, dst: &mut [u8], value: f32) {
        self.put_u32(dst, value.to_bits());
    }

    /// Encodes an IEEE-754 double.
    pub fn put_f64(&self, dst: &mut [u8], value: f64) {
        self.put_u64(dst, value.to_bits());
    }

    /// Decodes a signed 16-bit value.
    pub fn get_i16(&self, src: &[u8]) -> i16 {
        self.get_u16(src) as i16
    }

    /// Decodes a signed 32-bit value.
    pub fn get_i32(&self, src: &[u8]) -> i32 {
        self.get_u32(src) as i32
    }

    /// Decodes a signed 64-bit value.
    pub fn get_i64(&self, src: &[u8]) -> i64 {
        self.get_u64(src) as i64
    }

    /// Decodes an IEEE-754 single.
    pub fn get_f32(&self, src: &[u8]) -> f32 {
        f32::from_bits(self.get_u32(src))
    }

    /// Decodes an IEEE-754 double.
    pub fn get_f64(&self, src: &[u8]) -> f64 {
        f64::from_bits(self.get_u64(src))
    }

    /// Encodes a pointer-width value. On 32-bit targets the value is truncated.
    pub fn put_pointer(&self, dst: &mut [u8], value: u64) {
        match self.pointer_width {
            PointerWidth::Bits32 => self.put_u32(dst, value as u32),
            PointerWidth::Bits64 => self.put_u64(dst, value),
        }
    }

    /// Decodes a pointer-width value.
    pub fn get_pointer(&self, src: &[u8]) -> u64 {
        match self.pointer_width {
            PointerWidth::Bits32 => u64::from(self.get_u32(src)),
            PointerWidth::Bits64 => self.get_u64(src),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endian = match self.endian {
            Endian::Little => "little-endian",
            Endian::Big => "big-endian",
        };
        write!(f, "{endian}/{}-bit", self.pointer_width.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        let mut buf = [0u8; 4];
        Platform::PC.put_u32(&mut buf, 0x0102_0304);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_big_endian_layout() {
        let mut buf = [0u8; 4];
        Platform::LEGACY32.put_u32(&mut buf, 0x0102_0304);
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_pointer_width_controls_pointer_size() {
        let mut buf = [0xFFu8; 8];
        Platform::LEGACY32.put_pointer(&mut buf, 0x10);
        assert_eq!(&buf[..4], &[0, 0, 0, 0x10]);
        assert_eq!(&buf[4..], &[0xFF; 4], "32-bit pointers must not touch trailing bytes");
        assert_eq!(Platform::LEGACY32.get_pointer(&buf), 0x10);
        assert_eq!(Platform::PC.pointer_size(), 8);
    }

    #[test]
    fn test_signed_and_float_values_survive_both_orders() {
        for platform in [Platform::PC, Platform::LEGACY32] {
            let mut buf = [0u8; 8];
            platform.put_i16(&mut buf, -2);
            assert_eq!(platform.get_i16(&buf), -2);
            platform.put_i64(&mut buf, i64::MIN + 7);
            assert_eq!(platform.get_i64(&buf), i64::MIN + 7);
            platform.put_f32(&mut buf, 1.5);
            assert_eq!(platform.get_f32(&buf), 1.5);
            platform.put_f64(&mut buf, -0.25);
            assert_eq!(platform.get_f64(&buf), -0.25);
        }
    }

    #[test]
    fn test_pointer_width_from_bits() {
        assert_eq!(PointerWidth::from_bits(32), Some(PointerWidth::Bits32));
        assert_eq!(PointerWidth::from_bits(64), Some(PointerWidth::Bits64));
        assert_eq!(PointerWidth::from_bits(16), None);
        assert_eq!(Platform::LEGACY32.to_string(), "big-endian/32-bit");
    }
}
