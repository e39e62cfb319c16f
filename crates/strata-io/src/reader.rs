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

//! Read access to a finished image, the way a loader sees it.

use strata_core::Platform;
use thiserror::Error;

/// An error decoding an image or a relocation table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadError {
    /// A read ran past the end of the buffer.
    #[error("read of {len} bytes at {offset:#x} runs past the end ({size} bytes)")]
    OutOfBounds {
        /// Start of the read.
        offset: usize,
        /// Bytes requested.
        len: usize,
        /// Size of the buffer.
        size: usize,
    },
    /// A string field does not point at UTF-8 text.
    #[error("string at {offset:#x} is not valid UTF-8")]
    InvalidUtf8 {
        /// Offset of the string bytes.
        offset: usize,
    },
    /// The relocation table header disagrees with its length.
    #[error("relocation table declares {declared} entries but holds {actual}")]
    TruncatedRelocations {
        /// Count found in the header.
        declared: u64,
        /// Entries actually present.
        actual: usize,
    },
}

/// Decoded relocation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationTable {
    /// Offset of the root block.
    pub entry_offset: u64,
    /// Patched pointer positions.
    pub offsets: Vec<u64>,
}

impl RelocationTable {
    /// Parses `[entry][count][offsets...]`, all pointer-width.
    pub fn parse(platform: Platform, bytes: &[u8]) -> Result<Self, ReadError> {
        let reader = ImageReader::new(platform, bytes);
        let width = platform.pointer_size();
        let entry_offset = reader.read_pointer(0)?;
        let declared = reader.read_pointer(width)?;
        let actual = bytes.len() / width - 2;
        if declared != actual as u64 {
            return Err(ReadError::TruncatedRelocations { declared, actual });
        }
        let offsets = (0..actual)
            .map(|i| reader.read_pointer((i + 2) * width))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            entry_offset,
            offsets,
        })
    }
}

/// Typed reads at absolute offsets of an image.
#[derive(Debug, Clone, Copy)]
pub struct ImageReader<'a> {
    platform: Platform,
    data: &'a [u8],
}

impl<'a> ImageReader<'a> {
    /// Wraps an image produced for `platform`.
    pub fn new(platform: Platform, data: &'a [u8]) -> Self {
        Self { platform, data }
    }

    /// Borrows `len` bytes at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], ReadError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(ReadError::OutOfBounds {
                offset,
                len,
                size: self.data.len(),
            })
    }

    /// Reads a byte.
    pub fn read_u8(&self, offset: usize) -> Result<u8, ReadError> {
        Ok(self.bytes(offset, 1)?[0])
    }

    /// Reads a signed byte.
    pub fn read_i8(&self, offset: usize) -> Result<i8, ReadError> {
        Ok(self.read_u8(offset)? as i8)
    }

    /// Reads a boolean byte.
    pub fn read_bool(&self, offset: usize) -> Result<bool, ReadError> {
        Ok(self.read_u8(offset)? != 0)
    }

    /// Reads bit `bit` of the bitset byte at `offset`.
    pub fn read_bitset(&self, offset: usize, bit: u8) -> Result<bool, ReadError> {
        Ok(self.read_u8(offset)? & (1 << bit) != 0)
    }

    /// Reads a `u16`.
    pub fn read_u16(&self, offset: usize) -> Result<u16, ReadError> {
        Ok(self.platform.get_u16(self.bytes(offset, 2)?))
    }

    /// Reads an `i16`.
    pub fn read_i16(&self, offset: usize) -> Result<i16, ReadError> {
        Ok(self.platform.get_i16(self.bytes(offset, 2)?))
    }

    /// Reads a `u32`.
    pub fn read_u32(&self, offset: usize) -> Result<u32, ReadError> {
        Ok(self.platform.get_u32(self.bytes(offset, 4)?))
    }

    /// Reads an `i32`.
    pub fn read_i32(&self, offset: usize) -> Result<i32, ReadError> {
        Ok(self.platform.get_i32(self.bytes(offset, 4)?))
    }

    /// Reads a `u64`.
    pub fn read_u64(&self, offset: usize) -> Result<u64, ReadError> {
        Ok(self.platform.get_u64(self.bytes(offset, 8)?))
    }

    /// Reads an `i64`.
    pub fn read_i64(&self, offset: usize) -> Result<i64, ReadError> {
        Ok(self.platform.get_i64(self.bytes(offset, 8)?))
    }

    /// Reads an `f32`.
    pub fn read_f32(&self, offset: usize) -> Result<f32, ReadError> {
        Ok(self.platform.get_f32(self.bytes(offset, 4)?))
    }

    /// Reads an `f64`.
    pub fn read_f64(&self, offset: usize) -> Result<f64, ReadError> {
        Ok(self.platform.get_f64(self.bytes(offset, 8)?))
    }

    /// Reads a pointer-width value.
    pub fn read_pointer(&self, offset: usize) -> Result<u64, ReadError> {
        let width = self.platform.pointer_size();
        Ok(self.platform.get_pointer(self.bytes(offset, width)?))
    }

    /// Reads a `(pointer, count)` pair, as stored for arrays, dictionaries and strings.
    pub fn read_array_header(&self, offset: usize) -> Result<(u64, u64), ReadError> {
        let width = self.platform.pointer_size();
        Ok((self.read_pointer(offset)?, self.read_pointer(offset + width)?))
    }

    /// Follows the string field at `offset` and returns its text.
    pub fn read_string(&self, offset: usize) -> Result<&'a str, ReadError> {
        let (pointer, len) = self.read_array_header(offset)?;
        let start = pointer as usize;
        let bytes = self.bytes(start, len as usize)?;
        std::str::from_utf8(bytes).map_err(|_| ReadError::InvalidUtf8 { offset: start })
    }

    /// Non-empty NUL-terminated strings in the first `size` bytes, in order.
    pub fn string_table(&self, size: usize) -> Result<Vec<&'a str>, ReadError> {
        let region = self.bytes(0, size)?;
        let mut strings = Vec::new();
        let mut start = 0;
        for (at, &byte) in region.iter().enumerate() {
            if byte == 0 {
                if at > start {
                    let text = std::str::from_utf8(&region[start..at])
                        .map_err(|_| ReadError::InvalidUtf8 { offset: start })?;
                    strings.push(text);
                }
                start = at + 1;
            }
        }
        Ok(strings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_is_an_error() {
        let data = [1u8, 2, 3];
        let reader = ImageReader::new(Platform::PC, &data);
        assert_eq!(reader.read_u8(2), Ok(3));
        assert_eq!(
            reader.read_u32(0),
            Err(ReadError::OutOfBounds {
                offset: 0,
                len: 4,
                size: 3
            })
        );
    }

    #[test]
    fn test_bitset_bits() {
        let data = [0b0000_0101u8];
        let reader = ImageReader::new(Platform::PC, &data);
        assert!(reader.read_bitset(0, 0).unwrap());
        assert!(!reader.read_bitset(0, 1).unwrap());
        assert!(reader.read_bitset(0, 2).unwrap());
    }

    #[test]
    fn test_relocation_table_roundtrip_header() {
        let platform = Platform::PC;
        let mut bytes = vec![0u8; 32];
        platform.put_pointer(&mut bytes[0..], 16);
        platform.put_pointer(&mut bytes[8..], 2);
        platform.put_pointer(&mut bytes[16..], 16);
        platform.put_pointer(&mut bytes[24..], 24);
        let table = RelocationTable::parse(platform, &bytes).unwrap();
        assert_eq!(table.entry_offset, 16);
        assert_eq!(table.offsets, vec![16, 24]);

        platform.put_pointer(&mut bytes[8..], 5);
        assert!(matches!(
            RelocationTable::parse(platform, &bytes),
            Err(ReadError::TruncatedRelocations { declared: 5, actual: 2 })
        ));
    }
}
