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

//! Alignment arithmetic shared by the layout rules, the writer and the resolver.

/// Rounds `value` up to the next multiple of `alignment`.
///
/// An alignment of 0 or 1 leaves the value untouched.
pub const fn align_up(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

/// Returns `true` if `value` is a multiple of `alignment`.
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    alignment <= 1 || value % alignment == 0
}

/// Number of zero bytes needed to bring `value` to `alignment`.
pub const fn padding_for(value: usize, alignment: usize) -> usize {
    align_up(value, alignment) - value
}
