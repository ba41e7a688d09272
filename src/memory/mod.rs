//! Memory model for the evaluator
//!
//! This module provides the core memory abstractions:
//! - [`value`]: literals, type descriptors and coercion
//! - [`codec`]: little-endian encoding of numeric values into heap cells
//! - [`heap`]: the fixed-size Heap Store
//! - [`allocator`]: free-list `malloc`/`free` with selectable fit strategy
//! - [`blocks`]: block reconstruction from raw heap bytes
//!
//! # Type Sizes
//!
//! Sizes are fixed and platform independent:
//! - `intN_t` / `uintN_t`: N / 8 bytes
//! - `double`: 8 bytes
//! - pointer: 1 byte (the heap never exceeds 256 cells)
//!
//! # Pointer Arithmetic
//!
//! Pointer arithmetic is scaled by pointee size:
//! ```text
//! ptr + n  →  ptr + (n * sizeof(*ptr))
//! ```
//!
//! [`pointer_add`] and [`pointer_diff`] handle the scaling. A `void*` scales
//! by one byte.

pub mod allocator;
pub mod blocks;
pub mod codec;
pub mod heap;
pub mod value;

use value::TypeDescriptor;

/// Bytes one step of a pointer of type `ty` moves
pub fn pointee_width(ty: TypeDescriptor) -> usize {
    ty.pointee()
        .and_then(|pointee| pointee.byte_width())
        .unwrap_or(1)
}

/// Perform pointer arithmetic: addr + offset (scaled by pointee size)
pub fn pointer_add(addr: i128, offset: i128, ty: TypeDescriptor) -> i128 {
    addr.wrapping_add(offset.wrapping_mul(pointee_width(ty) as i128))
}

/// Calculate the difference between two pointers (in elements, not bytes)
pub fn pointer_diff(left: i128, right: i128, ty: TypeDescriptor) -> i128 {
    left.wrapping_sub(right).div_euclid(pointee_width(ty) as i128)
}

#[cfg(test)]
mod tests {
    use super::value::TypeKind;
    use super::*;

    #[test]
    fn test_scaled_arithmetic() {
        let ints = TypeDescriptor::pointer_to(TypeKind::Int32);
        assert_eq!(pointer_add(4, 2, ints), 12);
        assert_eq!(pointer_add(12, -1, ints), 8);
        assert_eq!(pointer_diff(12, 4, ints), 2);

        let bytes = TypeDescriptor::pointer_to(TypeKind::Void);
        assert_eq!(pointer_add(4, 3, bytes), 7);
    }
}
