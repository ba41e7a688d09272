// Constants for the heap layout

/// Cells 0..RESERVED_CELLS never belong to a block
pub const RESERVED_CELLS: usize = 3;

/// Heap size used when none is configured
pub const DEFAULT_HEAP_SIZE: usize = 64;

/// Smallest heap that still fits one minimal block after the reserved cells
pub const MIN_HEAP_SIZE: usize = 8;

/// Pointers are single bytes, so no cell may sit above 255
pub const MAX_HEAP_SIZE: usize = 256;

/// Leading length cell of every block
pub const HEADER_BYTES: usize = 1;

/// Trailing sentinel cell of every block
pub const GUARD_BYTES: usize = 1;

pub const BLOCK_OVERHEAD: usize = HEADER_BYTES + GUARD_BYTES;

/// A block needs its header, its guard and at least one payload cell
pub const MIN_BLOCK_SIZE: usize = BLOCK_OVERHEAD + 1;

/// Magic value written into the last cell of every block
pub const GUARD_BYTE: u8 = 0xA5;

/// First address `malloc` can ever return
pub const FIRST_USABLE_ADDRESS: usize = RESERVED_CELLS + HEADER_BYTES;

/// Byte width assumed for untyped integer results (`sizeof(1)`)
pub const UNTYPED_INTEGER_WIDTH: usize = 4;
