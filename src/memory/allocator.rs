//! Free-list allocator over the [`HeapStore`]
//!
//! Block layout, in heap cells:
//!
//! ```text
//!   start        ptr                          start + size - 1
//!   ┌──────────┬────────────────────────────┬───────────┐
//!   │ size     │ payload (size - 2 cells)   │ 0xA5      │
//!   └──────────┴────────────────────────────┴───────────┘
//!     header                                   guard
//! ```
//!
//! The header cell holds the full block size including itself and the
//! guard. Free blocks carry the same header and guard as allocated ones,
//! so the heap bytes alone describe every span. The in-memory free list
//! stays the authority for where free spans are; the bytes are what the
//! block reconstructor checks them against.

use super::heap::{HeapError, HeapStore};
use crate::interpreter::constants::{
    BLOCK_OVERHEAD, FIRST_USABLE_ADDRESS, GUARD_BYTE, HEADER_BYTES, MIN_BLOCK_SIZE,
    RESERVED_CELLS,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// One free span, addressed by its first usable byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeListEntry {
    pub ptr: usize,
    pub size_with_header: usize,
}

impl FreeListEntry {
    pub fn from_span(start: usize, size_with_header: usize) -> Self {
        FreeListEntry {
            ptr: start + HEADER_BYTES,
            size_with_header,
        }
    }

    /// Index of the header cell
    pub fn start(&self) -> usize {
        self.ptr.saturating_sub(HEADER_BYTES)
    }

    /// One past the guard cell
    pub fn end(&self) -> usize {
        self.start().saturating_add(self.size_with_header)
    }

    /// Payload cells available to a request
    pub fn capacity(&self) -> usize {
        self.size_with_header.saturating_sub(BLOCK_OVERHEAD)
    }
}

/// Placement policy for `malloc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitStrategy {
    #[default]
    First,
    Next,
    Best,
    Worst,
}

impl FitStrategy {
    pub const ALL: [FitStrategy; 4] = [
        FitStrategy::First,
        FitStrategy::Next,
        FitStrategy::Best,
        FitStrategy::Worst,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FitStrategy::First => "first",
            FitStrategy::Next => "next",
            FitStrategy::Best => "best",
            FitStrategy::Worst => "worst",
        }
    }
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-fit", self.name())
    }
}

impl FromStr for FitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_suffix("-fit").unwrap_or(&name);
        FitStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == name)
            .ok_or_else(|| format!("Unknown fit strategy '{}'", s.trim()))
    }
}

/// Why a pointer could not be freed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeFault {
    OutsideHeap,
    InsideFreeSpan,
    NotABlockStart,
    CorruptHeader,
    /// The trailing guard byte was overwritten
    CorruptGuard,
    CorruptChain { at: usize },
}

impl fmt::Display for FreeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreeFault::OutsideHeap => write!(f, "address is outside the allocatable heap"),
            FreeFault::InsideFreeSpan => write!(f, "address lies inside a free block"),
            FreeFault::NotABlockStart => write!(f, "address is not the start of an allocation"),
            FreeFault::CorruptHeader => write!(f, "block header is corrupted"),
            FreeFault::CorruptGuard => write!(f, "guard byte was overwritten"),
            FreeFault::CorruptChain { at } => {
                write!(f, "heap is corrupted at cell {}", at)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    InvalidSize { size: usize },
    OutOfMemory { requested: usize, largest_free: usize },
    InvalidFree { address: usize, reason: FreeFault },
    DoubleFree { address: usize },
    Heap(HeapError),
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::InvalidSize { size } => {
                write!(f, "Invalid allocation size {}", size)
            }
            AllocError::OutOfMemory {
                requested,
                largest_free,
            } => write!(
                f,
                "Out of memory: requested {} bytes, largest free block holds {}",
                requested, largest_free
            ),
            AllocError::InvalidFree { address, reason } => {
                write!(f, "Invalid free of {}: {}", address, reason)
            }
            AllocError::DoubleFree { address } => {
                write!(f, "Double free detected at address {}", address)
            }
            AllocError::Heap(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AllocError {}

impl From<HeapError> for AllocError {
    fn from(err: HeapError) -> Self {
        AllocError::Heap(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocator {
    /// Sorted by address, never overlapping
    free_list: Vec<FreeListEntry>,
    strategy: FitStrategy,
    /// Next-fit resumes at the first entry starting at or after this cell
    next_fit_cursor: usize,
}

fn write_block(heap: &mut HeapStore, start: usize, size: usize) -> Result<(), HeapError> {
    heap.write(start, size as u8)?;
    heap.write(start + size - 1, GUARD_BYTE)
}

impl Allocator {
    /// Format the whole heap above the reserved cells as one free block
    pub fn new(heap: &mut HeapStore, strategy: FitStrategy) -> Result<Self, AllocError> {
        let initial = FreeListEntry::from_span(RESERVED_CELLS, heap.len() - RESERVED_CELLS);
        write_block(heap, initial.start(), initial.size_with_header)?;
        Ok(Allocator {
            free_list: vec![initial],
            strategy,
            next_fit_cursor: RESERVED_CELLS,
        })
    }

    /// Rebuild from a previously validated free list
    pub fn from_parts(
        free_list: Vec<FreeListEntry>,
        strategy: FitStrategy,
        next_fit_cursor: usize,
    ) -> Self {
        Allocator {
            free_list,
            strategy,
            next_fit_cursor,
        }
    }

    /// Check the invariants `from_parts` relies on
    pub fn validate_free_list(entries: &[FreeListEntry], heap_len: usize) -> Result<(), String> {
        let mut previous_end = RESERVED_CELLS;
        for entry in entries {
            if entry.ptr < FIRST_USABLE_ADDRESS {
                return Err(format!("free entry at {} overlaps reserved cells", entry.ptr));
            }
            if entry.size_with_header < MIN_BLOCK_SIZE {
                return Err(format!(
                    "free entry at {} is smaller than {} cells",
                    entry.ptr, MIN_BLOCK_SIZE
                ));
            }
            if entry.end() > heap_len {
                return Err(format!("free entry at {} runs past the heap", entry.ptr));
            }
            if entry.start() < previous_end {
                return Err(format!(
                    "free entry at {} overlaps or is out of order",
                    entry.ptr
                ));
            }
            previous_end = entry.end();
        }
        Ok(())
    }

    pub fn entries(&self) -> &[FreeListEntry] {
        &self.free_list
    }

    pub fn strategy(&self) -> FitStrategy {
        self.strategy
    }

    pub fn next_fit_cursor(&self) -> usize {
        self.next_fit_cursor
    }

    pub fn set_strategy(&mut self, strategy: FitStrategy) {
        if strategy != self.strategy {
            debug!(from = %self.strategy, to = %strategy, "fit strategy changed");
        }
        self.strategy = strategy;
        self.next_fit_cursor = RESERVED_CELLS;
    }

    pub fn largest_capacity(&self) -> usize {
        self.free_list
            .iter()
            .map(FreeListEntry::capacity)
            .max()
            .unwrap_or(0)
    }

    /// Index of the free entry the active strategy picks for `needed` cells
    fn select(&self, needed: usize) -> Option<usize> {
        let fits = |entry: &FreeListEntry| entry.size_with_header >= needed;
        let candidates = self
            .free_list
            .iter()
            .enumerate()
            .filter(|(_, entry)| fits(entry));

        match self.strategy {
            FitStrategy::First => candidates.map(|(i, _)| i).next(),
            FitStrategy::Next => {
                let count = self.free_list.len();
                let begin = self
                    .free_list
                    .iter()
                    .position(|entry| entry.start() >= self.next_fit_cursor)
                    .unwrap_or(0);
                (0..count)
                    .map(|offset| (begin + offset) % count)
                    .find(|&i| fits(&self.free_list[i]))
            }
            // min_by_key keeps the first minimum, i.e. the lowest address
            FitStrategy::Best => candidates
                .min_by_key(|(_, entry)| entry.size_with_header)
                .map(|(i, _)| i),
            FitStrategy::Worst => candidates
                .min_by_key(|(_, entry)| Reverse(entry.size_with_header))
                .map(|(i, _)| i),
        }
    }

    /// Allocate `size` payload bytes and return the address of the first one
    pub fn malloc(&mut self, heap: &mut HeapStore, size: usize) -> Result<usize, AllocError> {
        if size < 1 {
            return Err(AllocError::InvalidSize { size });
        }
        let out_of_memory = AllocError::OutOfMemory {
            requested: size,
            largest_free: self.largest_capacity(),
        };
        let needed = size.checked_add(BLOCK_OVERHEAD).ok_or(out_of_memory.clone())?;
        let index = self.select(needed).ok_or(out_of_memory)?;

        let entry = self.free_list[index];
        let remainder = entry.size_with_header - needed;
        let taken = if remainder >= MIN_BLOCK_SIZE {
            let rest = FreeListEntry::from_span(entry.start() + needed, remainder);
            write_block(heap, rest.start(), rest.size_with_header)?;
            self.free_list[index] = rest;
            needed
        } else {
            // Too small to ever hold a payload, so it rides along as padding
            self.free_list.remove(index);
            entry.size_with_header
        };

        write_block(heap, entry.start(), taken)?;
        self.next_fit_cursor = entry.start() + taken;

        debug!(
            strategy = %self.strategy,
            address = entry.ptr,
            size,
            block = taken,
            "allocated"
        );
        Ok(entry.ptr)
    }

    /// Walk the header chain from the first block up to `start` and return
    /// the size of the block found there
    fn locate(&self, heap: &HeapStore, start: usize) -> Result<usize, FreeFault> {
        let mut cursor = RESERVED_CELLS;
        while cursor < start {
            let length = match self.free_list.iter().find(|e| e.start() == cursor) {
                Some(entry) => entry.size_with_header,
                None => heap.read(cursor).map_err(|_| FreeFault::CorruptChain { at: cursor })?
                    as usize,
            };
            if length < MIN_BLOCK_SIZE {
                return Err(FreeFault::CorruptChain { at: cursor });
            }
            cursor += length;
        }
        if cursor != start {
            return Err(FreeFault::NotABlockStart);
        }

        let length = heap
            .read(start)
            .map_err(|_| FreeFault::CorruptHeader)? as usize;
        let end = start + length;
        let overlaps_free = self
            .free_list
            .iter()
            .any(|e| e.start() < end && start < e.end());
        if length < MIN_BLOCK_SIZE || end > heap.len() || overlaps_free {
            return Err(FreeFault::CorruptHeader);
        }
        Ok(length)
    }

    /// Return the allocation at `ptr` to the free list, merging it with
    /// free neighbours. Yields the resulting free entry.
    pub fn free(&mut self, heap: &mut HeapStore, ptr: usize) -> Result<FreeListEntry, AllocError> {
        if ptr < FIRST_USABLE_ADDRESS || ptr >= heap.len() {
            return Err(AllocError::InvalidFree {
                address: ptr,
                reason: FreeFault::OutsideHeap,
            });
        }
        if let Some(entry) = self
            .free_list
            .iter()
            .find(|e| e.start() < ptr && ptr < e.end())
        {
            if entry.ptr == ptr {
                return Err(AllocError::DoubleFree { address: ptr });
            }
            return Err(AllocError::InvalidFree {
                address: ptr,
                reason: FreeFault::InsideFreeSpan,
            });
        }

        let start = ptr - HEADER_BYTES;
        let size = self.locate(heap, start).map_err(|reason| {
            warn!(address = ptr, %reason, "free rejected");
            AllocError::InvalidFree {
                address: ptr,
                reason,
            }
        })?;
        if heap.read(start + size - 1)? != GUARD_BYTE {
            warn!(address = ptr, "free rejected: guard byte overwritten");
            return Err(AllocError::InvalidFree {
                address: ptr,
                reason: FreeFault::CorruptGuard,
            });
        }

        let position = self.free_list.partition_point(|e| e.start() < start);
        self.free_list
            .insert(position, FreeListEntry::from_span(start, size));

        if position + 1 < self.free_list.len()
            && self.free_list[position].end() == self.free_list[position + 1].start()
        {
            let next = self.free_list.remove(position + 1);
            self.free_list[position].size_with_header += next.size_with_header;
        }
        let mut merged_at = position;
        if position > 0 && self.free_list[position - 1].end() == self.free_list[position].start()
        {
            let current = self.free_list.remove(position);
            self.free_list[position - 1].size_with_header += current.size_with_header;
            merged_at = position - 1;
        }

        let merged = self.free_list[merged_at];
        write_block(heap, merged.start(), merged.size_with_header)?;
        debug!(
            address = ptr,
            span_start = merged.start(),
            span_size = merged.size_with_header,
            "freed"
        );
        Ok(merged)
    }
}
