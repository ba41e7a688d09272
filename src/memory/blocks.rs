//! Block reconstruction from raw heap bytes
//!
//! [`reconstruct`] derives the displayed block layout from nothing but the
//! heap image and the free-list spans. It never trusts either source: a span
//! that disagrees with the bytes, a length that runs into a differently
//! painted region, or a missing guard byte all end up as `error` flags on the
//! affected cells. The function is total and deterministic, so it can run on
//! every redraw.
//!
//! The scan works in three passes:
//!
//! 1. cells `0..RESERVED_CELLS` form one reserved block
//! 2. every free-list span is painted free (everything else starts out
//!    painted allocated), flagging malformed or overlapping spans
//! 3. the remaining cells are walked left to right; the first cell of a run
//!    declares its length and the run ends early if the paint flips

use super::allocator::FreeListEntry;
use crate::interpreter::constants::{
    BLOCK_OVERHEAD, GUARD_BYTE, HEADER_BYTES, MIN_BLOCK_SIZE, RESERVED_CELLS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub index: usize,
    pub value: u8,
    pub is_allocated: bool,
    pub is_reserved: bool,
    pub error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Reserved,
    Allocated,
    Free,
    /// Cells that no valid header accounts for
    Filler,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub cells: Vec<Cell>,
}

impl Block {
    pub fn start(&self) -> usize {
        self.cells.first().map_or(0, |cell| cell.index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.cells.iter().any(|cell| cell.error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paint {
    Allocated,
    Free,
}

fn run_cell(heap: &[u8], flagged: &[bool], index: usize, allocated: bool) -> Cell {
    Cell {
        index,
        value: heap[index],
        is_allocated: allocated,
        is_reserved: false,
        error: flagged[index],
    }
}

fn flush_filler(blocks: &mut Vec<Block>, filler: &mut Vec<Cell>) {
    if !filler.is_empty() {
        blocks.push(Block {
            kind: BlockKind::Filler,
            cells: std::mem::take(filler),
        });
    }
}

/// Derive the block layout of `heap` given the allocator's free spans
pub fn reconstruct(heap: &[u8], free_list: &[FreeListEntry]) -> Vec<Block> {
    let len = heap.len();
    let mut paint = vec![Paint::Allocated; len];
    let mut flagged = vec![false; len];

    for entry in free_list {
        let start = entry.ptr.checked_sub(HEADER_BYTES);
        let end = start.and_then(|s| s.checked_add(entry.size_with_header));
        let malformed = entry.size_with_header < MIN_BLOCK_SIZE
            || start.map_or(true, |s| s < RESERVED_CELLS)
            || end.map_or(true, |e| e > len);

        let from = start.unwrap_or(entry.ptr).max(RESERVED_CELLS);
        let to = end.unwrap_or(usize::MAX).min(len);
        for index in from..to {
            if paint[index] == Paint::Free {
                // claimed by two entries
                flagged[index] = true;
            }
            paint[index] = Paint::Free;
            flagged[index] |= malformed;
        }
        if malformed && from >= to && from < len {
            flagged[from] = true;
        }
    }

    let mut blocks = Vec::new();
    let reserved_end = RESERVED_CELLS.min(len);
    if reserved_end > 0 {
        blocks.push(Block {
            kind: BlockKind::Reserved,
            cells: (0..reserved_end)
                .map(|index| Cell {
                    index,
                    value: heap[index],
                    is_allocated: false,
                    is_reserved: true,
                    error: false,
                })
                .collect(),
        });
    }

    let mut filler: Vec<Cell> = Vec::new();
    let mut index = reserved_end;
    while index < len {
        let state = paint[index];
        let declared = heap[index] as usize;
        let filler_cell = |flagged: &[bool], index: usize| Cell {
            index,
            value: heap[index],
            is_allocated: false,
            is_reserved: false,
            // a free span was promised here but the bytes carry no header
            error: flagged[index] || state == Paint::Free,
        };

        if declared < MIN_BLOCK_SIZE {
            filler.push(filler_cell(&flagged, index));
            index += 1;
            continue;
        }

        let allocated = state == Paint::Allocated;
        let mut cells = vec![run_cell(heap, &flagged, index, allocated)];
        let mut next = index + 1;
        let mut truncated = false;
        while cells.len() < declared {
            if next >= len {
                truncated = true;
                break;
            }
            if paint[next] != state {
                flagged[next] = true;
                truncated = true;
                break;
            }
            cells.push(run_cell(heap, &flagged, next, allocated));
            next += 1;
        }

        if cells.len() == 1 {
            filler.push(filler_cell(&flagged, index));
            index = next;
            continue;
        }

        if truncated || heap[next - 1] != GUARD_BYTE {
            for cell in &mut cells {
                cell.error = true;
            }
        }

        flush_filler(&mut blocks, &mut filler);
        blocks.push(Block {
            kind: if allocated {
                BlockKind::Allocated
            } else {
                BlockKind::Free
            },
            cells,
        });
        index = next;
    }
    flush_filler(&mut blocks, &mut filler);

    blocks
}

/// Cell and block counts over a reconstructed layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub allocated_cells: usize,
    pub free_cells: usize,
    pub filler_cells: usize,
    pub allocated_blocks: usize,
    pub free_blocks: usize,
    /// Payload capacity of the largest free block
    pub largest_free: usize,
    pub error_cells: usize,
}

pub fn summarize(blocks: &[Block]) -> HeapStats {
    let mut stats = HeapStats::default();
    for block in blocks {
        match block.kind {
            BlockKind::Reserved => {}
            BlockKind::Allocated => {
                stats.allocated_blocks += 1;
                stats.allocated_cells += block.len();
            }
            BlockKind::Free => {
                stats.free_blocks += 1;
                stats.free_cells += block.len();
                stats.largest_free = stats
                    .largest_free
                    .max(block.len().saturating_sub(BLOCK_OVERHEAD));
            }
            BlockKind::Filler => stats.filler_cells += block.len(),
        }
        stats.error_cells += block.cells.iter().filter(|cell| cell.error).count();
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::allocator::{Allocator, FitStrategy};
    use crate::memory::heap::HeapStore;

    fn layout(blocks: &[Block]) -> Vec<(BlockKind, usize, usize)> {
        blocks
            .iter()
            .map(|block| (block.kind, block.start(), block.len()))
            .collect()
    }

    fn allocated_heap() -> (HeapStore, Allocator) {
        let mut heap = HeapStore::new(16).unwrap();
        let mut allocator = Allocator::new(&mut heap, FitStrategy::First).unwrap();
        allocator.malloc(&mut heap, 4).unwrap();
        (heap, allocator)
    }

    #[test]
    fn test_fresh_heap() {
        let mut heap = HeapStore::new(16).unwrap();
        let allocator = Allocator::new(&mut heap, FitStrategy::First).unwrap();
        let blocks = reconstruct(heap.as_bytes(), allocator.entries());
        assert_eq!(
            layout(&blocks),
            vec![(BlockKind::Reserved, 0, 3), (BlockKind::Free, 3, 13)]
        );
        assert!(blocks[0].cells.iter().all(|cell| cell.is_reserved));
        assert!(!blocks.iter().any(Block::has_error));
    }

    #[test]
    fn test_allocation_is_reported() {
        let (heap, allocator) = allocated_heap();
        let blocks = reconstruct(heap.as_bytes(), allocator.entries());
        assert_eq!(
            layout(&blocks),
            vec![
                (BlockKind::Reserved, 0, 3),
                (BlockKind::Allocated, 3, 6),
                (BlockKind::Free, 9, 7),
            ]
        );
        assert!(blocks[1].cells.iter().all(|cell| cell.is_allocated));
        assert!(!blocks.iter().any(Block::has_error));
    }

    #[test]
    fn test_guard_corruption_flags_block() {
        let (mut heap, allocator) = allocated_heap();
        heap.write(8, 0).unwrap();
        let blocks = reconstruct(heap.as_bytes(), allocator.entries());
        assert_eq!(blocks[1].kind, BlockKind::Allocated);
        assert!(blocks[1].cells.iter().all(|cell| cell.error));
        assert!(!blocks[2].has_error());
    }

    #[test]
    fn test_oversized_header_splits_at_paint_flip() {
        let (mut heap, allocator) = allocated_heap();
        heap.write(3, 10).unwrap();
        let blocks = reconstruct(heap.as_bytes(), allocator.entries());
        assert_eq!(
            layout(&blocks),
            vec![
                (BlockKind::Reserved, 0, 3),
                (BlockKind::Allocated, 3, 6),
                (BlockKind::Free, 9, 7),
            ]
        );
        assert!(blocks[1].cells.iter().all(|cell| cell.error));
        // only the offending cell of the free block is flagged
        let free_errors: Vec<usize> = blocks[2]
            .cells
            .iter()
            .filter(|cell| cell.error)
            .map(|cell| cell.index)
            .collect();
        assert_eq!(free_errors, vec![9]);
    }

    #[test]
    fn test_missing_header_becomes_filler() {
        let (mut heap, allocator) = allocated_heap();
        heap.write(3, 0).unwrap();
        let blocks = reconstruct(heap.as_bytes(), allocator.entries());
        assert_eq!(
            layout(&blocks),
            vec![
                (BlockKind::Reserved, 0, 3),
                (BlockKind::Filler, 3, 6),
                (BlockKind::Free, 9, 7),
            ]
        );
        assert!(blocks[1].cells.iter().all(|cell| !cell.is_allocated));
    }

    #[test]
    fn test_run_past_heap_end() {
        let mut heap = HeapStore::new(16).unwrap();
        heap.write(3, 6).unwrap();
        heap.write(8, GUARD_BYTE).unwrap();
        heap.write(9, 200).unwrap();
        let blocks = reconstruct(heap.as_bytes(), &[]);
        assert_eq!(
            layout(&blocks),
            vec![
                (BlockKind::Reserved, 0, 3),
                (BlockKind::Allocated, 3, 6),
                (BlockKind::Allocated, 9, 7),
            ]
        );
        assert!(!blocks[1].has_error());
        assert!(blocks[2].cells.iter().all(|cell| cell.error));
    }

    #[test]
    fn test_malformed_free_entries_are_flagged() {
        let heap = HeapStore::new(16).unwrap();
        let entries = [
            FreeListEntry::from_span(3, 2),
            FreeListEntry::from_span(10, 40),
        ];
        let blocks = reconstruct(heap.as_bytes(), &entries);
        assert!(blocks.iter().all(|block| block.kind != BlockKind::Allocated));
        let flagged: Vec<usize> = blocks
            .iter()
            .flat_map(|block| block.cells.iter())
            .filter(|cell| cell.error)
            .map(|cell| cell.index)
            .collect();
        assert_eq!(flagged, vec![3, 4, 10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_overlapping_free_entries_are_flagged() {
        let mut heap = HeapStore::new(16).unwrap();
        let allocator = Allocator::new(&mut heap, FitStrategy::First).unwrap();
        let mut entries = allocator.entries().to_vec();
        entries.push(FreeListEntry::from_span(5, 4));
        let blocks = reconstruct(heap.as_bytes(), &entries);
        let flagged: Vec<usize> = blocks
            .iter()
            .flat_map(|block| block.cells.iter())
            .filter(|cell| cell.error)
            .map(|cell| cell.index)
            .collect();
        assert_eq!(flagged, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_tiny_and_empty_heaps() {
        assert!(reconstruct(&[], &[]).is_empty());
        let blocks = reconstruct(&[1, 2], &[FreeListEntry { ptr: 0, size_with_header: 0 }]);
        assert_eq!(layout(&blocks), vec![(BlockKind::Reserved, 0, 2)]);
    }

    #[test]
    fn test_idempotent() {
        let (mut heap, allocator) = allocated_heap();
        heap.write(5, 0xff).unwrap();
        let first = reconstruct(heap.as_bytes(), allocator.entries());
        let second = reconstruct(heap.as_bytes(), allocator.entries());
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary() {
        let (heap, allocator) = allocated_heap();
        let stats = summarize(&reconstruct(heap.as_bytes(), allocator.entries()));
        assert_eq!(
            stats,
            HeapStats {
                allocated_cells: 6,
                free_cells: 7,
                filler_cells: 0,
                allocated_blocks: 1,
                free_blocks: 1,
                largest_free: 5,
                error_cells: 0,
            }
        );
    }
}
