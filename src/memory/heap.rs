//! Heap Store: a fixed-size array of single-byte cells
//!
//! The first [`RESERVED_CELLS`] cells are reserved. They can be read but never
//! written. Everything from there up is open to the allocator and to
//! pointer-through writes alike, so a stray store can overwrite block
//! headers and guard bytes. That damage is left in place for the block
//! reconstructor to report.

use crate::interpreter::constants::{MAX_HEAP_SIZE, MIN_HEAP_SIZE, RESERVED_CELLS};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    InvalidSize { size: usize },
    Null,
    Reserved { index: usize },
    OutOfRange { index: usize, width: usize, len: usize },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::InvalidSize { size } => write!(
                f,
                "Heap size {} is outside {}..={}",
                size, MIN_HEAP_SIZE, MAX_HEAP_SIZE
            ),
            HeapError::Null => write!(f, "Null pointer dereference"),
            HeapError::Reserved { index } => {
                write!(f, "Cell {} is reserved and cannot be written", index)
            }
            HeapError::OutOfRange { index, width, len } => write!(
                f,
                "Access of {} byte(s) at {} runs past the end of a {}-cell heap",
                width, index, len
            ),
        }
    }
}

impl std::error::Error for HeapError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStore {
    cells: Vec<u8>,
}

impl HeapStore {
    pub fn new(size: usize) -> Result<Self, HeapError> {
        Self::from_bytes(vec![0; size])
    }

    /// Adopt an existing byte image, e.g. one restored from a snapshot
    pub fn from_bytes(cells: Vec<u8>) -> Result<Self, HeapError> {
        if !(MIN_HEAP_SIZE..=MAX_HEAP_SIZE).contains(&cells.len()) {
            return Err(HeapError::InvalidSize { size: cells.len() });
        }
        Ok(HeapStore { cells })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    fn check_range(&self, index: usize, width: usize) -> Result<(), HeapError> {
        match index.checked_add(width) {
            Some(end) if end <= self.cells.len() => Ok(()),
            _ => Err(HeapError::OutOfRange {
                index,
                width,
                len: self.cells.len(),
            }),
        }
    }

    pub fn read(&self, index: usize) -> Result<u8, HeapError> {
        self.check_range(index, 1)?;
        Ok(self.cells[index])
    }

    /// Read `width` cells starting at a pointer. Address 0 is null.
    pub fn read_range(&self, index: usize, width: usize) -> Result<&[u8], HeapError> {
        if index == 0 {
            return Err(HeapError::Null);
        }
        self.check_range(index, width)?;
        Ok(&self.cells[index..index + width])
    }

    pub fn write(&mut self, index: usize, byte: u8) -> Result<(), HeapError> {
        self.write_range(index, &[byte])
    }

    /// Write through a pointer. Null and reserved targets are rejected.
    pub fn write_range(&mut self, index: usize, bytes: &[u8]) -> Result<(), HeapError> {
        if index == 0 {
            return Err(HeapError::Null);
        }
        if index < RESERVED_CELLS {
            return Err(HeapError::Reserved { index });
        }
        self.check_range(index, bytes.len())?;
        self.cells[index..index + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn fill(&mut self, index: usize, width: usize, byte: u8) -> Result<(), HeapError> {
        self.write_range(index, &vec![byte; width])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limits() {
        assert!(HeapStore::new(MIN_HEAP_SIZE).is_ok());
        assert!(HeapStore::new(MAX_HEAP_SIZE).is_ok());
        assert_eq!(
            HeapStore::new(4),
            Err(HeapError::InvalidSize { size: 4 })
        );
        assert!(HeapStore::new(MAX_HEAP_SIZE + 1).is_err());
    }

    #[test]
    fn test_reserved_cells_are_read_only() {
        let mut heap = HeapStore::new(16).unwrap();
        assert_eq!(heap.write(0, 1), Err(HeapError::Null));
        assert_eq!(heap.write(2, 1), Err(HeapError::Reserved { index: 2 }));
        assert_eq!(heap.read(1), Ok(0));
        assert!(heap.write(3, 7).is_ok());
        assert_eq!(heap.read(3), Ok(7));
    }

    #[test]
    fn test_range_checks() {
        let mut heap = HeapStore::new(16).unwrap();
        assert!(heap.write_range(14, &[1, 2]).is_ok());
        assert_eq!(
            heap.write_range(15, &[1, 2]),
            Err(HeapError::OutOfRange {
                index: 15,
                width: 2,
                len: 16
            })
        );
        assert_eq!(heap.read_range(14, 2).unwrap(), &[1, 2]);
        assert!(heap.read_range(usize::MAX, 2).is_err());
        assert_eq!(heap.read_range(0, 1), Err(HeapError::Null));
    }

    #[test]
    fn test_fill() {
        let mut heap = HeapStore::new(8).unwrap();
        heap.fill(4, 3, 9).unwrap();
        assert_eq!(heap.as_bytes(), &[0, 0, 0, 0, 9, 9, 9, 0]);
    }
}
