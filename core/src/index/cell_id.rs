//! Ordered 64-bit keys for H3 cells.
//!
//! A key is an H3 index whose resolution field is always 15. Leaf cells
//! (resolution 15) keep their H3 index unchanged. Coarser cells keep their
//! unused digits, which H3 sets to `7`, so the resolution of a key can be
//! recovered from the number of trailing `7` digits. All leaf keys below a
//! cell share the cell's prefix and therefore lie in the contiguous range
//! `[prefix followed by zeros, prefix followed by ones]`.

use h3o::CellIndex;

const RESOLUTION_OFFSET: u64 = 52;
const RESOLUTION_MASK: u64 = 0b1111 << RESOLUTION_OFFSET;
const MAX_RESOLUTION: u8 = 15;
const DIGIT_BITS: u32 = 3;
const UNUSED_DIGIT: u64 = 0b111;

/// An inclusive range of cell ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRange {
    pub min: u64,
    pub max: u64,
}

impl CellRange {
    pub fn new(min: u64, max: u64) -> Self {
        debug_assert!(min <= max);
        Self { min, max }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.min <= id && id <= self.max
    }

    /// Number of ids in this range
    pub fn span(&self) -> u128 {
        (self.max - self.min) as u128 + 1
    }

    pub fn is_disjoint(&self, other: &CellRange) -> bool {
        self.max < other.min || other.max < self.min
    }

    /// The smallest range containing `self` and `other`
    pub fn hull(&self, other: &CellRange) -> CellRange {
        CellRange::new(self.min.min(other.min), self.max.max(other.max))
    }
}

/// Convert a cell to its key
pub fn from_cell(cell: CellIndex) -> u64 {
    (u64::from(cell) & !RESOLUTION_MASK) | ((MAX_RESOLUTION as u64) << RESOLUTION_OFFSET)
}

/// Convert a key back to a cell. Returns `None` if the key does not denote a
/// valid cell.
pub fn to_cell(id: u64) -> Option<CellIndex> {
    let resolution = resolution(id) as u64;
    let raw = (id & !RESOLUTION_MASK) | (resolution << RESOLUTION_OFFSET);
    CellIndex::try_from(raw).ok()
}

/// The resolution of the cell denoted by the given key
pub fn resolution(id: u64) -> u8 {
    MAX_RESOLUTION - unused_digits(id)
}

/// The range of keys of the cell with the given key and all its descendants
pub fn range_of(id: u64) -> CellRange {
    let bits = DIGIT_BITS * unused_digits(id) as u32;
    let mask = (1u64 << bits) - 1;
    CellRange::new(id & !mask, id | mask)
}

fn unused_digits(id: u64) -> u8 {
    let mut n = 0;
    while n < MAX_RESOLUTION && (id >> (DIGIT_BITS * n as u32)) & UNUSED_DIGIT == UNUSED_DIGIT {
        n += 1;
    }
    n
}
