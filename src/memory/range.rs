// Tue Jan 13 2026 - Alex

use crate::memory::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open range `[start, end)` of target addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRange {
    start: Address,
    end: Address,
}

impl MemoryRange {
    /// Builds a range; an inverted pair collapses to an empty range at `start`.
    pub fn new(start: Address, end: Address) -> Self {
        if end < start {
            return Self { start, end: start };
        }
        Self { start, end }
    }

    pub fn from_start_size(start: Address, size: u64) -> Self {
        Self::new(start, start + size)
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn size(&self) -> u64 {
        self.end.distance_from(self.start)
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.end
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
