// Tue Jan 13 2026 - Alex

use crate::dac::SegmentData;
use crate::gc::{HeapDetails, ObjectLayout};
use crate::memory::{Address, MemoryRange};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u64 {
        const READ_ONLY = 0x1;
        const IN_RANGE = 0x2;
        const LOH = 0x8;
        const SWEPT = 0x10;
        const POH = 0x200;
    }
}

/// Where a segment came from and therefore how it is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Regions layout: a region owned by one small-object generation.
    Region(u32),
    /// Classic layout: a max-generation segment ahead of the ephemeral one.
    Small,
    /// Classic layout: the segment holding the young generations.
    Ephemeral,
    Large,
    Pinned,
    Frozen,
}

impl SegmentKind {
    pub fn is_large_or_pinned(&self) -> bool {
        matches!(self, SegmentKind::Large | SegmentKind::Pinned)
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKind::Region(gen) => write!(f, "gen{}", gen),
            SegmentKind::Small => f.write_str("small"),
            SegmentKind::Ephemeral => f.write_str("ephemeral"),
            SegmentKind::Large => f.write_str("LOH"),
            SegmentKind::Pinned => f.write_str("POH"),
            SegmentKind::Frozen => f.write_str("frozen"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeapSegment {
    data: SegmentData,
    kind: SegmentKind,
    heap: usize,
    regions: bool,
    object_end: Address,
}

impl HeapSegment {
    pub fn new(data: SegmentData, kind: SegmentKind, heap: &HeapDetails) -> Self {
        let regions = heap.has_regions();
        let object_end = match kind {
            SegmentKind::Ephemeral => heap.alloc_allocated(),
            SegmentKind::Large | SegmentKind::Pinned => data.allocated,
            _ if regions => data.high_alloc_mark,
            _ => data.allocated,
        };
        Self {
            data,
            kind,
            heap: heap.index(),
            regions,
            object_end,
        }
    }

    pub fn address(&self) -> Address {
        self.data.address
    }

    pub fn data(&self) -> &SegmentData {
        &self.data
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn heap(&self) -> usize {
        self.heap
    }

    pub fn flags(&self) -> SegmentFlags {
        SegmentFlags::from_bits_retain(self.data.flags)
    }

    pub fn mem(&self) -> Address {
        self.data.mem
    }

    /// Where the linear walk of this segment stops.
    pub fn object_end(&self) -> Address {
        self.object_end
    }

    pub fn object_range(&self) -> MemoryRange {
        MemoryRange::new(self.data.mem, self.object_end)
    }

    pub fn is_large_or_pinned(&self) -> bool {
        self.kind.is_large_or_pinned()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.object_range().contains(addr)
    }

    pub fn reserved_range(&self) -> MemoryRange {
        MemoryRange::new(self.data.mem, self.data.reserved.max(self.data.committed))
    }

    /// Committed memory including the bookkeeping that precedes `mem`.
    pub fn committed_range(&self, layout: &ObjectLayout) -> MemoryRange {
        let mem = self.data.mem.as_u64();
        let start = if self.kind == SegmentKind::Frozen {
            mem.saturating_sub(layout.pointer_size())
        } else if mem & 0x1fff == 0x1000 {
            mem - 0x1000
        } else {
            mem & !(layout.page_size() - 1)
        };
        MemoryRange::new(Address::new(start), self.data.committed)
    }

    /// Generation of an object at `addr` in this segment.
    pub fn generation_of(&self, addr: Address, heap: &HeapDetails) -> u32 {
        match self.kind {
            SegmentKind::Region(gen) => gen,
            SegmentKind::Small | SegmentKind::Frozen => heap.max_generation(),
            SegmentKind::Ephemeral => heap.ephemeral_generation_of(addr),
            SegmentKind::Large => heap.large_generation(),
            SegmentKind::Pinned => heap.pinned_generation(),
        }
    }

    pub fn uses_regions(&self) -> bool {
        self.regions
    }
}
