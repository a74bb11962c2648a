// Tue Jan 13 2026 - Alex

use crate::dac::{GcHeapDetailsData, GcPhase, GenerationData};
use crate::memory::{Address, MemoryRange};

/// One GC heap as captured at snapshot time. Immutable once built.
#[derive(Debug, Clone)]
pub struct HeapDetails {
    index: usize,
    server: bool,
    max_generation: u32,
    data: GcHeapDetailsData,
}

impl HeapDetails {
    pub fn new(index: usize, server: bool, max_generation: u32, data: GcHeapDetailsData) -> Self {
        Self {
            index,
            server,
            max_generation,
            data,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Heap context passed back to segment requests; workstation heaps have none.
    pub fn context(&self) -> Option<Address> {
        if self.server {
            Some(self.data.heap_address)
        } else {
            None
        }
    }

    pub fn data(&self) -> &GcHeapDetailsData {
        &self.data
    }

    pub fn max_generation(&self) -> u32 {
        self.max_generation
    }

    pub fn large_generation(&self) -> u32 {
        self.max_generation + 1
    }

    pub fn pinned_generation(&self) -> u32 {
        self.max_generation + 2
    }

    pub fn has_regions(&self) -> bool {
        self.data.has_regions
    }

    pub fn has_pinned_heap(&self) -> bool {
        self.data.has_poh
    }

    pub fn generation(&self, gen: u32) -> Option<&GenerationData> {
        self.data.generation_table.get(gen as usize)
    }

    pub fn ephemeral_segment(&self) -> Address {
        self.data.ephemeral_heap_segment
    }

    pub fn alloc_allocated(&self) -> Address {
        self.data.alloc_allocated
    }

    pub fn card_table(&self) -> Address {
        self.data.card_table
    }

    pub fn lowest_address(&self) -> Address {
        self.data.lowest_address
    }

    pub fn gc_phase(&self) -> GcPhase {
        self.data.current_gc_state
    }

    /// Highest generation whose `allocation_start` is at or below `addr`,
    /// counting down from gen 0. Only meaningful inside the classic
    /// ephemeral segment.
    pub fn ephemeral_generation_of(&self, addr: Address) -> u32 {
        for gen in 0..self.max_generation {
            match self.generation(gen) {
                Some(g) if !g.allocation_start.is_null() && addr >= g.allocation_start => return gen,
                _ => {}
            }
        }
        self.max_generation
    }

    /// Address range of generation `gen` inside the classic ephemeral segment.
    pub fn ephemeral_generation_range(&self, gen: u32, segment_mem: Address) -> MemoryRange {
        let start = if gen >= self.max_generation {
            segment_mem
        } else {
            self.generation(gen).map(|g| g.allocation_start).unwrap_or(segment_mem)
        };
        let end = if gen == 0 {
            self.alloc_allocated()
        } else {
            self.generation(gen - 1)
                .map(|g| g.allocation_start)
                .unwrap_or_else(|| self.alloc_allocated())
        };
        MemoryRange::new(start, end)
    }

    pub fn finalize_queue(&self) -> FinalizeQueue<'_> {
        FinalizeQueue {
            fill_pointers: &self.data.finalization_fill_pointers,
            generation_segments: self.max_generation as usize + 2,
        }
    }
}

/// View over a heap's finalize queue fill pointers.
///
/// Queue segments run oldest generation first, then the critical list,
/// then the ready-for-finalization list.
#[derive(Debug, Clone, Copy)]
pub struct FinalizeQueue<'a> {
    fill_pointers: &'a [Address],
    generation_segments: usize,
}

impl<'a> FinalizeQueue<'a> {
    fn segment_start(&self, seg: usize) -> Option<Address> {
        seg.checked_sub(1).and_then(|i| self.fill_pointers.get(i).copied())
    }

    fn segment_limit(&self, seg: usize) -> Option<Address> {
        self.fill_pointers.get(seg).copied()
    }

    fn generation_segment(&self, gen: u32) -> Option<usize> {
        self.generation_segments.checked_sub(gen as usize + 1)
    }

    fn critical_segment(&self) -> usize {
        self.generation_segments
    }

    fn finalizer_segment(&self) -> usize {
        self.generation_segments + 1
    }

    /// Objects registered for finalization that were promoted into `gen`.
    pub fn generation_range(&self, gen: u32) -> Option<MemoryRange> {
        let seg = self.generation_segment(gen)?;
        Some(MemoryRange::new(self.segment_start(seg)?, self.segment_limit(seg)?))
    }

    /// Critical and normal lists together: objects found dead and waiting
    /// for the finalizer thread.
    pub fn ready_range(&self) -> Option<MemoryRange> {
        Some(MemoryRange::new(
            self.segment_start(self.critical_segment())?,
            self.segment_limit(self.finalizer_segment())?,
        ))
    }

    /// Every finalizable object still tracked per generation, oldest first.
    pub fn finalizable_range(&self, max_generation: u32) -> Option<MemoryRange> {
        let first = self.generation_segment(max_generation)?;
        let last = self.generation_segment(0)?;
        Some(MemoryRange::new(self.segment_start(first)?, self.segment_limit(last)?))
    }

    pub fn is_present(&self) -> bool {
        self.fill_pointers.len() > self.finalizer_segment()
    }
}
