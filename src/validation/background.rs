// Tue Jan 13 2026 - Alex

use crate::dac::GcPhase;
use crate::gc::{HeapDetails, HeapError, HeapSegment, SegmentFlags};
use crate::memory::{Address, MemoryReader, PageCache};

const MARK_BIT_PITCH: u64 = 8;
const MARK_WORD_WIDTH: u64 = 32;
const MARK_WORD_SIZE: u64 = MARK_BIT_PITCH * MARK_WORD_WIDTH;

/// Which background mark checks apply to objects of one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackgroundCheck {
    pub consider_mark: bool,
    pub check_current_sweep: bool,
    pub check_saved_sweep: bool,
}

impl BackgroundCheck {
    /// Only a background GC in its planning phase leaves unmarked objects
    /// that are not yet swept.
    pub fn for_segment(heap: &HeapDetails, segment: &HeapSegment) -> Self {
        let mut check = Self::default();
        if heap.gc_phase() != GcPhase::Planning {
            return check;
        }

        let data = heap.data();
        let sweep = data.next_sweep_obj;
        let range = segment.object_range();
        if segment.flags().contains(SegmentFlags::SWEPT) || !range.contains(sweep) {
            // already swept
            return check;
        }
        if segment.data().background_allocated.is_null() {
            // allocated while the background GC was running
            return check;
        }

        check.consider_mark = true;
        check.check_saved_sweep = segment.address() == data.saved_sweep_ephemeral_seg;
        check.check_current_sweep = range.contains(sweep);
        check
    }
}

/// Background GC mark bits of a heap.
pub struct BackgroundMarks<'a> {
    memory: &'a PageCache,
}

impl<'a> BackgroundMarks<'a> {
    pub fn new(memory: &'a PageCache) -> Self {
        Self { memory }
    }

    /// False when a planning background GC has not marked `obj`; such an
    /// object may hold stale references and its members are not checked.
    pub fn should_consider_object(
        &self,
        heap: &HeapDetails,
        segment: &HeapSegment,
        obj: Address,
    ) -> Result<bool, HeapError> {
        let check = BackgroundCheck::for_segment(heap, segment);
        if !check.consider_mark {
            return Ok(true);
        }

        let data = heap.data();
        let no_mark = (check.check_current_sweep && obj < data.next_sweep_obj)
            || (check.check_saved_sweep && obj >= data.saved_sweep_ephemeral_start)
            || obj >= segment.data().background_allocated;
        if no_mark {
            return Ok(true);
        }
        self.is_marked(heap, obj)
    }

    pub fn is_marked(&self, heap: &HeapDetails, obj: Address) -> Result<bool, HeapError> {
        let data = heap.data();
        if obj < data.background_saved_lowest_address || obj >= data.background_saved_highest_address {
            return Ok(true);
        }
        let word_addr = data.mark_array + (obj.as_u64() / MARK_WORD_SIZE) * 4;
        let word = self.memory.read_u32(word_addr)?;
        Ok(word & (1u32 << ((obj.as_u64() / MARK_BIT_PITCH) % MARK_WORD_WIDTH)) != 0)
    }
}
