// Tue Jan 13 2026 - Alex

use crate::dac::DataAccess;
use crate::gc::{HeapDetails, HeapError, HeapSegment, InterruptFlag, SegmentFlags, SegmentKind};
use crate::memory::Address;
use ahash::AHashSet;

/// Which segment list to iterate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentQuery {
    /// `0..=max_gen` small generations, `max_gen + 1` LOH, `max_gen + 2` POH.
    Generation(u32),
    /// Read-only segments threaded through the max-generation list.
    Frozen,
}

/// Walks one singly-linked segment list of a heap.
///
/// Handles both layouts: under regions every generation has its own list;
/// under the classic layout only the max generation carries the small
/// object chain, which ends at the ephemeral segment.
pub struct SegmentChain<'a> {
    dac: &'a dyn DataAccess,
    heap: &'a HeapDetails,
    query: SegmentQuery,
    next: Address,
    seen: AHashSet<Address>,
    done: bool,
}

impl<'a> SegmentChain<'a> {
    pub fn new(dac: &'a dyn DataAccess, heap: &'a HeapDetails, query: SegmentQuery) -> Self {
        let max = heap.max_generation();
        let list_gen = match query {
            SegmentQuery::Frozen => Some(max),
            SegmentQuery::Generation(gen) if gen == heap.pinned_generation() && !heap.has_pinned_heap() => None,
            SegmentQuery::Generation(gen) if gen < max && !heap.has_regions() => None,
            SegmentQuery::Generation(gen) => Some(gen),
        };

        let next = match (query, list_gen) {
            (SegmentQuery::Generation(gen), None) if gen < max => heap.ephemeral_segment(),
            (_, Some(gen)) => heap.generation(gen).map(|g| g.start_segment).unwrap_or_default(),
            _ => Address::NULL,
        };

        Self {
            dac,
            heap,
            query,
            next,
            seen: AHashSet::new(),
            done: false,
        }
    }

    fn kind_for(&self, address: Address, flags: SegmentFlags) -> SegmentKind {
        let heap = self.heap;
        let gen = match self.query {
            SegmentQuery::Frozen => return SegmentKind::Frozen,
            SegmentQuery::Generation(gen) => gen,
        };

        if gen == heap.large_generation() {
            SegmentKind::Large
        } else if gen == heap.pinned_generation() {
            SegmentKind::Pinned
        } else if !heap.has_regions() && (gen < heap.max_generation() || address == heap.ephemeral_segment()) {
            SegmentKind::Ephemeral
        } else if flags.contains(SegmentFlags::READ_ONLY) {
            SegmentKind::Frozen
        } else if heap.has_regions() {
            SegmentKind::Region(gen)
        } else {
            SegmentKind::Small
        }
    }
}

impl<'a> Iterator for SegmentChain<'a> {
    type Item = Result<HeapSegment, HeapError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || self.next.is_null() {
                return None;
            }

            let address = self.next;
            if !self.seen.insert(address) {
                log::warn!("Segment list loops back to {}, stopping", address);
                self.done = true;
                return None;
            }

            let data = match self.dac.heap_segment_data(address, self.heap.context()) {
                Ok(data) => data,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };

            let flags = SegmentFlags::from_bits_retain(data.flags);
            let kind = self.kind_for(address, flags);
            self.next = data.next;
            if kind == SegmentKind::Ephemeral {
                // the classic chain ends at the ephemeral segment
                self.done = true;
            }

            if self.query == SegmentQuery::Frozen && !flags.contains(SegmentFlags::READ_ONLY) {
                continue;
            }

            return Some(Ok(HeapSegment::new(data, kind, self.heap)));
        }
    }
}

pub fn segments_in_generation<'a>(
    dac: &'a dyn DataAccess,
    heap: &'a HeapDetails,
    query: SegmentQuery,
) -> SegmentChain<'a> {
    SegmentChain::new(dac, heap, query)
}

/// Every segment of `heap` in traversal order.
///
/// Classic: max-gen chain without the ephemeral segment, the ephemeral
/// segment, LOH, POH. Regions: gen 0 up to max gen, LOH, POH. A list that
/// fails partway is reported through `failures` and the other lists still
/// run.
pub fn collect_heap_segments(
    dac: &dyn DataAccess,
    heap: &HeapDetails,
    interrupt: &InterruptFlag,
    failures: &mut Vec<HeapError>,
) -> Result<Vec<HeapSegment>, HeapError> {
    let mut segments = Vec::new();
    let max = heap.max_generation();

    let small_gens: Vec<u32> = if heap.has_regions() { (0..=max).collect() } else { vec![max] };
    let mut lists: Vec<u32> = small_gens;
    lists.push(heap.large_generation());
    if heap.has_pinned_heap() {
        lists.push(heap.pinned_generation());
    }

    let mut ephemeral = None;
    for gen in lists {
        for segment in segments_in_generation(dac, heap, SegmentQuery::Generation(gen)) {
            interrupt.check()?;
            match segment {
                Ok(seg) if seg.kind() == SegmentKind::Ephemeral => ephemeral = Some(seg),
                Ok(seg) => segments.push(seg),
                Err(e) => {
                    log::warn!("Heap {}: generation {} segment list is unreadable: {}", heap.index(), gen, e);
                    failures.push(e);
                }
            }
        }

        if gen == max && !heap.has_regions() {
            if ephemeral.is_none() && !heap.ephemeral_segment().is_null() {
                match dac.heap_segment_data(heap.ephemeral_segment(), heap.context()) {
                    Ok(data) => ephemeral = Some(HeapSegment::new(data, SegmentKind::Ephemeral, heap)),
                    Err(e) => {
                        log::warn!("Heap {}: ephemeral segment is unreadable: {}", heap.index(), e);
                        failures.push(e.into());
                    }
                }
            }
            segments.extend(ephemeral.take());
        }
    }

    log::debug!("Heap {}: {} segments", heap.index(), segments.len());
    Ok(segments)
}
