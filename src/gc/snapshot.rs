// Tue Jan 13 2026 - Alex

use crate::dac::DataAccess;
use crate::gc::{collect_heap_segments, HeapDetails, HeapError, HeapSegment, InterruptFlag};
use crate::memory::{Address, MemoryRange};

/// Heaps and segments of the target, read once per command.
///
/// Owns the heap details and the flat segment list; `segment_of` answers
/// address lookups through a sorted range index.
#[derive(Debug, Clone)]
pub struct HeapSnapshot {
    server: bool,
    max_generation: u32,
    heaps: Vec<HeapDetails>,
    segments: Vec<HeapSegment>,
    index: Vec<(MemoryRange, usize)>,
    failures: Vec<HeapError>,
}

impl HeapSnapshot {
    pub fn build(dac: &dyn DataAccess, interrupt: &InterruptFlag) -> Result<Self, HeapError> {
        let data = dac.gc_heap_data()?;
        if !data.structures_valid {
            log::warn!("GC structures are not in a valid state; results may be incomplete");
        }

        let mut failures = Vec::new();
        let mut heaps = Vec::new();
        if data.server_mode {
            for (index, address) in dac.gc_heap_list()?.into_iter().enumerate() {
                interrupt.check()?;
                match dac.gc_heap_details(Some(address)) {
                    Ok(details) => heaps.push(HeapDetails::new(index, true, data.max_generation, details)),
                    Err(e) => {
                        log::warn!("Heap {} at {} skipped: {}", index, address, e);
                        failures.push(e.into());
                    }
                }
            }
        } else {
            let details = dac.gc_heap_details(None)?;
            heaps.push(HeapDetails::new(0, false, data.max_generation, details));
        }

        let mut segments = Vec::new();
        for heap in &heaps {
            segments.extend(collect_heap_segments(dac, heap, interrupt, &mut failures)?);
        }

        let mut index: Vec<(MemoryRange, usize)> = segments
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                let end = seg.object_end().max(seg.data().high_alloc_mark);
                (MemoryRange::new(seg.mem(), end), i)
            })
            .filter(|(range, _)| !range.is_empty())
            .collect();
        index.sort_by_key(|(range, _)| range.start());

        log::debug!(
            "Snapshot: {} heap(s), {} segment(s), {} failure(s)",
            heaps.len(),
            segments.len(),
            failures.len()
        );

        Ok(Self {
            server: data.server_mode,
            max_generation: data.max_generation,
            heaps,
            segments,
            index,
            failures,
        })
    }

    pub fn is_server(&self) -> bool {
        self.server
    }

    pub fn max_generation(&self) -> u32 {
        self.max_generation
    }

    pub fn heaps(&self) -> &[HeapDetails] {
        &self.heaps
    }

    pub fn heap(&self, index: usize) -> Option<&HeapDetails> {
        self.heaps.iter().find(|h| h.index() == index)
    }

    /// Segments in traversal order.
    pub fn segments(&self) -> &[HeapSegment] {
        &self.segments
    }

    pub fn segments_of_heap(&self, index: usize) -> impl Iterator<Item = &HeapSegment> + '_ {
        self.segments.iter().filter(move |s| s.heap() == index)
    }

    /// Heap lists or heaps that could not be read while building.
    pub fn failures(&self) -> &[HeapError] {
        &self.failures
    }

    pub fn segment_of(&self, addr: Address) -> Option<&HeapSegment> {
        let after = self.index.partition_point(|(range, _)| range.start() <= addr);
        let (range, i) = self.index[..after].last()?;
        if range.contains(addr) {
            self.segments.get(*i)
        } else {
            None
        }
    }

    pub fn get_heap(&self, addr: Address) -> Option<&HeapDetails> {
        self.segment_of(addr).and_then(|seg| self.heap(seg.heap()))
    }

    /// `0..=max_gen` small generations, `max_gen + 1` LOH, `max_gen + 2`
    /// POH, `None` outside the GC heap.
    pub fn get_generation(&self, addr: Address) -> Option<u32> {
        let segment = self.segment_of(addr)?;
        let heap = self.heap(segment.heap())?;
        Some(segment.generation_of(addr, heap))
    }

    pub fn is_in_heap(&self, addr: Address) -> bool {
        self.segment_of(addr).is_some()
    }
}
