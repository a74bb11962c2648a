// Tue Jan 13 2026 - Alex

use crate::gc::{HeapObject, HeapSnapshot, ObjectLayout, ObjectVisitor, SegmentKind};
use crate::roots::LiveSet;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationUsage {
    pub generation: u32,
    pub allocated: u64,
    pub committed: u64,
    pub free: u64,
    /// Bytes in objects not reached from any root; only known when a live
    /// set was supplied.
    pub unrooted: Option<u64>,
}

impl GenerationUsage {
    fn add(&mut self, other: &GenerationUsage) {
        self.allocated += other.allocated;
        self.committed += other.committed;
        self.free += other.free;
        self.unrooted = match (self.unrooted, other.unrooted) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeapUsage {
    pub heap: usize,
    /// Small object generations, then LOH, then POH.
    pub generations: Vec<GenerationUsage>,
}

impl HeapUsage {
    pub fn total(&self) -> GenerationUsage {
        let mut total = GenerationUsage::default();
        for gen in &self.generations {
            total.add(gen);
        }
        total
    }
}

/// Visitor that adds free and unrooted bytes to per-generation segment
/// sizes.
pub struct UsageCollector<'a> {
    usage: Vec<HeapUsage>,
    live: Option<&'a LiveSet>,
}

impl<'a> UsageCollector<'a> {
    pub fn new(snapshot: &HeapSnapshot, layout: &ObjectLayout, live: Option<&'a LiveSet>) -> Self {
        let generations = snapshot.max_generation() as usize + 3;
        let mut usage: Vec<HeapUsage> = snapshot
            .heaps()
            .iter()
            .map(|heap| HeapUsage {
                heap: heap.index(),
                generations: (0..generations as u32)
                    .map(|generation| GenerationUsage {
                        generation,
                        unrooted: live.map(|_| 0),
                        ..Default::default()
                    })
                    .collect(),
            })
            .collect();

        for segment in snapshot.segments() {
            let (Some(heap), Some(heap_usage)) = (snapshot.heap(segment.heap()), usage.get_mut(segment.heap())) else {
                continue;
            };
            let gens = &mut heap_usage.generations;
            let committed = segment.committed_range(layout);

            if segment.kind() == SegmentKind::Ephemeral {
                let max = heap.max_generation();
                for gen in 0..=max {
                    let size = heap.ephemeral_generation_range(gen, segment.mem()).size();
                    gens[gen as usize].allocated += size;
                    gens[gen as usize].committed += size;
                }
                // header page below mem and the committed tail past gen 0
                gens[max as usize].committed += segment.mem().distance_from(committed.start());
                gens[0].committed += committed.end().as_u64().saturating_sub(heap.alloc_allocated().as_u64());
            } else if let Some(gen) = gens.get_mut(segment.generation_of(segment.mem(), heap) as usize) {
                gen.allocated += segment.object_range().size();
                gen.committed += committed.size();
            }
        }

        Self { usage, live }
    }

    pub fn finish(self) -> Vec<HeapUsage> {
        self.usage
    }
}

impl<'a> ObjectVisitor for UsageCollector<'a> {
    fn visit(&mut self, object: &HeapObject) {
        let Some(gen) = self
            .usage
            .get_mut(object.heap)
            .and_then(|h| h.generations.get_mut(object.generation as usize))
        else {
            return;
        };
        if object.is_free {
            gen.free += object.size();
        } else if let (Some(live), Some(unrooted)) = (self.live, gen.unrooted.as_mut()) {
            if !live.contains(object.address()) {
                *unrooted += object.size();
            }
        }
    }
}
