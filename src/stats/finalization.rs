// Tue Jan 13 2026 - Alex

use crate::gc::{HeapError, HeapSnapshot, InterruptFlag, ObjectReader};
use crate::memory::{Address, MemoryRange};
use crate::roots::LiveSet;
use crate::stats::HeapStat;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueueList {
    /// Registered for finalization and promoted into this generation.
    Generation(u32),
    /// Found dead; waiting for the finalizer thread.
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueRange {
    pub heap: usize,
    pub list: QueueList,
    pub start: Address,
    pub end: Address,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FinalizerSummary {
    pub ranges: Vec<QueueRange>,
    pub finalizable: u64,
    pub ready: u64,
    /// Queue entries by method table.
    pub by_type: HeapStat<Address>,
    /// Registered objects that no root reaches; they are finalized at the
    /// next collection of their generation.
    pub unreachable: Option<Vec<Address>>,
}

/// Reads every heap's finalize queue.
pub fn summarize(
    snapshot: &HeapSnapshot,
    reader: ObjectReader<'_>,
    interrupt: &InterruptFlag,
    live: Option<&LiveSet>,
) -> Result<FinalizerSummary, HeapError> {
    let mut summary = FinalizerSummary {
        unreachable: live.map(|_| Vec::new()),
        ..Default::default()
    };
    let ptr = reader.layout().pointer_size();

    for heap in snapshot.heaps() {
        let queue = heap.finalize_queue();
        if !queue.is_present() {
            log::debug!("Heap {} has no finalize queue", heap.index());
            continue;
        }

        let mut lists: Vec<(QueueList, MemoryRange)> = (0..=heap.max_generation())
            .filter_map(|gen| queue.generation_range(gen).map(|r| (QueueList::Generation(gen), r)))
            .collect();
        lists.extend(queue.ready_range().map(|r| (QueueList::Ready, r)));

        for (list, range) in lists {
            let count = range.size() / ptr;
            summary.ranges.push(QueueRange {
                heap: heap.index(),
                list,
                start: range.start(),
                end: range.end(),
                count,
            });

            let mut slot = range.start();
            while slot < range.end() {
                interrupt.check()?;
                let object = match reader.memory().read_ptr(slot) {
                    Ok(object) => object,
                    Err(e) => {
                        log::warn!("Finalize queue of heap {} unreadable at {}: {}", heap.index(), slot, e);
                        break;
                    }
                };
                slot = slot + ptr;
                if object.is_null() {
                    continue;
                }

                match list {
                    QueueList::Ready => summary.ready += 1,
                    QueueList::Generation(_) => {
                        summary.finalizable += 1;
                        if let (Some(live), Some(unreachable)) = (live, summary.unreachable.as_mut()) {
                            if !live.contains(object) {
                                unreachable.push(object);
                            }
                        }
                    }
                }

                let large = snapshot.segment_of(object).map_or(false, |s| s.is_large_or_pinned());
                match reader.view(object, large) {
                    Ok(view) => summary.by_type.add(&view.method_table, view.size),
                    Err(e) => log::warn!("Finalize queue entry {} at {}: {}", object, slot - ptr, e),
                }
            }
        }
    }

    summary.by_type.sort();
    Ok(summary)
}
