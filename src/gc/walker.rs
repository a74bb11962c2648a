// Tue Jan 13 2026 - Alex

use crate::gc::{AllocationContexts, HeapError, HeapSegment, InterruptFlag, ObjectReader, ObjectView};
use crate::memory::{Address, MemoryRange};

/// Outcome of one walker step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStep {
    Object(ObjectView),
    EndOfSegment,
    /// The walk of this segment cannot continue.
    Corrupt(HeapError),
    Interrupted,
}

/// Linear sweep over one segment, yielding objects in address order.
///
/// Allocation contexts are skipped. The first bad object ends the walk
/// with [`WalkStep::Corrupt`] naming the last good object.
pub struct ObjectWalker<'a> {
    reader: ObjectReader<'a>,
    contexts: &'a AllocationContexts,
    interrupt: &'a InterruptFlag,
    large: bool,
    curr: u64,
    end: u64,
    last_good: Option<Address>,
    finished: bool,
}

impl<'a> ObjectWalker<'a> {
    pub fn new(
        reader: ObjectReader<'a>,
        contexts: &'a AllocationContexts,
        segment: &HeapSegment,
        interrupt: &'a InterruptFlag,
    ) -> Self {
        Self::over_range(reader, contexts, segment.object_range(), segment.is_large_or_pinned(), interrupt)
    }

    /// Walks `range` as if it were a segment. `range.start()` must be the
    /// address of an object.
    pub fn over_range(
        reader: ObjectReader<'a>,
        contexts: &'a AllocationContexts,
        range: MemoryRange,
        large: bool,
        interrupt: &'a InterruptFlag,
    ) -> Self {
        Self {
            reader,
            contexts,
            interrupt,
            large,
            curr: range.start().as_u64(),
            end: range.end().as_u64(),
            last_good: None,
            finished: false,
        }
    }

    pub fn last_good(&self) -> Option<Address> {
        self.last_good
    }

    fn corrupt(&mut self, reason: impl Into<String>) -> WalkStep {
        self.finished = true;
        WalkStep::Corrupt(HeapError::corrupt(Address::new(self.curr), self.last_good, reason))
    }

    pub fn step(&mut self) -> WalkStep {
        let layout = *self.reader.layout();
        let aligned_min = layout.aligned_min_object_size();

        loop {
            if self.finished {
                return WalkStep::EndOfSegment;
            }
            if self.interrupt.is_raised() {
                self.finished = true;
                return WalkStep::Interrupted;
            }

            if self.curr == self.end {
                self.finished = true;
                return WalkStep::EndOfSegment;
            }
            // small object segments end with room for one minimal object
            if !self.large && self.curr.checked_sub(layout.header_size()) == self.end.checked_sub(aligned_min) {
                self.finished = true;
                return WalkStep::EndOfSegment;
            }
            if self.curr > self.end {
                let reason = format!("walk passed the end of the segment at {}", Address::new(self.end));
                return self.corrupt(reason);
            }

            let addr = Address::new(self.curr);
            let mt = match self.reader.method_table_of(addr) {
                Ok(mt) => mt,
                Err(_) => return self.corrupt("method table slot is unreadable"),
            };

            if mt.is_null() {
                match self.contexts.skip_target(addr, aligned_min) {
                    Some(next) => {
                        if next.as_u64() <= self.curr {
                            return self.corrupt("allocation context limit precedes its pointer");
                        }
                        log::trace!("Skipping allocation context {} to {}", addr, next);
                        if next.as_u64() >= self.end {
                            // the context reaches the end of the segment
                            self.finished = true;
                            return WalkStep::EndOfSegment;
                        }
                        self.curr = next.as_u64();
                        continue;
                    }
                    None => return self.corrupt("null method table outside an allocation context"),
                }
            }

            let view = match self.reader.view(addr, self.large) {
                Ok(view) => view,
                Err(HeapError::UnknownType(_)) => {
                    return self.corrupt(format!("method table {} is not valid", mt));
                }
                Err(HeapError::CorruptObject { reason, .. }) => return self.corrupt(reason),
                Err(e) => return self.corrupt(format!("object header unreadable: {}", e)),
            };

            match self.curr.checked_add(view.size) {
                Some(next) => self.curr = next,
                None => return self.corrupt("object size overflows the address space"),
            }
            self.last_good = Some(addr);
            log::trace!("Object {} mt {} size {}", addr, mt, view.size);
            return WalkStep::Object(view);
        }
    }
}

impl<'a> Iterator for ObjectWalker<'a> {
    type Item = Result<ObjectView, HeapError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            WalkStep::Object(view) => Some(Ok(view)),
            WalkStep::EndOfSegment => None,
            WalkStep::Corrupt(e) => Some(Err(e)),
            WalkStep::Interrupted => Some(Err(HeapError::Interrupted)),
        }
    }
}
