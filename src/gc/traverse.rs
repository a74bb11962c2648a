// Tue Jan 13 2026 - Alex

use crate::config::HeapConfig;
use crate::gc::{
    AllocationContexts, HeapError, HeapSegment, HeapSnapshot, InterruptFlag, ObjectReader, ObjectView,
    ObjectWalker, SegmentKind,
};
use crate::memory::Address;
use crate::validation::{ObjectVerifier, VerificationReport};
use serde::Serialize;

/// One object as delivered to a visitor, with its place in the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapObject {
    pub view: ObjectView,
    pub heap: usize,
    pub segment: Address,
    pub generation: u32,
    pub is_free: bool,
    pub is_large: bool,
    pub is_pinned: bool,
    pub is_frozen: bool,
}

impl HeapObject {
    pub fn address(&self) -> Address {
        self.view.address
    }

    pub fn method_table(&self) -> Address {
        self.view.method_table
    }

    pub fn size(&self) -> u64 {
        self.view.size
    }
}

pub trait ObjectVisitor {
    fn visit(&mut self, object: &HeapObject);
}

impl<F: FnMut(&HeapObject)> ObjectVisitor for F {
    fn visit(&mut self, object: &HeapObject) {
        self(object)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TraversalSummary {
    pub objects: u64,
    pub free_objects: u64,
    pub bytes: u64,
    pub segments: usize,
    pub failed_segments: usize,
    #[serde(skip)]
    pub diagnostics: Vec<HeapError>,
    pub verification: Option<VerificationReport>,
}

impl TraversalSummary {
    /// No segment failed and, when verifying, no issue was found.
    pub fn is_clean(&self) -> bool {
        self.failed_segments == 0 && self.verification.as_ref().map_or(true, |v| v.is_clean())
    }
}

/// Drives the object walker over every segment of a snapshot in
/// traversal order.
pub struct HeapTraverser<'a> {
    snapshot: &'a HeapSnapshot,
    reader: ObjectReader<'a>,
    contexts: &'a AllocationContexts,
    interrupt: &'a InterruptFlag,
    config: &'a HeapConfig,
}

impl<'a> HeapTraverser<'a> {
    pub fn new(
        snapshot: &'a HeapSnapshot,
        reader: ObjectReader<'a>,
        contexts: &'a AllocationContexts,
        interrupt: &'a InterruptFlag,
        config: &'a HeapConfig,
    ) -> Self {
        Self {
            snapshot,
            reader,
            contexts,
            interrupt,
            config,
        }
    }

    pub fn classify(&self, view: ObjectView, segment: &HeapSegment) -> Option<HeapObject> {
        let heap = self.snapshot.heap(segment.heap())?;
        let kind = segment.kind();
        Some(HeapObject {
            view,
            heap: segment.heap(),
            segment: segment.address(),
            generation: segment.generation_of(view.address, heap),
            is_free: self.reader.is_free(view.method_table),
            is_large: kind == SegmentKind::Large,
            is_pinned: kind == SegmentKind::Pinned,
            is_frozen: kind == SegmentKind::Frozen,
        })
    }

    /// Visits every object. With `verify`, every non-free object is also
    /// checked and the walk goes on past the issues it finds.
    ///
    /// Only an interrupt, or an unrecoverable error, returns `Err`.
    pub fn traverse<V: ObjectVisitor + ?Sized>(&self, visitor: &mut V, verify: bool) -> Result<TraversalSummary, HeapError> {
        let verifier = if verify {
            Some(ObjectVerifier::new(self.reader, self.snapshot, self.config))
        } else {
            None
        };
        let mut report = VerificationReport::new(self.config.max_diagnostics);
        let mut summary = TraversalSummary::default();

        for segment in self.snapshot.segments() {
            self.interrupt.check()?;
            summary.segments += 1;
            log::debug!(
                "Walking {} segment {} [{}, {})",
                segment.kind(),
                segment.address(),
                segment.mem(),
                segment.object_end()
            );

            for result in ObjectWalker::new(self.reader, self.contexts, segment, self.interrupt) {
                let view = match result {
                    Ok(view) => view,
                    Err(e) if e.is_recoverable() => {
                        log::warn!("{}", e);
                        summary.failed_segments += 1;
                        if summary.diagnostics.len() < self.config.max_diagnostics {
                            summary.diagnostics.push(e);
                        }
                        break;
                    }
                    Err(e) => return Err(e),
                };

                let Some(object) = self.classify(view, segment) else {
                    return Err(HeapError::InvariantBroken(format!(
                        "segment {} belongs to no heap",
                        segment.address()
                    )));
                };

                summary.objects += 1;
                summary.bytes += object.size();
                if object.is_free {
                    summary.free_objects += 1;
                } else if let Some(verifier) = &verifier {
                    report.record(object.address(), verifier.verify(&object, segment));
                }
                visitor.visit(&object);
            }
        }

        if verifier.is_some() {
            summary.verification = Some(report);
        }
        log::debug!(
            "Traversed {} objects in {} segments, {} failed",
            summary.objects,
            summary.segments,
            summary.failed_segments
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::fixture::{self, Fixture};

    fn a(value: u64) -> Address {
        Address::new(value)
    }

    #[test]
    fn test_classifies_objects() {
        let mut fx = Fixture::classic();
        fx.ephemeral_segment(a(0x30_0000), a(0x30_0018), a(0x30_0030), a(0x30_0048));
        fx.object(a(0x30_0000), fixture::PLAIN_MT);
        fx.free(a(0x30_0018), 24);
        fx.object(a(0x30_0030), fixture::PLAIN_MT);
        fx.large_segment(a(0x40_0000), a(0x40_0018));
        fx.object(a(0x40_0000), fixture::PLAIN_MT);
        fx.pinned_segment(a(0x50_0000), a(0x50_0018));
        fx.object(a(0x50_0000), fixture::PLAIN_MT);
        let session = fx.session();

        let mut seen = Vec::new();
        let summary = session
            .traverse_all(&mut |o: &HeapObject| seen.push((o.address(), o.generation, o.is_free, o.is_large, o.is_pinned)), false)
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (a(0x30_0000), 2, false, false, false),
                (a(0x30_0018), 1, true, false, false),
                (a(0x30_0030), 0, false, false, false),
                (a(0x40_0000), 3, false, true, false),
                (a(0x50_0000), 4, false, false, true),
            ]
        );
        assert_eq!(summary.objects, 5);
        assert_eq!(summary.free_objects, 1);
        assert!(summary.is_clean());
        assert!(summary.verification.is_none());
    }

    #[test]
    fn test_corrupt_segment_does_not_stop_traversal() {
        let mut fx = Fixture::regions();
        fx.region(0, a(0x30_0000), a(0x30_0030));
        fx.object(a(0x30_0000), fixture::PLAIN_MT);
        fx.object(a(0x30_0018), a(0xdead_beef));
        fx.region(1, a(0x40_0000), a(0x40_0018));
        fx.object(a(0x40_0000), fixture::PLAIN_MT);
        let session = fx.session();

        let mut count = 0;
        let summary = session.traverse_all(&mut |_: &HeapObject| count += 1, false).unwrap();
        assert_eq!(count, 2);
        assert_eq!(summary.failed_segments, 1);
        assert_eq!(summary.diagnostics.len(), 1);
        assert_eq!(summary.diagnostics[0].address(), Some(a(0x30_0018)));
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_interrupt_aborts() {
        let mut fx = Fixture::regions();
        fx.region(0, a(0x30_0000), a(0x30_0018));
        fx.object(a(0x30_0000), fixture::PLAIN_MT);
        let session = fx.session();
        session.interrupt().raise();
        let result = session.traverse_all(&mut |_: &HeapObject| {}, false);
        assert_eq!(result.unwrap_err(), HeapError::Interrupted);
    }

    #[test]
    fn test_known_good_heap_verifies_clean() {
        let mut fx = Fixture::regions();
        fx.region(2, a(0x20_0000), a(0x20_0028 + 24));
        let leaf = a(0x20_0028);
        fx.node(a(0x20_0000), leaf, Address::NULL);
        fx.object(leaf, fixture::PLAIN_MT);
        let session = fx.session();

        let summary = session.traverse_all(&mut |_: &HeapObject| {}, true).unwrap();
        let report = summary.verification.as_ref().unwrap();
        assert_eq!(report.objects_checked(), 2);
        assert!(report.is_clean());
        assert!(summary.is_clean());
    }
}
