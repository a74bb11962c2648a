// Tue Jan 13 2026 - Alex

use crate::gc::{
    AllocationContexts, HeapError, HeapSnapshot, InterruptFlag, ObjectReader, ObjectView, ObjectWalker,
    SegmentKind,
};
use crate::memory::Address;
use serde::Serialize;

/// Where an address lives in the GC heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub heap: usize,
    pub segment: Address,
    #[serde(skip)]
    pub kind: SegmentKind,
    pub generation: u32,
    /// The object whose bytes contain the address. `None` when the address
    /// falls in an allocation context or past a corrupt object.
    #[serde(skip)]
    pub object: Option<ObjectView>,
}

impl Location {
    pub fn object_address(&self) -> Option<Address> {
        self.object.map(|o| o.address)
    }
}

/// Finds the segment holding `addr` and walks it to the containing object.
/// `Ok(None)` means the address is not in the GC heap.
pub fn locate(
    snapshot: &HeapSnapshot,
    reader: ObjectReader<'_>,
    contexts: &AllocationContexts,
    interrupt: &InterruptFlag,
    addr: Address,
) -> Result<Option<Location>, HeapError> {
    let Some(segment) = snapshot.segment_of(addr) else {
        return Ok(None);
    };
    let Some(heap) = snapshot.heap(segment.heap()) else {
        return Err(HeapError::InvariantBroken(format!("segment {} belongs to no heap", segment.address())));
    };

    let mut object = None;
    for result in ObjectWalker::new(reader, contexts, segment, interrupt) {
        match result {
            Ok(view) if view.address > addr => break,
            Ok(view) if addr < view.end() => {
                object = Some(view);
                break;
            }
            Ok(_) => {}
            Err(HeapError::Interrupted) => return Err(HeapError::Interrupted),
            Err(e) => {
                log::warn!("{}", e);
                break;
            }
        }
    }

    let generation = segment.generation_of(object.map_or(addr, |o| o.address), heap);
    Ok(Some(Location {
        heap: segment.heap(),
        segment: segment.address(),
        kind: segment.kind(),
        generation,
        object,
    }))
}

#[cfg(test)]
mod tests {
    use crate::gc::HeapObject;
    use crate::memory::Address;
    use crate::replay::fixture::{self, Fixture};

    fn a(value: u64) -> Address {
        Address::new(value)
    }

    #[test]
    fn test_interior_address_resolves_to_object() {
        let mut fx = Fixture::regions();
        fx.region(1, a(0x30_0000), a(0x30_0040));
        fx.object(a(0x30_0000), fixture::PLAIN_MT);
        fx.record(a(0x30_0018));
        let session = fx.session();

        let location = session.locate(a(0x30_0030)).unwrap().unwrap();
        assert_eq!(location.object_address(), Some(a(0x30_0018)));
        assert_eq!(location.generation, 1);
        assert!(session.locate(a(0x1234)).unwrap().is_none());
    }

    #[test]
    fn test_locate_matches_traversal() {
        let mut fx = Fixture::classic();
        fx.small_segment(a(0x20_0000), a(0x20_0018));
        fx.object(a(0x20_0000), fixture::PLAIN_MT);
        fx.ephemeral_segment(a(0x30_0000), a(0x30_0018), a(0x30_0040), a(0x30_0058));
        fx.object(a(0x30_0000), fixture::PLAIN_MT);
        fx.record(a(0x30_0018));
        fx.object(a(0x30_0040), fixture::PLAIN_MT);
        let session = fx.session();

        let mut objects = Vec::new();
        session.traverse_all(&mut |o: &HeapObject| objects.push(*o), false).unwrap();
        assert_eq!(objects.len(), 4);
        for object in objects {
            let location = session.locate(object.address()).unwrap().unwrap();
            assert_eq!(location.heap, object.heap);
            assert_eq!(location.segment, object.segment);
            assert_eq!(location.generation, object.generation);
            assert_eq!(location.object, Some(object.view));
        }
    }

    #[test]
    fn test_address_in_allocation_context_has_no_object() {
        let mut fx = Fixture::regions();
        fx.region(0, a(0x30_0000), a(0x30_0060));
        fx.object(a(0x30_0000), fixture::PLAIN_MT);
        fx.thread(1, a(0x30_0018), a(0x30_0030));
        fx.object(a(0x30_0048), fixture::PLAIN_MT);
        let session = fx.session();

        let location = session.locate(a(0x30_0020)).unwrap().unwrap();
        assert!(location.object.is_none());
        assert_eq!(session.locate(a(0x30_0050)).unwrap().unwrap().object_address(), Some(a(0x30_0048)));
    }
}
