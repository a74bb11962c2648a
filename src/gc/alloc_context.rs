// Tue Jan 13 2026 - Alex

use crate::dac::DataAccess;
use crate::gc::{HeapDetails, HeapError, InterruptFlag};
use crate::memory::Address;
use ahash::{AHashMap, AHashSet};

/// Allocation contexts of every thread, the global context and each
/// heap's gen 0 context, keyed by `alloc_ptr`.
///
/// The range `[alloc_ptr, alloc_limit + align(min_object_size))` holds no
/// parseable objects and is skipped by linear walks.
#[derive(Debug, Clone, Default)]
pub struct AllocationContexts {
    contexts: AHashMap<Address, Address>,
}

impl AllocationContexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(dac: &dyn DataAccess, heaps: &[HeapDetails], interrupt: &InterruptFlag) -> Result<Self, HeapError> {
        let mut contexts = Self::new();
        contexts.collect_threads(dac, interrupt)?;

        match dac.global_allocation_context() {
            Ok(Some(global)) => contexts.insert(global.alloc_ptr, global.alloc_limit),
            Ok(None) => {}
            Err(e) => log::debug!("No global allocation context: {}", e),
        }

        for heap in heaps {
            if let Some(gen0) = heap.generation(0) {
                contexts.insert(gen0.alloc_context_ptr, gen0.alloc_context_limit);
            }
        }

        log::debug!("{} allocation contexts", contexts.len());
        Ok(contexts)
    }

    fn collect_threads(&mut self, dac: &dyn DataAccess, interrupt: &InterruptFlag) -> Result<(), HeapError> {
        let store = match dac.thread_store() {
            Ok(store) => store,
            Err(e) => {
                log::warn!("Thread store unreadable, thread allocation contexts skipped: {}", e);
                return Ok(());
            }
        };

        let mut seen = AHashSet::new();
        let mut next = store.first_thread;
        while !next.is_null() && seen.insert(next) {
            interrupt.check()?;
            match dac.thread_data(next) {
                Ok(thread) => {
                    self.insert(thread.alloc_context_ptr, thread.alloc_context_limit);
                    next = thread.next_thread;
                }
                Err(e) => {
                    log::warn!("Thread {} unreadable, remaining threads skipped: {}", next, e);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Records a context; null pointers are ignored and the first limit
    /// seen for a pointer wins. A limit below its pointer is dropped.
    pub fn insert(&mut self, alloc_ptr: Address, alloc_limit: Address) {
        if alloc_ptr.is_null() {
            return;
        }
        if alloc_limit < alloc_ptr {
            log::warn!("Allocation context {} has limit {} below it, ignored", alloc_ptr, alloc_limit);
            return;
        }
        if let Some(existing) = self.contexts.get(&alloc_ptr) {
            if *existing != alloc_limit {
                log::debug!(
                    "Allocation context {} has limits {} and {}, keeping the first",
                    alloc_ptr,
                    existing,
                    alloc_limit
                );
            }
            return;
        }
        self.contexts.insert(alloc_ptr, alloc_limit);
    }

    /// Where a walk that reached `addr` resumes, if `addr` starts a context.
    pub fn skip_target(&self, addr: Address, aligned_min_object_size: u64) -> Option<Address> {
        self.contexts
            .get(&addr)
            .map(|limit| Address::new(limit.as_u64().saturating_add(aligned_min_object_size)))
    }

    /// True when `addr` lies in a reserved context range.
    pub fn covers(&self, addr: Address, aligned_min_object_size: u64) -> bool {
        self.contexts
            .iter()
            .any(|(ptr, limit)| addr >= *ptr && addr.as_u64() < limit.as_u64().saturating_add(aligned_min_object_size))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, Address)> + '_ {
        self.contexts.iter().map(|(ptr, limit)| (*ptr, *limit))
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::fixture::Fixture;

    #[test]
    fn test_collects_threads_global_and_gen0() {
        let mut fx = Fixture::classic();
        fx.thread(1, Address::new(0x10_0100), Address::new(0x10_0200));
        fx.thread(2, Address::NULL, Address::NULL);
        fx.thread(3, Address::new(0x10_0400), Address::new(0x10_0440));
        fx.global_alloc_context(Address::new(0x10_0800), Address::new(0x10_0900));
        fx.gen0_alloc_context(Address::new(0x10_0100), Address::new(0x10_0200));
        let session = fx.session();

        let contexts = session.allocation_contexts();
        assert_eq!(contexts.len(), 3);
        assert_eq!(contexts.skip_target(Address::new(0x10_0400), 24), Some(Address::new(0x10_0458)));
        assert_eq!(contexts.skip_target(Address::new(0x10_0408), 24), None);
        assert!(contexts.covers(Address::new(0x10_0210), 24));
        assert!(!contexts.covers(Address::new(0x10_0218), 24));
    }

    #[test]
    fn test_null_context_ignored() {
        let mut contexts = AllocationContexts::new();
        contexts.insert(Address::NULL, Address::new(0x100));
        assert!(contexts.is_empty());
        contexts.insert(Address::new(0x100), Address::new(0x200));
        contexts.insert(Address::new(0x100), Address::new(0x300));
        assert_eq!(contexts.skip_target(Address::new(0x100), 24), Some(Address::new(0x218)));
    }

    #[test]
    fn test_inverted_context_dropped() {
        let mut contexts = AllocationContexts::new();
        contexts.insert(Address::new(0x30_0018), Address::new(0x30_0000));
        assert!(contexts.is_empty());
        contexts.insert(Address::new(0x30_0018), Address::new(0x30_0018));
        assert_eq!(contexts.skip_target(Address::new(0x30_0018), 24), Some(Address::new(0x30_0030)));
        contexts.insert(Address::new(0x40_0000), Address::new(u64::MAX));
        assert_eq!(contexts.skip_target(Address::new(0x40_0000), 24), Some(Address::new(u64::MAX)));
    }
}
