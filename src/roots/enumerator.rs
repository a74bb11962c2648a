// Tue Jan 13 2026 - Alex

use crate::dac::{DataAccess, HandleKind};
use crate::gc::{locate, AllocationContexts, HeapError, HeapSnapshot, InterruptFlag, ObjectReader};
use crate::memory::{Address, MemoryReader};
use crate::roots::DependentHandleMap;
use ahash::AHashSet;
use serde::Serialize;
use std::fmt;

/// Where a root was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RootSource {
    Stack { os_thread_id: u32, slot: Address },
    Handle { handle: Address, kind: HandleKind },
    Finalizer { heap: usize, slot: Address },
}

impl fmt::Display for RootSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootSource::Stack { os_thread_id, slot } => write!(f, "thread {:x} stack {}", os_thread_id, slot),
            RootSource::Handle { handle, kind } => write!(f, "{} handle {}", kind, handle),
            RootSource::Finalizer { heap, slot } => write!(f, "finalizer queue of heap {} at {}", heap, slot),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Root {
    /// Start of the rooted object; interior stack pointers are resolved
    /// to the object that contains them.
    pub object: Address,
    pub source: RootSource,
}

#[derive(Debug, Clone, Default)]
pub struct RootSet {
    roots: Vec<Root>,
    dependent: DependentHandleMap,
    failures: Vec<HeapError>,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, object: Address, source: RootSource) {
        if !object.is_null() {
            self.roots.push(Root { object, source });
        }
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    pub fn objects(&self) -> impl Iterator<Item = Address> + '_ {
        self.roots.iter().map(|r| r.object)
    }

    pub fn dependent_handles(&self) -> &DependentHandleMap {
        &self.dependent
    }

    pub fn dependent_handles_mut(&mut self) -> &mut DependentHandleMap {
        &mut self.dependent
    }

    /// Sources that could not be enumerated.
    pub fn failures(&self) -> &[HeapError] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Collects stack, handle and finalizer queue roots of a snapshot.
pub struct RootEnumerator<'a> {
    dac: &'a dyn DataAccess,
    snapshot: &'a HeapSnapshot,
    reader: ObjectReader<'a>,
    contexts: &'a AllocationContexts,
    interrupt: &'a InterruptFlag,
}

impl<'a> RootEnumerator<'a> {
    pub fn new(
        dac: &'a dyn DataAccess,
        snapshot: &'a HeapSnapshot,
        reader: ObjectReader<'a>,
        contexts: &'a AllocationContexts,
        interrupt: &'a InterruptFlag,
    ) -> Self {
        Self {
            dac,
            snapshot,
            reader,
            contexts,
            interrupt,
        }
    }

    /// Every source is tried; a source that fails is logged and recorded
    /// in the set. Only an interrupt or an unrecoverable error stops it.
    pub fn enumerate(&self) -> Result<RootSet, HeapError> {
        let mut set = RootSet::new();

        let sources: [(&str, fn(&Self, &mut RootSet) -> Result<(), HeapError>); 3] = [
            ("stack", Self::stack_roots),
            ("handle", Self::handle_roots),
            ("finalizer", Self::finalizer_roots),
        ];
        for (name, source) in sources {
            match source(self, &mut set) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    log::warn!("Enumerating {} roots failed: {}", name, e);
                    set.failures.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        log::debug!(
            "{} roots, {} dependent handle primaries, {} failed source(s)",
            set.len(),
            set.dependent.len(),
            set.failures.len()
        );
        Ok(set)
    }

    pub fn stack_roots(&self, set: &mut RootSet) -> Result<(), HeapError> {
        let store = self.dac.thread_store()?;
        let mut seen = AHashSet::new();
        let mut next = store.first_thread;

        while !next.is_null() && seen.insert(next) {
            self.interrupt.check()?;
            let thread = self.dac.thread_data(next)?;
            next = thread.next_thread;

            let refs = match self.dac.enumerate_stack_references(thread.os_thread_id) {
                Ok(refs) => refs,
                Err(e) => {
                    log::warn!("Stack of thread {:x} not walked: {}", thread.os_thread_id, e);
                    set.failures.push(e.into());
                    continue;
                }
            };

            for stack_ref in refs {
                if stack_ref.object.is_null() {
                    continue;
                }
                let object = if stack_ref.interior {
                    match self.resolve_interior(stack_ref.object)? {
                        Some(object) => object,
                        None => continue,
                    }
                } else {
                    stack_ref.object
                };
                set.push(
                    object,
                    RootSource::Stack {
                        os_thread_id: thread.os_thread_id,
                        slot: stack_ref.source,
                    },
                );
            }
        }
        Ok(())
    }

    fn resolve_interior(&self, addr: Address) -> Result<Option<Address>, HeapError> {
        let location = locate(self.snapshot, self.reader, self.contexts, self.interrupt, addr)?;
        Ok(location.and_then(|l| l.object_address()))
    }

    pub fn handle_roots(&self, set: &mut RootSet) -> Result<(), HeapError> {
        let memory = self.reader.memory();
        for handle in self.dac.enumerate_handles(None)? {
            self.interrupt.check()?;
            let object = match memory.read_ptr(handle.handle) {
                Ok(object) => object,
                Err(e) => {
                    log::warn!("{} handle {} unreadable: {}", handle.kind, handle.handle, e);
                    continue;
                }
            };
            if object.is_null() {
                continue;
            }

            if handle.kind == HandleKind::Dependent {
                set.dependent.insert(object, handle.secondary);
            } else if handle.strong {
                set.push(
                    object,
                    RootSource::Handle {
                        handle: handle.handle,
                        kind: handle.kind,
                    },
                );
            }
        }
        Ok(())
    }

    /// Objects waiting for the finalizer thread are roots until it runs.
    pub fn finalizer_roots(&self, set: &mut RootSet) -> Result<(), HeapError> {
        let memory = self.reader.memory();
        let ptr = self.reader.layout().pointer_size();

        for heap in self.snapshot.heaps() {
            let Some(range) = heap.finalize_queue().ready_range() else {
                continue;
            };
            let mut slot = range.start();
            while slot < range.end() {
                self.interrupt.check()?;
                let object = match memory.read_ptr(slot) {
                    Ok(object) => object,
                    Err(e) => {
                        log::warn!("Finalize queue of heap {} unreadable at {}: {}", heap.index(), slot, e);
                        break;
                    }
                };
                set.push(object, RootSource::Finalizer { heap: heap.index(), slot });
                slot = slot + ptr;
            }
        }
        Ok(())
    }
}
