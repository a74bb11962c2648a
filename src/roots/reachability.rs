// Tue Jan 13 2026 - Alex

use crate::gc::{HeapError, HeapSnapshot, InterruptFlag, ObjectReader, ObjectView};
use crate::memory::Address;
use crate::roots::RootSet;
use ahash::{AHashMap, AHashSet};

/// Objects reached from a root set, with their sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSet {
    objects: AHashMap<Address, u64>,
}

impl LiveSet {
    pub fn contains(&self, addr: Address) -> bool {
        self.objects.contains_key(&addr)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn bytes(&self) -> u64 {
        self.objects.values().sum()
    }

    /// Live objects in address order.
    pub fn sorted(&self) -> Vec<Address> {
        let mut objects: Vec<_> = self.objects.keys().copied().collect();
        objects.sort_unstable();
        objects
    }
}

/// Marks the object graph from a root set.
pub struct Reachability<'a> {
    snapshot: &'a HeapSnapshot,
    reader: ObjectReader<'a>,
    interrupt: &'a InterruptFlag,
}

impl<'a> Reachability<'a> {
    pub fn new(snapshot: &'a HeapSnapshot, reader: ObjectReader<'a>, interrupt: &'a InterruptFlag) -> Self {
        Self {
            snapshot,
            reader,
            interrupt,
        }
    }

    /// Depth-first mark from every root, then repeated passes over the
    /// dependent handles until no pass marks anything new.
    pub fn mark(&self, roots: &RootSet) -> Result<LiveSet, HeapError> {
        let mut live = LiveSet::default();
        let mut rejected = AHashSet::new();
        let mut stack: Vec<Address> = roots.objects().collect();
        let mut passes = 0;

        loop {
            passes += 1;
            self.drain(&mut stack, &mut live, &mut rejected)?;

            for (primary, secondaries) in roots.dependent_handles().iter() {
                self.interrupt.check()?;
                if live.contains(primary) {
                    stack.extend(
                        secondaries
                            .iter()
                            .copied()
                            .filter(|s| !live.contains(*s) && !rejected.contains(s)),
                    );
                }
            }
            if stack.is_empty() {
                break;
            }
        }

        log::debug!(
            "{} live objects ({} bytes) after {} pass(es)",
            live.len(),
            live.bytes(),
            passes
        );
        Ok(live)
    }

    fn drain(
        &self,
        stack: &mut Vec<Address>,
        live: &mut LiveSet,
        rejected: &mut AHashSet<Address>,
    ) -> Result<(), HeapError> {
        while let Some(obj) = stack.pop() {
            self.interrupt.check()?;
            if live.contains(obj) || rejected.contains(&obj) {
                continue;
            }
            let Some(view) = self.view(obj) else {
                rejected.insert(obj);
                continue;
            };
            live.objects.insert(obj, view.size);
            stack.extend(self.children(&view).into_iter().filter(|c| !live.contains(*c)));
        }
        Ok(())
    }

    /// The object at `obj`, or `None` when it is outside the GC heap or
    /// does not parse.
    pub fn view(&self, obj: Address) -> Option<ObjectView> {
        let segment = self.snapshot.segment_of(obj)?;
        match self.reader.view(obj, segment.is_large_or_pinned()) {
            Ok(view) => Some(view),
            Err(e) => {
                log::warn!("Reference to {} not followed: {}", obj, e);
                None
            }
        }
    }

    /// Non-null outbound references; a read failure ends the list early.
    pub fn children(&self, view: &ObjectView) -> Vec<Address> {
        let references = match self.reader.references(view) {
            Ok(references) => references,
            Err(e) => {
                log::warn!("References of {} unreadable: {}", view.address, e);
                return Vec::new();
            }
        };

        let mut children = Vec::new();
        for reference in references {
            match reference {
                Ok(r) if !r.target.is_null() => children.push(r.target),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("{}", e);
                    break;
                }
            }
        }
        children
    }
}
