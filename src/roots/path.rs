// Tue Jan 13 2026 - Alex

use crate::gc::{HeapError, InterruptFlag};
use crate::memory::Address;
use crate::roots::{Reachability, Root, RootSet};
use ahash::AHashMap;
use serde::Serialize;
use std::collections::VecDeque;

/// A shortest chain of references from a root to an object. `chain`
/// starts at the root object and ends at the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootPath {
    pub root: Root,
    pub chain: Vec<Address>,
}

enum Step {
    Root(usize),
    From(Address),
}

/// Breadth-first search from every root for `target`. Dependent handles
/// count as an edge from primary to secondary.
pub fn find_root_path(
    reachability: &Reachability<'_>,
    interrupt: &InterruptFlag,
    roots: &RootSet,
    target: Address,
) -> Result<Option<RootPath>, HeapError> {
    let mut came_from: AHashMap<Address, Step> = AHashMap::new();
    let mut queue = VecDeque::new();

    for (i, root) in roots.roots().iter().enumerate() {
        if !came_from.contains_key(&root.object) {
            came_from.insert(root.object, Step::Root(i));
            queue.push_back(root.object);
        }
    }

    let dependent = roots.dependent_handles();
    while let Some(obj) = queue.pop_front() {
        interrupt.check()?;
        if obj == target {
            return Ok(Some(rebuild(roots, &came_from, target)?));
        }
        let Some(view) = reachability.view(obj) else {
            continue;
        };

        let children = reachability.children(&view);
        for child in children.into_iter().chain(dependent.secondaries(obj).iter().copied()) {
            if !came_from.contains_key(&child) {
                came_from.insert(child, Step::From(obj));
                queue.push_back(child);
            }
        }
    }
    Ok(None)
}

fn rebuild(roots: &RootSet, came_from: &AHashMap<Address, Step>, target: Address) -> Result<RootPath, HeapError> {
    let mut chain = vec![target];
    let mut current = target;
    loop {
        match came_from.get(&current) {
            Some(Step::From(parent)) => {
                current = *parent;
                chain.push(current);
            }
            Some(Step::Root(i)) => {
                chain.reverse();
                let root = roots.roots()[*i];
                return Ok(RootPath { root, chain });
            }
            None => {
                return Err(HeapError::InvariantBroken(format!("{} was queued without a parent", current)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dac::HandleKind;
    use crate::memory::Address;
    use crate::replay::fixture::{self, Fixture};
    use crate::roots::RootSource;

    fn a(value: u64) -> Address {
        Address::new(value)
    }

    #[test]
    fn test_shortest_path_from_root() {
        let mut fx = Fixture::regions();
        fx.region(0, a(0x30_0000), a(0x30_0090));
        let (p, q, r, t) = (a(0x30_0000), a(0x30_0028), a(0x30_0050), a(0x30_0078));
        // p -> q -> r -> t and p -> r
        fx.node(p, q, r);
        fx.node(q, r, Address::NULL);
        fx.node(r, t, Address::NULL);
        fx.object(t, fixture::PLAIN_MT);
        let handle = fx.handle(HandleKind::Strong, p, Address::NULL);
        let session = fx.session();

        let path = session.root_path(t).unwrap().unwrap();
        assert_eq!(path.chain, vec![p, r, t]);
        assert_eq!(
            path.root.source,
            RootSource::Handle {
                handle,
                kind: HandleKind::Strong
            }
        );
        let unreached = fx.session().root_path(a(0x40_0000)).unwrap();
        assert!(unreached.is_none());
    }

    #[test]
    fn test_path_through_dependent_handle() {
        let mut fx = Fixture::regions();
        fx.region(0, a(0x30_0000), a(0x30_0030));
        let (p, q) = (a(0x30_0000), a(0x30_0018));
        fx.object(p, fixture::PLAIN_MT);
        fx.object(q, fixture::PLAIN_MT);
        fx.handle(HandleKind::Strong, p, Address::NULL);
        fx.handle(HandleKind::Dependent, p, q);
        let session = fx.session();

        assert_eq!(session.root_path(q).unwrap().unwrap().chain, vec![p, q]);
        assert_eq!(session.root_path(p).unwrap().unwrap().chain, vec![p]);
    }
}
