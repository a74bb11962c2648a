// Tue Jan 13 2026 - Alex

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatEntry<K> {
    pub key: K,
    pub count: u64,
    pub total_size: u64,
}

#[derive(Debug, Clone)]
struct Node<K> {
    entry: StatEntry<K>,
    left: Option<usize>,
    right: Option<usize>,
}

/// Count and size aggregator keyed by type, string prefix or any other
/// ordered key.
///
/// Entries are kept in a binary search tree over an arena. `sort` rebuilds
/// the same nodes into a tree ordered by total size; after that, iteration
/// yields the largest totals first, ties in key order.
#[derive(Debug, Clone)]
pub struct HeapStat<K> {
    nodes: Vec<Node<K>>,
    root: Option<usize>,
    by_size: bool,
    inert: bool,
    objects: u64,
    bytes: u64,
}

impl<K: Ord + Clone> HeapStat<K> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            by_size: false,
            inert: false,
            objects: 0,
            bytes: 0,
        }
    }

    pub fn add(&mut self, key: &K, size: u64) {
        if self.inert {
            return;
        }
        if self.by_size {
            self.rebuild(false);
        }

        let mut link = self.root;
        let mut parent: Option<(usize, bool)> = None;
        while let Some(i) = link {
            let node = &mut self.nodes[i];
            if *key == node.entry.key {
                node.entry.count += 1;
                node.entry.total_size += size;
                self.objects += 1;
                self.bytes += size;
                return;
            }
            let go_left = *key < node.entry.key;
            parent = Some((i, go_left));
            link = if go_left { node.left } else { node.right };
        }

        if let Err(e) = self.nodes.try_reserve(1) {
            log::error!("Out of memory adding to heap statistics, further objects are not counted: {}", e);
            self.inert = true;
            return;
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            entry: StatEntry {
                key: key.clone(),
                count: 1,
                total_size: size,
            },
            left: None,
            right: None,
        });
        self.link(parent, index);
        self.objects += 1;
        self.bytes += size;
    }

    fn link(&mut self, parent: Option<(usize, bool)>, index: usize) {
        match parent {
            None => self.root = Some(index),
            Some((p, true)) => self.nodes[p].left = Some(index),
            Some((p, false)) => self.nodes[p].right = Some(index),
        }
    }

    /// Reorders entries by descending total size.
    pub fn sort(&mut self) {
        if !self.by_size {
            self.rebuild(true);
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.by_size
    }

    /// Relinks every node, inserting in the current in-order sequence.
    fn rebuild(&mut self, by_size: bool) {
        let order = self.in_order();
        self.root = None;
        for node in &mut self.nodes {
            node.left = None;
            node.right = None;
        }

        for index in order {
            let mut link = self.root;
            let mut parent = None;
            while let Some(i) = link {
                let go_left = if by_size {
                    self.nodes[index].entry.total_size > self.nodes[i].entry.total_size
                } else {
                    self.nodes[index].entry.key < self.nodes[i].entry.key
                };
                parent = Some((i, go_left));
                link = if go_left { self.nodes[i].left } else { self.nodes[i].right };
            }
            self.link(parent, index);
        }
        self.by_size = by_size;
    }

    fn in_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut current = self.root;
        while current.is_some() || !stack.is_empty() {
            while let Some(i) = current {
                stack.push(i);
                current = self.nodes[i].left;
            }
            if let Some(i) = stack.pop() {
                order.push(i);
                current = self.nodes[i].right;
            }
        }
        order
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatEntry<K>> + '_ {
        self.in_order().into_iter().map(move |i| &self.nodes[i].entry)
    }

    pub fn each<F: FnMut(&StatEntry<K>)>(&self, mut f: F) {
        for entry in self.iter() {
            f(entry);
        }
    }

    pub fn get(&self, key: &K) -> Option<&StatEntry<K>> {
        if self.by_size {
            return self.nodes.iter().map(|n| &n.entry).find(|e| e.key == *key);
        }
        let mut link = self.root;
        while let Some(i) = link {
            let entry = &self.nodes[i].entry;
            if *key == entry.key {
                return Some(entry);
            }
            link = if *key < entry.key { self.nodes[i].left } else { self.nodes[i].right };
        }
        None
    }

    /// Distinct keys.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Object count and byte total over every key.
    pub fn total(&self) -> (u64, u64) {
        (self.objects, self.bytes)
    }

    /// Set once an allocation failed; later adds are ignored.
    pub fn is_inert(&self) -> bool {
        self.inert
    }
}

impl<K: Ord + Clone> Default for HeapStat<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone + Serialize> Serialize for HeapStat<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for entry in self.iter() {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(stat: &HeapStat<&'static str>) -> Vec<(&'static str, u64, u64)> {
        stat.iter().map(|e| (e.key, e.count, e.total_size)).collect()
    }

    #[test]
    fn test_build_in_key_order() {
        let mut stat = HeapStat::new();
        for (key, size) in [("m", 24), ("c", 40), ("x", 16), ("c", 40), ("a", 8)] {
            stat.add(&key, size);
        }
        assert_eq!(sizes(&stat), vec![("a", 1, 8), ("c", 2, 80), ("m", 1, 24), ("x", 1, 16)]);
        assert_eq!(stat.total(), (5, 128));
        assert_eq!(stat.get(&"c").map(|e| e.count), Some(2));
    }

    #[test]
    fn test_sort_descending_with_ties_by_key() {
        let mut stat = HeapStat::new();
        for (key, size) in [("m", 24), ("c", 40), ("x", 24), ("c", 40), ("a", 8), ("b", 24)] {
            stat.add(&key, size);
        }
        stat.sort();
        assert!(stat.is_sorted());
        assert_eq!(
            sizes(&stat),
            vec![("c", 2, 80), ("b", 1, 24), ("m", 1, 24), ("x", 1, 24), ("a", 1, 8)]
        );
        let totals: Vec<_> = stat.iter().map(|e| e.total_size).collect();
        assert!(totals.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_add_after_sort_keeps_counting() {
        let mut stat = HeapStat::new();
        stat.add(&"a", 8);
        stat.add(&"b", 16);
        stat.sort();
        stat.add(&"a", 16);
        assert!(!stat.is_sorted());
        assert_eq!(stat.get(&"a").map(|e| e.total_size), Some(24));
        stat.sort();
        assert_eq!(sizes(&stat), vec![("a", 2, 24), ("b", 1, 16)]);
    }

    #[test]
    fn test_serializes_as_entries() {
        let mut stat = HeapStat::new();
        stat.add(&"a", 8);
        let json = serde_json::to_string(&stat).unwrap();
        assert_eq!(json, r#"[{"key":"a","count":1,"total_size":8}]"#);
    }
}
