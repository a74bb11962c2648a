// Tue Jan 13 2026 - Alex

use crate::config::HeapConfig;
use crate::dac::{DataAccess, UsefulGlobals};
use crate::gc::{
    locate, AllocationContexts, HeapDetails, HeapError, HeapObject, HeapSnapshot, HeapTraverser, InterruptFlag,
    Location, MethodTableCache, MethodTableInfo, ObjectLayout, ObjectReader, ObjectVisitor, TraversalSummary,
};
use crate::memory::{Address, MemoryReader, PageCache};
use crate::replay::ReplayTarget;
use crate::roots::{find_root_path, LiveSet, Reachability, RootEnumerator, RootPath, RootSet};
use crate::stats::{summarize_finalization, FinalizerSummary, HeapStat, HeapUsage, UsageCollector};
use crate::utils::ScopedTimer;
use std::sync::Arc;

/// Everything one command needs: the target, the caches that live as long
/// as the command, and the heap snapshot.
///
/// Dropping the session drops the page cache and the method table cache.
pub struct HeapSession {
    config: HeapConfig,
    dac: Arc<dyn DataAccess>,
    memory: PageCache,
    types: MethodTableCache,
    layout: ObjectLayout,
    globals: UsefulGlobals,
    snapshot: HeapSnapshot,
    contexts: AllocationContexts,
    interrupt: InterruptFlag,
}

impl HeapSession {
    pub fn open(reader: Arc<dyn MemoryReader>, dac: Arc<dyn DataAccess>, config: HeapConfig) -> Result<Self, HeapError> {
        config
            .validate()
            .map_err(|e| HeapError::InvariantBroken(format!("invalid configuration: {}", e)))?;
        let _timer = ScopedTimer::new("snapshot");

        let interrupt = InterruptFlag::new();
        let memory = PageCache::with_window_size(reader, config.pointer_size(), config.page_cache_size);
        let types = MethodTableCache::new(dac.clone());
        let layout = ObjectLayout::from_config(&config);
        let globals = dac.useful_globals()?;
        if globals.free_method_table.is_null() {
            log::warn!("The free object method table is unknown; free objects will look like corruption");
        }

        let snapshot = HeapSnapshot::build(dac.as_ref(), &interrupt)?;
        let contexts = AllocationContexts::collect(dac.as_ref(), snapshot.heaps(), &interrupt)?;

        Ok(Self {
            config,
            dac,
            memory,
            types,
            layout,
            globals,
            snapshot,
            contexts,
            interrupt,
        })
    }

    /// Opens a replayed target; its architecture overrides the one in
    /// `config`.
    pub fn from_target(target: Arc<ReplayTarget>, config: HeapConfig) -> Result<Self, HeapError> {
        let config = config.with_architecture(target.architecture());
        Self::open(target.clone(), target, config)
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    pub fn data_access(&self) -> &dyn DataAccess {
        self.dac.as_ref()
    }

    pub fn snapshot(&self) -> &HeapSnapshot {
        &self.snapshot
    }

    pub fn allocation_contexts(&self) -> &AllocationContexts {
        &self.contexts
    }

    /// Raise from another thread (a Ctrl-C handler, say) to stop the
    /// running operation with `HeapError::Interrupted`.
    pub fn interrupt(&self) -> &InterruptFlag {
        &self.interrupt
    }

    pub fn memory(&self) -> &PageCache {
        &self.memory
    }

    pub fn types(&self) -> &MethodTableCache {
        &self.types
    }

    pub fn layout(&self) -> &ObjectLayout {
        &self.layout
    }

    pub fn object_reader(&self) -> ObjectReader<'_> {
        ObjectReader::new(&self.memory, &self.types, self.layout, self.globals)
    }

    pub fn traverser(&self) -> HeapTraverser<'_> {
        HeapTraverser::new(
            &self.snapshot,
            self.object_reader(),
            &self.contexts,
            &self.interrupt,
            &self.config,
        )
    }

    pub fn traverse_all<V: ObjectVisitor + ?Sized>(
        &self,
        visitor: &mut V,
        verify: bool,
    ) -> Result<TraversalSummary, HeapError> {
        let _timer = ScopedTimer::new("traversal");
        self.traverser().traverse(visitor, verify)
    }

    /// Walks the heap with verification and nothing else.
    pub fn verify(&self) -> Result<TraversalSummary, HeapError> {
        self.traverse_all(&mut |_: &HeapObject| {}, true)
    }

    pub fn locate(&self, addr: Address) -> Result<Option<Location>, HeapError> {
        locate(&self.snapshot, self.object_reader(), &self.contexts, &self.interrupt, addr)
    }

    pub fn get_heap(&self, addr: Address) -> Option<&HeapDetails> {
        self.snapshot.get_heap(addr)
    }

    pub fn get_generation(&self, addr: Address) -> Option<u32> {
        self.snapshot.get_generation(addr)
    }

    pub fn roots(&self) -> Result<RootSet, HeapError> {
        RootEnumerator::new(
            self.dac.as_ref(),
            &self.snapshot,
            self.object_reader(),
            &self.contexts,
            &self.interrupt,
        )
        .enumerate()
    }

    fn marker(&self) -> Reachability<'_> {
        Reachability::new(&self.snapshot, self.object_reader(), &self.interrupt)
    }

    /// Enumerates the roots and marks everything they reach.
    pub fn reachability(&self) -> Result<LiveSet, HeapError> {
        let roots = self.roots()?;
        self.reachability_from(&roots)
    }

    pub fn reachability_from(&self, roots: &RootSet) -> Result<LiveSet, HeapError> {
        let _timer = ScopedTimer::new("reachability");
        self.marker().mark(roots)
    }

    pub fn root_path(&self, target: Address) -> Result<Option<RootPath>, HeapError> {
        let roots = self.roots()?;
        find_root_path(&self.marker(), &self.interrupt, &roots, target)
    }

    /// Aggregates every object for which `key_of` returns a key, then sorts
    /// by total size.
    pub fn aggregate<K, F>(&self, mut key_of: F) -> Result<HeapStat<K>, HeapError>
    where
        K: Ord + Clone,
        F: FnMut(&HeapObject) -> Option<K>,
    {
        let mut stat = HeapStat::new();
        self.traverse_all(
            &mut |object: &HeapObject| {
                if let Some(key) = key_of(object) {
                    stat.add(&key, object.size());
                }
            },
            false,
        )?;
        stat.sort();
        Ok(stat)
    }

    pub fn aggregate_by_type(&self) -> Result<HeapStat<Address>, HeapError> {
        self.aggregate(|object| Some(object.method_table()))
    }

    /// String objects keyed by their first `string_prefix_length`
    /// characters.
    pub fn aggregate_strings(&self) -> Result<HeapStat<String>, HeapError> {
        let reader = self.object_reader();
        let max_chars = self.config.string_prefix_length;
        self.aggregate(|object| {
            if !reader.is_string(object.method_table()) {
                return None;
            }
            match reader.string_prefix(object.address(), max_chars) {
                Ok(prefix) => Some(prefix),
                Err(e) => {
                    log::warn!("String at {} unreadable: {}", object.address(), e);
                    None
                }
            }
        })
    }

    pub fn heap_usage(&self, live: Option<&LiveSet>) -> Result<Vec<HeapUsage>, HeapError> {
        let mut collector = UsageCollector::new(&self.snapshot, &self.layout, live);
        self.traverse_all(&mut collector, false)?;
        Ok(collector.finish())
    }

    pub fn finalizer_summary(&self, live: Option<&LiveSet>) -> Result<FinalizerSummary, HeapError> {
        summarize_finalization(&self.snapshot, self.object_reader(), &self.interrupt, live)
    }

    /// `mt` followed by its parents up to the root type.
    pub fn type_chain(&self, mt: Address) -> Result<Vec<Arc<MethodTableInfo>>, HeapError> {
        self.types.ancestors(mt).collect()
    }

    pub fn type_name(&self, mt: Address) -> String {
        if mt == self.globals.free_method_table {
            return "Free".to_string();
        }
        self.dac
            .method_table_name(mt)
            .unwrap_or_else(|| format!("<unknown type {}>", mt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dac::HandleKind;
    use crate::replay::fixture::{self, Fixture};

    fn a(value: u64) -> Address {
        Address::new(value)
    }

    fn objects(session: &HeapSession) -> Vec<(Address, u32, u64)> {
        let mut seen = Vec::new();
        session
            .traverse_all(&mut |o: &HeapObject| seen.push((o.address(), o.generation, o.size())), false)
            .unwrap();
        seen
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let fx = Fixture::regions();
        let target = Arc::new(fx.build_target());
        let config = HeapConfig::default().with_large_object_alignment(12);
        assert!(matches!(
            HeapSession::open(target.clone(), target, config),
            Err(HeapError::InvariantBroken(_))
        ));
    }

    #[test]
    fn test_single_large_array() {
        let mut fx = Fixture::classic().with_config(HeapConfig::default().with_large_object_alignment(32));
        fx.large_segment(a(0x1000_0000), a(0x1000_0060));
        fx.array(a(0x1000_0000), fixture::INT_ARRAY_MT, 16);
        let session = fx.session();

        // 24 + 16 * 4 = 88 bytes, aligned for the large object heap
        assert_eq!(objects(&session), vec![(a(0x1000_0000), 3, 96)]);

        let stat = session.aggregate_by_type().unwrap();
        let ints = stat.get(&fixture::INT_ARRAY_MT).unwrap();
        assert_eq!((ints.count, ints.total_size), (1, 96));
        assert_eq!(session.type_name(fixture::INT_ARRAY_MT), "System.Int32[]");
    }

    #[test]
    fn test_three_region_generations() {
        let mut fx = Fixture::regions();
        for (gen, base) in [(0, 0x30_0000), (1, 0x40_0000), (2, 0x50_0000)] {
            fx.region(gen, a(base), a(base + 0x40));
            fx.object(a(base), fixture::PLAIN_MT);
            fx.record(a(base + 0x18));
        }
        let session = fx.session();

        let seen = objects(&session);
        assert_eq!(seen.len(), 6);
        for (addr, gen, _) in &seen {
            assert_eq!(session.get_generation(*addr), Some(*gen));
            assert!(session.get_heap(*addr).is_some());
        }
        let gens: Vec<_> = seen.iter().map(|(_, g, _)| *g).collect();
        assert_eq!(gens, vec![0, 0, 1, 1, 2, 2]);

        let stat = session.aggregate_by_type().unwrap();
        let rows: Vec<_> = stat.iter().map(|e| (e.key, e.count, e.total_size)).collect();
        assert_eq!(rows, vec![(fixture::RECORD_MT, 3, 120), (fixture::PLAIN_MT, 3, 72)]);
        assert_eq!(session.get_generation(a(0x99_0000)), None);
    }

    #[test]
    fn test_allocation_context_is_skipped() {
        let mut fx = Fixture::regions();
        let start = a(0x30_0000);
        let context = start + 0x18;
        fx.region(0, start, context + 64 + 24 + 24);
        fx.object(start, fixture::PLAIN_MT);
        // stale objects inside the context are never reported
        fx.object(context + 32, fixture::PLAIN_MT);
        fx.thread(1, context, context + 64);
        fx.object(context + 64 + 24, fixture::PLAIN_MT);
        let session = fx.session();

        let seen: Vec<_> = objects(&session).into_iter().map(|(addr, _, _)| addr).collect();
        assert_eq!(seen, vec![start, context + 64 + 24]);
    }

    #[test]
    fn test_corrupt_method_table_skips_segment() {
        let mut fx = Fixture::regions();
        fx.region(0, a(0x30_0000), a(0x30_0048));
        fx.object(a(0x30_0000), fixture::PLAIN_MT);
        fx.object(a(0x30_0018), a(0xdead_beef));
        fx.object(a(0x30_0030), fixture::PLAIN_MT);
        fx.region(1, a(0x40_0000), a(0x40_0018));
        fx.object(a(0x40_0000), fixture::PLAIN_MT);
        let session = fx.session();

        let mut seen = Vec::new();
        let summary = session.traverse_all(&mut |o: &HeapObject| seen.push(o.address()), false).unwrap();
        assert_eq!(seen, vec![a(0x30_0000), a(0x40_0000)]);
        assert_eq!(summary.diagnostics.len(), 1);
        assert!(matches!(
            summary.diagnostics[0],
            HeapError::CorruptObject { address, last_good: Some(last_good), .. }
                if address == a(0x30_0018) && last_good == a(0x30_0000)
        ));
    }

    #[test]
    fn test_write_barrier_violation_and_fix() {
        let build = |card: bool| {
            let mut fx = Fixture::regions();
            fx.region(2, a(0x20_0000), a(0x20_0028));
            fx.node(a(0x20_0000), a(0x30_0000), Address::NULL);
            fx.region(0, a(0x30_0000), a(0x30_0018));
            fx.object(a(0x30_0000), fixture::PLAIN_MT);
            if card {
                fx.set_card(a(0x20_0000));
            }
            fx.session()
        };

        let summary = build(false).verify().unwrap();
        let errors: Vec<_> = summary.verification.as_ref().unwrap().errors().collect();
        assert_eq!(
            errors,
            vec![HeapError::WriteBarrierMissing {
                parent: a(0x20_0000),
                child: a(0x30_0000)
            }]
        );
        assert!(build(true).verify().unwrap().is_clean());
    }

    #[test]
    fn test_back_to_back_sessions_agree() {
        let mut fx = Fixture::classic();
        fx.ephemeral_segment(a(0x30_0000), a(0x30_0028), a(0x30_0040), a(0x30_0058));
        fx.node(a(0x30_0000), a(0x30_0040), Address::NULL);
        fx.object(a(0x30_0028), fixture::PLAIN_MT);
        fx.object(a(0x30_0040), fixture::PLAIN_MT);
        fx.handle(HandleKind::Strong, a(0x30_0000), Address::NULL);

        let first = fx.session();
        let second = fx.session();
        assert_eq!(objects(&first), objects(&second));
        assert_eq!(first.reachability().unwrap(), second.reachability().unwrap());
        let stat = |s: &HeapSession| {
            s.aggregate_by_type()
                .unwrap()
                .iter()
                .map(|e| (e.key, e.count, e.total_size))
                .collect::<Vec<_>>()
        };
        assert_eq!(stat(&first), stat(&second));
    }

    #[test]
    fn test_strings_and_type_chain() {
        let mut fx = Fixture::regions();
        fx.region(0, a(0x30_0000), a(0x30_0070));
        fx.string(a(0x30_0000), "hello");
        fx.string(a(0x30_0028), "hello");
        fx.string(a(0x30_0050), "bye");
        fx.builder().method_table(
            fixture::RECORD_MT,
            crate::dac::MethodTableData {
                base_size: 40,
                parent_method_table: fixture::PLAIN_MT,
                ..Default::default()
            },
        );
        fx.config_mut().string_prefix_length = 3;
        let session = fx.session();

        let strings = session.aggregate_strings().unwrap();
        let rows: Vec<_> = strings.iter().map(|e| (e.key.clone(), e.count)).collect();
        assert_eq!(rows, vec![("hel".to_string(), 2), ("bye".to_string(), 1)]);

        let chain: Vec<_> = session
            .type_chain(fixture::RECORD_MT)
            .unwrap()
            .iter()
            .map(|info| info.method_table())
            .collect();
        assert_eq!(chain, vec![fixture::RECORD_MT, fixture::PLAIN_MT]);
    }
}
