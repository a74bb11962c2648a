// Tue Jan 13 2026 - Alex

use crate::dac::DataAccess;
use crate::gc::{GcDesc, HeapError, ObjectLayout};
use crate::memory::{Address, PageCache};
use ahash::AHashSet;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Size and layout facts for one method table. Fields never change once
/// the record is built; the descriptor is attached on first use.
#[derive(Debug)]
pub struct MethodTableInfo {
    method_table: Address,
    base_size: u32,
    component_size: u32,
    contains_pointers: bool,
    collectible: bool,
    loader_allocator_handle: Address,
    parent: Address,
    gc_desc: OnceCell<Result<Arc<GcDesc>, HeapError>>,
}

impl MethodTableInfo {
    pub fn method_table(&self) -> Address {
        self.method_table
    }

    pub fn base_size(&self) -> u32 {
        self.base_size
    }

    pub fn component_size(&self) -> u32 {
        self.component_size
    }

    pub fn has_components(&self) -> bool {
        self.component_size > 0
    }

    pub fn contains_pointers(&self) -> bool {
        self.contains_pointers
    }

    pub fn is_collectible(&self) -> bool {
        self.collectible
    }

    pub fn loader_allocator_handle(&self) -> Address {
        self.loader_allocator_handle
    }

    pub fn parent(&self) -> Address {
        self.parent
    }
}

enum CacheEntry {
    Ready(Arc<MethodTableInfo>),
    Poisoned,
}

/// Per-snapshot method table cache. Entries live until `clear`.
pub struct MethodTableCache {
    dac: Arc<dyn DataAccess>,
    entries: RwLock<BTreeMap<Address, CacheEntry>>,
}

impl MethodTableCache {
    pub fn new(dac: Arc<dyn DataAccess>) -> Self {
        Self {
            dac,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn lookup(&self, mt: Address) -> Result<Arc<MethodTableInfo>, HeapError> {
        if let Some(entry) = self.entries.read().get(&mt) {
            return match entry {
                CacheEntry::Ready(info) => Ok(info.clone()),
                CacheEntry::Poisoned => Err(HeapError::UnknownType(mt)),
            };
        }

        if mt.is_null() {
            return Err(HeapError::UnknownType(mt));
        }

        let data = self.dac.method_table_data(mt).map_err(|e| {
            log::debug!("Method table {} not resolved: {}", mt, e);
            HeapError::UnknownType(mt)
        })?;
        if data.base_size == 0 {
            return Err(HeapError::UnknownType(mt));
        }

        let collectible = self.dac.method_table_collectible_data(mt).unwrap_or_default();

        let info = Arc::new(MethodTableInfo {
            method_table: mt,
            base_size: data.base_size,
            component_size: data.component_size,
            contains_pointers: data.contains_pointers,
            collectible: collectible.collectible,
            loader_allocator_handle: collectible.loader_allocator_handle,
            parent: data.parent_method_table,
            gc_desc: OnceCell::new(),
        });

        let mut entries = self.entries.write();
        let entry = entries.entry(mt).or_insert_with(|| CacheEntry::Ready(info));
        match entry {
            CacheEntry::Ready(info) => Ok(info.clone()),
            CacheEntry::Poisoned => Err(HeapError::UnknownType(mt)),
        }
    }

    /// GC descriptor of `info`, decoded once and kept with the record.
    pub fn gc_desc(
        &self,
        info: &MethodTableInfo,
        memory: &PageCache,
        layout: &ObjectLayout,
    ) -> Result<Arc<GcDesc>, HeapError> {
        let result = info
            .gc_desc
            .get_or_init(|| GcDesc::read(memory, layout, info.method_table).map(Arc::new));

        if let Err(HeapError::OutOfMemory(_)) = result {
            self.poison(info.method_table);
        }
        result.clone()
    }

    fn poison(&self, mt: Address) {
        let mut entries = self.entries.write();
        if let Some(CacheEntry::Ready(_)) = entries.get(&mt) {
            log::error!("Method table {}: out of memory decoding its GC descriptor", mt);
            entries.insert(mt, CacheEntry::Poisoned);
        }
    }

    /// Method tables from `mt` up through its parents.
    pub fn ancestors(&self, mt: Address) -> TypeAncestors<'_> {
        TypeAncestors {
            cache: self,
            next: mt,
            seen: AHashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

pub struct TypeAncestors<'a> {
    cache: &'a MethodTableCache,
    next: Address,
    seen: AHashSet<Address>,
}

impl<'a> Iterator for TypeAncestors<'a> {
    type Item = Result<Arc<MethodTableInfo>, HeapError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mt = self.next;
        if mt.is_null() || !self.seen.insert(mt) {
            return None;
        }
        match self.cache.lookup(mt) {
            Ok(info) => {
                self.next = info.parent();
                Some(Ok(info))
            }
            Err(e) => {
                self.next = Address::NULL;
                Some(Err(e))
            }
        }
    }
}
