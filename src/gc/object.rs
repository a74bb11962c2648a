// Tue Jan 13 2026 - Alex

use crate::dac::UsefulGlobals;
use crate::gc::{HeapError, MethodTableCache, MethodTableInfo, ObjectLayout, ReferenceIter};
use crate::memory::{Address, MemoryReader, PageCache};
use std::sync::Arc;

/// Transient view of one object. Copied by value; owns nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectView {
    pub address: Address,
    pub method_table: Address,
    pub size: u64,
    pub contains_pointers: bool,
}

impl ObjectView {
    pub fn end(&self) -> Address {
        self.address + self.size
    }
}

/// Everything needed to parse objects out of target memory.
#[derive(Clone, Copy)]
pub struct ObjectReader<'a> {
    memory: &'a PageCache,
    types: &'a MethodTableCache,
    layout: ObjectLayout,
    globals: UsefulGlobals,
}

impl<'a> ObjectReader<'a> {
    pub fn new(memory: &'a PageCache, types: &'a MethodTableCache, layout: ObjectLayout, globals: UsefulGlobals) -> Self {
        Self {
            memory,
            types,
            layout,
            globals,
        }
    }

    pub fn memory(&self) -> &'a PageCache {
        self.memory
    }

    pub fn types(&self) -> &'a MethodTableCache {
        self.types
    }

    pub fn layout(&self) -> &ObjectLayout {
        &self.layout
    }

    pub fn globals(&self) -> &UsefulGlobals {
        &self.globals
    }

    pub fn is_free(&self, mt: Address) -> bool {
        !mt.is_null() && mt == self.globals.free_method_table
    }

    pub fn is_string(&self, mt: Address) -> bool {
        !mt.is_null() && mt == self.globals.string_method_table
    }

    pub fn method_table_of(&self, addr: Address) -> Result<Address, HeapError> {
        let raw = self.memory.read_ptr(addr)?;
        Ok(self.layout.strip_method_table(raw))
    }

    pub fn component_count(&self, addr: Address, mt: Address) -> Result<u64, HeapError> {
        let count = self.memory.read_u32(addr + self.layout.component_count_offset())? as u64;
        Ok(if self.is_string(mt) { count + 1 } else { count })
    }

    /// Base plus components, before alignment.
    pub fn raw_size_of(&self, addr: Address, info: &MethodTableInfo) -> Result<u64, HeapError> {
        let size = info.base_size() as u64;
        if !info.has_components() {
            return Ok(size);
        }
        let count = self.component_count(addr, info.method_table())?;
        (info.component_size() as u64)
            .checked_mul(count)
            .and_then(|c| c.checked_add(size))
            .ok_or_else(|| HeapError::corrupt(addr, None, "object size overflows"))
    }

    /// Aligned object size: base plus components, padded to the minimum.
    pub fn size_of(&self, addr: Address, info: &MethodTableInfo, large: bool) -> Result<u64, HeapError> {
        let size = self.raw_size_of(addr, info)?;
        let size = if large {
            self.layout.align_large(size)
        } else {
            self.layout.align(size)
        };
        Ok(size.max(self.layout.min_object_size()))
    }

    pub fn view(&self, addr: Address, large: bool) -> Result<ObjectView, HeapError> {
        let mt = self.method_table_of(addr)?;
        let info = self.types.lookup(mt)?;
        let size = self.size_of(addr, &info, large)?;
        Ok(ObjectView {
            address: addr,
            method_table: mt,
            size,
            contains_pointers: info.contains_pointers(),
        })
    }

    /// True when `addr` parses as an object with a known type.
    pub fn is_object(&self, addr: Address) -> bool {
        if addr.is_null() || !addr.is_aligned(self.layout.pointer_size()) {
            return false;
        }
        self.method_table_of(addr)
            .and_then(|mt| self.types.lookup(mt))
            .is_ok()
    }

    pub fn references(&self, view: &ObjectView) -> Result<ReferenceIter<'a>, HeapError> {
        let info = self.types.lookup(view.method_table)?;
        self.references_with(view, &info)
    }

    pub fn references_with(&self, view: &ObjectView, info: &Arc<MethodTableInfo>) -> Result<ReferenceIter<'a>, HeapError> {
        let desc = if info.contains_pointers() {
            Some(self.types.gc_desc(info, self.memory, &self.layout)?)
        } else {
            None
        };
        let loader_allocator = if info.is_collectible() && !info.loader_allocator_handle().is_null() {
            Some(info.loader_allocator_handle())
        } else {
            None
        };
        // descriptors are relative to the unpadded size
        let size = self.raw_size_of(view.address, info)?;
        Ok(ReferenceIter::new(
            self.memory,
            &self.layout,
            view.address,
            size,
            desc,
            loader_allocator,
        ))
    }

    /// First `max_chars` UTF-16 units of a string object.
    pub fn string_prefix(&self, addr: Address, max_chars: usize) -> Result<String, HeapError> {
        let length = self.memory.read_u32(addr + self.layout.component_count_offset())? as usize;
        let take = length.min(max_chars);
        let bytes = self.memory.read_bytes(addr + self.layout.string_chars_offset(), take * 2)?;
        let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        Ok(String::from_utf16_lossy(&units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dac::MethodTableData;
    use crate::replay::fixture::{self, Fixture};

    #[test]
    fn test_string_size_counts_terminator() {
        let mut fx = Fixture::classic();
        let s = fx.string(Address::new(0x10_0000), "hello");
        let session = fx.session();
        let reader = session.object_reader();

        let view = reader.view(s, false).unwrap();
        // 22 base + 2 * (5 + 1) = 34, aligned to 40
        assert_eq!(view.size, 40);
        assert_eq!(reader.string_prefix(s, 64).unwrap(), "hello");
        assert_eq!(reader.string_prefix(s, 3).unwrap(), "hel");
    }

    #[test]
    fn test_array_size() {
        let mut fx = Fixture::classic();
        let a = fx.array(Address::new(0x10_0000), fixture::INT_ARRAY_MT, 16);
        let session = fx.session();
        let reader = session.object_reader();

        assert_eq!(reader.view(a, false).unwrap().size, 88);
        assert_eq!(reader.view(a, true).unwrap().size, 88);
    }

    #[test]
    fn test_min_size_padding() {
        let mut fx = Fixture::classic();
        let a = fx.array(Address::new(0x10_0000), fixture::BYTE_ARRAY_MT, 0);
        let session = fx.session();
        assert_eq!(session.object_reader().view(a, false).unwrap().size, 24);
    }

    #[test]
    fn test_is_object() {
        let mut fx = Fixture::classic();
        let o = fx.object(Address::new(0x10_0000), fixture::PLAIN_MT);
        let session = fx.session();
        let reader = session.object_reader();

        assert!(reader.is_object(o));
        assert!(!reader.is_object(o + 4));
        assert!(!reader.is_object(Address::new(0xdead_0000)));
        assert!(!reader.is_object(Address::NULL));
    }

    #[test]
    fn test_free_and_string_sentinels() {
        let fx = Fixture::classic();
        let session = fx.session();
        let reader = session.object_reader();
        assert!(reader.is_free(fixture::FREE_MT));
        assert!(reader.is_string(fixture::STRING_MT));
        assert!(!reader.is_free(Address::NULL));
    }

    #[test]
    fn test_padding_is_not_scanned_for_references() {
        const PAIR_ARRAY_MT: Address = Address::new(0x7a00);
        let mut fx = Fixture::classic();
        // elements are a reference followed by an int
        fx.builder()
            .method_table(
                PAIR_ARRAY_MT,
                MethodTableData {
                    base_size: 24,
                    component_size: 12,
                    contains_pointers: true,
                    ..Default::default()
                },
            )
            .value_array_gc_desc(PAIR_ARRAY_MT, 16, &[(1, 4)]);
        let target = fx.object(Address::new(0x10_0100), fixture::PLAIN_MT);
        let arr = fx.array(Address::new(0x10_0000), PAIR_ARRAY_MT, 1);
        fx.builder()
            .write_u64(arr + 16, target.as_u64())
            .write_u32(arr + 24, 7)
            .write_u64(arr + 28, 0x10_0200);
        let session = fx.session();
        let reader = session.object_reader();

        let view = reader.view(arr, false).unwrap();
        assert_eq!(view.size, 40);
        let refs: Vec<_> = reader
            .references(&view)
            .unwrap()
            .map(|r| r.unwrap().target)
            .collect();
        assert_eq!(refs, vec![target]);
    }
}
