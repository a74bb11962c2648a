// Tue Jan 13 2026 - Alex

use crate::config::Architecture;
use crate::dac::{
    AllocContextData, CollectibleData, GcHeapData, GcHeapDetailsData, HandleData, MethodTableData,
    SegmentData, StackRef, ThreadData, ThreadStoreData, UsefulGlobals,
};
use crate::memory::Address;
use crate::replay::target::{write_pages, PAGE_SIZE};
use crate::replay::{MethodTableRecord, ReplayTarget, TargetImage, ThreadRecord};
use std::collections::BTreeMap;

/// Lays out a target image in memory: raw words, method tables with their
/// GC descriptor trailers, and the provider tables.
///
/// Writes outside the 64-bit address space are dropped with a warning.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    image: TargetImage,
    pages: BTreeMap<u64, Vec<u8>>,
}

impl ImageBuilder {
    pub fn new(architecture: Architecture) -> Self {
        Self {
            image: TargetImage {
                architecture,
                ..Default::default()
            },
            pages: BTreeMap::new(),
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.image.architecture
    }

    fn pointer_size(&self) -> usize {
        self.image.architecture.pointer_size()
    }

    pub fn write_bytes(&mut self, address: Address, bytes: &[u8]) -> &mut Self {
        if let Err(e) = write_pages(&mut self.pages, address, bytes) {
            log::warn!("Dropping image write of {} bytes: {}", bytes.len(), e);
        }
        self
    }

    pub fn write_u16(&mut self, address: Address, value: u16) -> &mut Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, address: Address, value: u32) -> &mut Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u64(&mut self, address: Address, value: u64) -> &mut Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_i64(&mut self, address: Address, value: i64) -> &mut Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Pointer-width word; truncated on 32-bit targets.
    pub fn write_ptr(&mut self, address: Address, value: u64) -> &mut Self {
        if self.pointer_size() == 4 {
            self.write_u32(address, value as u32)
        } else {
            self.write_u64(address, value)
        }
    }

    fn write_isize(&mut self, address: Address, value: i64) -> &mut Self {
        self.write_ptr(address, value as u64)
    }

    /// Makes `[address, address + size)` readable, zero filled where not yet written.
    pub fn map_zeroed(&mut self, address: Address, size: u64) -> &mut Self {
        let start = address.as_u64() & !(PAGE_SIZE - 1);
        let end = address.as_u64().saturating_add(size);
        let mut page = start;
        while page < end {
            self.pages
                .entry(page)
                .or_insert_with(|| vec![0u8; PAGE_SIZE as usize]);
            page = match page.checked_add(PAGE_SIZE) {
                Some(next) => next,
                None => break,
            };
        }
        self
    }

    fn record_mut(&mut self, mt: Address) -> &mut MethodTableRecord {
        let index = match self.image.method_tables.iter().position(|r| r.address == mt) {
            Some(index) => index,
            None => {
                self.image.method_tables.push(MethodTableRecord {
                    address: mt,
                    data: MethodTableData::default(),
                    collectible: None,
                    name: None,
                });
                self.image.method_tables.len() - 1
            }
        };
        &mut self.image.method_tables[index]
    }

    pub fn method_table(&mut self, mt: Address, data: MethodTableData) -> &mut Self {
        self.record_mut(mt).data = data;
        self
    }

    pub fn named(&mut self, mt: Address, name: &str) -> &mut Self {
        self.record_mut(mt).name = Some(name.to_string());
        self
    }

    pub fn collectible(&mut self, mt: Address, data: CollectibleData) -> &mut Self {
        self.record_mut(mt).collectible = Some(data);
        self
    }

    /// Normal-form descriptor: one series per `(offset, nptrs)` run in an
    /// object of `base_size` bytes. The first run is stored nearest `mt`.
    pub fn gc_desc(&mut self, mt: Address, base_size: u64, series: &[(u64, u64)]) -> &mut Self {
        let ptr = self.pointer_size() as u64;
        self.write_isize(mt - ptr, series.len() as i64);
        for (i, (offset, nptrs)) in series.iter().enumerate() {
            let record = mt - 3 * ptr - i as u64 * 2 * ptr;
            let size = (*nptrs * ptr) as i64 - base_size as i64;
            self.write_isize(record, size);
            self.write_ptr(record + ptr, *offset);
        }
        self
    }

    /// Value-array descriptor: `(nptrs, skip)` items repeated per element,
    /// starting `start_offset` bytes into the object.
    pub fn value_array_gc_desc(&mut self, mt: Address, start_offset: u64, items: &[(u32, u32)]) -> &mut Self {
        let ptr = self.pointer_size() as u64;
        self.write_isize(mt - ptr, -(items.len() as i64));
        self.write_ptr(mt - 2 * ptr, start_offset);
        for (i, (nptrs, skip)) in items.iter().enumerate() {
            let at = mt - 3 * ptr - i as u64 * ptr;
            if ptr == 4 {
                self.write_u16(at, *nptrs as u16);
                self.write_u16(at + 2, *skip as u16);
            } else {
                self.write_u32(at, *nptrs);
                self.write_u32(at + 4, *skip);
            }
        }
        self
    }

    pub fn globals(&mut self, globals: UsefulGlobals) -> &mut Self {
        self.image.globals = globals;
        self
    }

    pub fn gc_heap(&mut self, data: GcHeapData) -> &mut Self {
        self.image.gc_heap = data;
        self
    }

    pub fn heap(&mut self, details: GcHeapDetailsData) -> &mut Self {
        self.image.heaps.retain(|h| h.heap_address != details.heap_address);
        self.image.heaps.push(details);
        self
    }

    pub fn segment(&mut self, data: SegmentData) -> &mut Self {
        self.image.segments.retain(|s| s.address != data.address);
        self.image.segments.push(data);
        self
    }

    pub fn thread(&mut self, address: Address, data: ThreadData, stack_refs: Vec<StackRef>) -> &mut Self {
        self.image.threads.retain(|t| t.address != address);
        self.image.threads.push(ThreadRecord {
            address,
            data,
            stack_refs,
        });
        self
    }

    pub fn thread_store(&mut self, data: ThreadStoreData) -> &mut Self {
        self.image.thread_store = data;
        self
    }

    pub fn handle(&mut self, data: HandleData) -> &mut Self {
        self.image.handles.push(data);
        self
    }

    pub fn global_alloc_context(&mut self, data: AllocContextData) -> &mut Self {
        self.image.global_alloc_context = Some(data);
        self
    }

    pub fn build(&self) -> ReplayTarget {
        ReplayTarget::from_parts(self.image.clone(), self.pages.clone())
    }

    /// The serializable form, memory included.
    pub fn image(&self) -> TargetImage {
        self.build().to_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dac::DataAccess;
    use crate::memory::MemoryReader;

    #[test]
    fn test_pointer_width_follows_architecture() {
        let mut builder = ImageBuilder::new(Architecture::X86);
        builder.write_ptr(Address::new(0x1000), 0x1_2345_6789);
        let target = builder.build();
        assert_eq!(target.read_u32(Address::new(0x1000)).unwrap(), 0x2345_6789);
        assert_eq!(target.read_u32(Address::new(0x1004)).unwrap(), 0);
    }

    #[test]
    fn test_map_zeroed_keeps_existing_bytes() {
        let mut builder = ImageBuilder::new(Architecture::Amd64);
        builder.write_u64(Address::new(0x2008), 7);
        builder.map_zeroed(Address::new(0x2000), 0x2000);
        let target = builder.build();
        assert_eq!(target.read_u64(Address::new(0x2008)).unwrap(), 7);
        assert_eq!(target.read_u64(Address::new(0x3ff8)).unwrap(), 0);
    }

    #[test]
    fn test_method_table_records_merge() {
        let mut builder = ImageBuilder::new(Architecture::Amd64);
        let mt = Address::new(0x7000);
        builder.named(mt, "System.Object");
        builder.method_table(
            mt,
            MethodTableData {
                base_size: 24,
                ..Default::default()
            },
        );
        let target = builder.build();
        assert_eq!(target.method_table_data(mt).unwrap().base_size, 24);
        assert_eq!(target.method_table_name(mt).as_deref(), Some("System.Object"));
    }

    #[test]
    fn test_image_survives_json() {
        let mut builder = ImageBuilder::new(Architecture::Amd64);
        builder.write_u64(Address::new(0x4000), 0xfeed);
        builder.segment(SegmentData {
            address: Address::new(0x100),
            mem: Address::new(0x4000),
            ..Default::default()
        });
        let json = serde_json::to_string(&builder.image()).unwrap();
        let image: TargetImage = serde_json::from_str(&json).unwrap();
        let target = ReplayTarget::from_image(image).unwrap();
        assert_eq!(target.read_u64(Address::new(0x4000)).unwrap(), 0xfeed);
        assert_eq!(
            target.heap_segment_data(Address::new(0x100), None).unwrap().mem,
            Address::new(0x4000)
        );
    }
}
