// Tue Jan 13 2026 - Alex

use crate::config::Architecture;
use crate::dac::{
    AllocContextData, CollectibleData, DacError, DataAccess, GcHeapData, GcHeapDetailsData,
    HandleData, HandleKind, MethodTableData, SegmentData, StackRef, ThreadData, ThreadStoreData,
    UsefulGlobals,
};
use crate::memory::{Address, MemoryError, MemoryReader};
use crate::replay::{MemoryBlock, MethodTableRecord, TargetImage, ThreadRecord};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

pub const PAGE_SIZE: u64 = 0x1000;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid image: {0}")]
    Invalid(String),
}

/// A target backed by a [`TargetImage`]: sparse pages plus data tables.
/// Reads of unmapped pages fail like reads of unmapped target memory.
pub struct ReplayTarget {
    architecture: Architecture,
    pages: BTreeMap<u64, Vec<u8>>,
    globals: UsefulGlobals,
    gc_heap: GcHeapData,
    heaps: Vec<GcHeapDetailsData>,
    segments: IndexMap<Address, SegmentData>,
    method_tables: IndexMap<Address, MethodTableRecord>,
    thread_store: ThreadStoreData,
    threads: IndexMap<Address, ThreadRecord>,
    handles: Vec<HandleData>,
    global_alloc_context: Option<AllocContextData>,
    method_table_requests: AtomicUsize,
}

impl ReplayTarget {
    pub fn from_image(image: TargetImage) -> Result<Self, ReplayError> {
        let mut pages = BTreeMap::new();
        for block in &image.memory {
            write_pages(&mut pages, block.address, &block.bytes)
                .map_err(|_| ReplayError::Invalid(format!("memory block at {} overflows", block.address)))?;
        }
        Ok(Self::from_parts(image, pages))
    }

    pub(crate) fn from_parts(image: TargetImage, pages: BTreeMap<u64, Vec<u8>>) -> Self {
        Self {
            architecture: image.architecture,
            pages,
            globals: image.globals,
            gc_heap: image.gc_heap,
            heaps: image.heaps,
            segments: image.segments.into_iter().map(|s| (s.address, s)).collect(),
            method_tables: image.method_tables.into_iter().map(|m| (m.address, m)).collect(),
            thread_store: image.thread_store,
            threads: image.threads.into_iter().map(|t| (t.address, t)).collect(),
            handles: image.handles,
            global_alloc_context: image.global_alloc_context,
            method_table_requests: AtomicUsize::new(0),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let contents = std::fs::read_to_string(path)?;
        let image: TargetImage = serde_json::from_str(&contents)?;
        Self::from_image(image)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ReplayError> {
        let contents = serde_json::to_string_pretty(&self.to_image())?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn to_image(&self) -> TargetImage {
        TargetImage {
            architecture: self.architecture,
            memory: blocks_from_pages(&self.pages),
            globals: self.globals,
            gc_heap: self.gc_heap,
            heaps: self.heaps.clone(),
            segments: self.segments.values().copied().collect(),
            method_tables: self.method_tables.values().cloned().collect(),
            thread_store: self.thread_store,
            threads: self.threads.values().cloned().collect(),
            handles: self.handles.clone(),
            global_alloc_context: self.global_alloc_context,
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn method_table_requests(&self) -> usize {
        self.method_table_requests.load(Ordering::Relaxed)
    }

    pub fn mapped_bytes(&self) -> u64 {
        self.pages.len() as u64 * PAGE_SIZE
    }
}

pub(crate) fn write_pages(pages: &mut BTreeMap<u64, Vec<u8>>, address: Address, bytes: &[u8]) -> Result<(), MemoryError> {
    let start = address.as_u64();
    start
        .checked_add(bytes.len() as u64)
        .ok_or(MemoryError::Overflow(address))?;

    let mut written = 0usize;
    while written < bytes.len() {
        let addr = start + written as u64;
        let base = addr & !(PAGE_SIZE - 1);
        let offset = (addr - base) as usize;
        let count = (PAGE_SIZE as usize - offset).min(bytes.len() - written);
        let page = pages.entry(base).or_insert_with(|| vec![0u8; PAGE_SIZE as usize]);
        page[offset..offset + count].copy_from_slice(&bytes[written..written + count]);
        written += count;
    }
    Ok(())
}

fn blocks_from_pages(pages: &BTreeMap<u64, Vec<u8>>) -> Vec<MemoryBlock> {
    let mut blocks: Vec<MemoryBlock> = Vec::new();
    for (base, page) in pages {
        match blocks.last_mut() {
            Some(last) if last.address.as_u64() + last.bytes.len() as u64 == *base => {
                last.bytes.extend_from_slice(page);
            }
            _ => blocks.push(MemoryBlock {
                address: Address::new(*base),
                bytes: page.clone(),
            }),
        }
    }
    blocks
}

impl MemoryReader for ReplayTarget {
    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<usize, MemoryError> {
        let mut copied = 0usize;
        while copied < buf.len() {
            let Some(current) = addr.as_u64().checked_add(copied as u64) else {
                break;
            };
            let base = current & !(PAGE_SIZE - 1);
            let Some(page) = self.pages.get(&base) else {
                break;
            };
            let offset = (current - base) as usize;
            let count = (PAGE_SIZE as usize - offset).min(buf.len() - copied);
            buf[copied..copied + count].copy_from_slice(&page[offset..offset + count]);
            copied += count;
        }

        if copied == 0 && !buf.is_empty() {
            return Err(MemoryError::ReadFailed(addr));
        }
        Ok(copied)
    }
}

impl DataAccess for ReplayTarget {
    fn useful_globals(&self) -> Result<UsefulGlobals, DacError> {
        Ok(self.globals)
    }

    fn gc_heap_data(&self) -> Result<GcHeapData, DacError> {
        Ok(self.gc_heap)
    }

    fn gc_heap_list(&self) -> Result<Vec<Address>, DacError> {
        if !self.gc_heap.server_mode {
            return Err(DacError::NotSupported("heap list of a workstation GC"));
        }
        Ok(self.heaps.iter().map(|h| h.heap_address).collect())
    }

    fn gc_heap_details(&self, heap: Option<Address>) -> Result<GcHeapDetailsData, DacError> {
        let found = match heap {
            None => self.heaps.first(),
            Some(addr) => self.heaps.iter().find(|h| h.heap_address == addr),
        };
        found
            .cloned()
            .ok_or_else(|| DacError::failed("heap details", heap.unwrap_or_default()))
    }

    fn heap_segment_data(&self, segment: Address, _heap: Option<Address>) -> Result<SegmentData, DacError> {
        self.segments
            .get(&segment)
            .copied()
            .ok_or_else(|| DacError::failed("segment data", segment))
    }

    fn method_table_data(&self, mt: Address) -> Result<MethodTableData, DacError> {
        self.method_table_requests.fetch_add(1, Ordering::Relaxed);
        self.method_tables
            .get(&mt)
            .map(|record| record.data)
            .ok_or_else(|| DacError::failed("method table data", mt))
    }

    fn method_table_collectible_data(&self, mt: Address) -> Result<CollectibleData, DacError> {
        self.method_tables
            .get(&mt)
            .and_then(|record| record.collectible)
            .ok_or(DacError::NotSupported("method table collectible data"))
    }

    fn method_table_name(&self, mt: Address) -> Option<String> {
        self.method_tables.get(&mt).and_then(|record| record.name.clone())
    }

    fn thread_store(&self) -> Result<ThreadStoreData, DacError> {
        Ok(self.thread_store)
    }

    fn thread_data(&self, thread: Address) -> Result<ThreadData, DacError> {
        self.threads
            .get(&thread)
            .map(|record| record.data)
            .ok_or_else(|| DacError::failed("thread data", thread))
    }

    fn enumerate_handles(&self, filter: Option<&[HandleKind]>) -> Result<Vec<HandleData>, DacError> {
        Ok(self
            .handles
            .iter()
            .filter(|h| filter.map_or(true, |kinds| kinds.contains(&h.kind)))
            .copied()
            .collect())
    }

    fn enumerate_stack_references(&self, os_thread_id: u32) -> Result<Vec<StackRef>, DacError> {
        self.threads
            .values()
            .find(|t| t.data.os_thread_id == os_thread_id)
            .map(|t| t.stack_refs.clone())
            .ok_or_else(|| DacError::failed("stack references", Address::new(os_thread_id as u64)))
    }

    fn global_allocation_context(&self) -> Result<Option<AllocContextData>, DacError> {
        Ok(self.global_alloc_context)
    }
}
