// Tue Jan 13 2026 - Alex

//! Small synthetic heaps for unit tests. One workstation heap, max
//! generation 2, 64-bit, built on [`ImageBuilder`].

use crate::config::{Architecture, HeapConfig};
use crate::dac::{
    AllocContextData, CollectibleData, GcHeapData, GcHeapDetailsData, GcPhase, GenerationData,
    HandleData, HandleKind, MethodTableData, SegmentData, StackRef, ThreadData, ThreadStoreData,
    UsefulGlobals,
};
use crate::memory::Address;
use crate::gc::SegmentFlags;
use crate::replay::{ImageBuilder, ReplayTarget};
use crate::session::HeapSession;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const FREE_MT: Address = Address::new(0x7100);
pub const STRING_MT: Address = Address::new(0x7200);
pub const INT_ARRAY_MT: Address = Address::new(0x7300);
pub const BYTE_ARRAY_MT: Address = Address::new(0x7400);
pub const PLAIN_MT: Address = Address::new(0x7500);
/// Two reference fields at offsets 8 and 16.
pub const NODE_MT: Address = Address::new(0x7600);
pub const OBJ_ARRAY_MT: Address = Address::new(0x7700);
/// 40 bytes, no references.
pub const RECORD_MT: Address = Address::new(0x7800);
/// Collectible, no fields; its loader allocator handle is `LOADER_HANDLE`.
pub const COLLECTIBLE_MT: Address = Address::new(0x7900);

pub const HEAP_ADDRESS: Address = Address::new(0x5_0000);
pub const LOADER_HANDLE: Address = Address::new(0x6_f000);
pub const LOWEST_ADDRESS: Address = Address::new(0x10_0000);
pub const HIGHEST_ADDRESS: Address = Address::new(0x2000_0000);

const MAX_GEN: u32 = 2;
const SEGMENT_RECORDS: u64 = 0x8_0000;
const HANDLE_SLOTS: u64 = 0x6_0000;
const THREAD_RECORDS: u64 = 0x9_0000;
const FINALIZE_QUEUE: u64 = 0xa_0000;
const CARD_TABLE_PAGE: u64 = 0xc_0000;
const CARD_TABLE: u64 = CARD_TABLE_PAGE + 0x40;
const MARK_ARRAY_PAGE: u64 = 0xd_0000;

pub struct Fixture {
    builder: ImageBuilder,
    config: HeapConfig,
    details: GcHeapDetailsData,
    /// Segment lists by generation; the classic ephemeral segment is kept apart.
    lists: Vec<Vec<SegmentData>>,
    ephemeral: Option<SegmentData>,
    next_segment: u64,
    threads: Vec<(Address, ThreadData)>,
    stack_refs: Vec<(u32, StackRef)>,
    next_handle: u64,
    /// Finalize queue contents by queue segment.
    finalize: Vec<Vec<Address>>,
    /// Card and mark bits, or-ed into their 32-bit words at build time.
    bit_words: BTreeMap<Address, u32>,
}

impl Fixture {
    pub fn classic() -> Self {
        Self::new(false)
    }

    pub fn regions() -> Self {
        Self::new(true)
    }

    fn new(regions: bool) -> Self {
        let mut builder = ImageBuilder::new(Architecture::Amd64);
        builder.globals(UsefulGlobals {
            free_method_table: FREE_MT,
            string_method_table: STRING_MT,
            array_method_table: OBJ_ARRAY_MT,
        });
        builder.gc_heap(GcHeapData {
            server_mode: false,
            heap_count: 1,
            max_generation: MAX_GEN,
            structures_valid: true,
        });

        let arrays = [
            (FREE_MT, 24, 1, "Free"),
            (STRING_MT, 22, 2, "System.String"),
            (INT_ARRAY_MT, 24, 4, "System.Int32[]"),
            (BYTE_ARRAY_MT, 24, 1, "System.Byte[]"),
        ];
        for (mt, base, component, name) in arrays {
            builder.method_table(
                mt,
                MethodTableData {
                    base_size: base,
                    component_size: component,
                    ..Default::default()
                },
            );
            builder.named(mt, name);
        }

        builder.method_table(PLAIN_MT, mt_data(24, false)).named(PLAIN_MT, "System.Object");
        builder.method_table(RECORD_MT, mt_data(40, false)).named(RECORD_MT, "Sample.Record");
        builder.method_table(NODE_MT, mt_data(40, true)).named(NODE_MT, "Sample.Node");
        builder.gc_desc(NODE_MT, 40, &[(8, 2)]);
        builder
            .method_table(
                OBJ_ARRAY_MT,
                MethodTableData {
                    base_size: 24,
                    component_size: 8,
                    contains_pointers: true,
                    ..Default::default()
                },
            )
            .named(OBJ_ARRAY_MT, "System.Object[]");
        // elements start after the length word and its padding
        builder
            .write_i64(OBJ_ARRAY_MT - 8, 1)
            .write_u64(OBJ_ARRAY_MT - 16, 16)
            .write_i64(OBJ_ARRAY_MT - 24, -24);
        builder
            .method_table(COLLECTIBLE_MT, mt_data(24, false))
            .named(COLLECTIBLE_MT, "Sample.Collectible")
            .collectible(
                COLLECTIBLE_MT,
                CollectibleData {
                    collectible: true,
                    loader_allocator_handle: LOADER_HANDLE,
                },
            );
        builder.map_zeroed(LOADER_HANDLE, 8);

        let details = GcHeapDetailsData {
            heap_address: HEAP_ADDRESS,
            lowest_address: LOWEST_ADDRESS,
            highest_address: HIGHEST_ADDRESS,
            generation_table: vec![GenerationData::default(); MAX_GEN as usize + 3],
            has_regions: regions,
            ..Default::default()
        };

        let mut fixture = Self {
            builder,
            config: HeapConfig::default(),
            details,
            lists: vec![Vec::new(); MAX_GEN as usize + 3],
            ephemeral: None,
            next_segment: SEGMENT_RECORDS,
            threads: Vec::new(),
            stack_refs: Vec::new(),
            next_handle: HANDLE_SLOTS,
            finalize: vec![Vec::new(); MAX_GEN as usize + 4],
            bit_words: BTreeMap::new(),
        };
        fixture.init_card_table();
        fixture
    }

    pub fn with_config(mut self, config: HeapConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config_mut(&mut self) -> &mut HeapConfig {
        &mut self.config
    }

    pub fn builder(&mut self) -> &mut ImageBuilder {
        &mut self.builder
    }

    pub fn details_mut(&mut self) -> &mut GcHeapDetailsData {
        &mut self.details
    }

    fn new_segment(&mut self, mem: Address, allocated: Address, flags: SegmentFlags) -> SegmentData {
        let address = Address::new(self.next_segment);
        self.next_segment += 0x100;
        let committed = allocated.align_up(0x1000) + 0x1000;
        self.builder.map_zeroed(mem, allocated.distance_from(mem));
        SegmentData {
            address,
            gc_heap: HEAP_ADDRESS,
            mem,
            allocated,
            high_alloc_mark: allocated,
            committed,
            reserved: committed + 0x1_0000,
            next: Address::NULL,
            flags: flags.bits(),
            background_allocated: allocated,
        }
    }

    /// Classic max-generation segment ahead of the ephemeral one.
    pub fn small_segment(&mut self, mem: Address, allocated: Address) -> Address {
        let seg = self.new_segment(mem, allocated, SegmentFlags::empty());
        self.lists[MAX_GEN as usize].push(seg);
        seg.address
    }

    /// Classic ephemeral segment: gen 2 from `mem`, gen 1 from `gen1_start`,
    /// gen 0 from `gen0_start` up to `alloc_allocated`.
    pub fn ephemeral_segment(
        &mut self,
        mem: Address,
        gen1_start: Address,
        gen0_start: Address,
        alloc_allocated: Address,
    ) -> Address {
        let seg = self.new_segment(mem, alloc_allocated, SegmentFlags::empty());
        self.details.ephemeral_heap_segment = seg.address;
        self.details.alloc_allocated = alloc_allocated;
        self.details.generation_table[0].allocation_start = gen0_start;
        self.details.generation_table[1].allocation_start = gen1_start;
        self.details.generation_table[MAX_GEN as usize].allocation_start = mem;
        self.ephemeral = Some(seg);
        seg.address
    }

    pub fn large_segment(&mut self, mem: Address, allocated: Address) -> Address {
        let seg = self.new_segment(mem, allocated, SegmentFlags::LOH);
        self.lists[MAX_GEN as usize + 1].push(seg);
        seg.address
    }

    pub fn pinned_segment(&mut self, mem: Address, allocated: Address) -> Address {
        let seg = self.new_segment(mem, allocated, SegmentFlags::POH);
        self.details.has_poh = true;
        self.lists[MAX_GEN as usize + 2].push(seg);
        seg.address
    }

    /// Regions layout: a region owned by small generation `gen`.
    pub fn region(&mut self, gen: u32, mem: Address, allocated: Address) -> Address {
        let seg = self.new_segment(mem, allocated, SegmentFlags::empty());
        self.lists[gen as usize].push(seg);
        seg.address
    }

    pub fn frozen_region(&mut self, mem: Address, allocated: Address) -> Address {
        let seg = self.new_segment(mem, allocated, SegmentFlags::READ_ONLY);
        self.lists[MAX_GEN as usize].push(seg);
        seg.address
    }

    pub fn segment_mut(&mut self, address: Address) -> Option<&mut SegmentData> {
        if let Some(seg) = self.ephemeral.as_mut().filter(|s| s.address == address) {
            return Some(seg);
        }
        self.lists.iter_mut().flatten().find(|s| s.address == address)
    }

    pub fn object(&mut self, addr: Address, mt: Address) -> Address {
        self.builder.map_zeroed(addr - 8, 8).write_u64(addr, mt.as_u64());
        addr
    }

    pub fn node(&mut self, addr: Address, first: Address, second: Address) -> Address {
        self.object(addr, NODE_MT);
        self.builder
            .write_u64(addr + 8, first.as_u64())
            .write_u64(addr + 16, second.as_u64())
            .map_zeroed(addr + 24, 16);
        addr
    }

    pub fn record(&mut self, addr: Address) -> Address {
        self.object(addr, RECORD_MT)
    }

    pub fn array(&mut self, addr: Address, mt: Address, count: u32) -> Address {
        self.object(addr, mt);
        self.builder.write_u32(addr + 8, count).write_u32(addr + 12, 0);
        addr
    }

    pub fn object_array(&mut self, addr: Address, elements: &[Address]) -> Address {
        self.array(addr, OBJ_ARRAY_MT, elements.len() as u32);
        for (i, element) in elements.iter().enumerate() {
            self.builder.write_u64(addr + 16 + i as u64 * 8, element.as_u64());
        }
        addr
    }

    pub fn string(&mut self, addr: Address, text: &str) -> Address {
        let units: Vec<u16> = text.encode_utf16().collect();
        self.object(addr, STRING_MT);
        self.builder.write_u32(addr + 8, units.len() as u32);
        for (i, unit) in units.iter().chain(std::iter::once(&0u16)).enumerate() {
            self.builder.write_u16(addr + 12 + i as u64 * 2, *unit);
        }
        addr
    }

    /// Free object spanning exactly `size` bytes; `size` must be at least 24.
    pub fn free(&mut self, addr: Address, size: u64) -> Address {
        self.array(addr, FREE_MT, (size - 24) as u32);
        addr
    }

    pub fn collectible_object(&mut self, addr: Address, loader_allocator: Address) -> Address {
        self.object(addr, COLLECTIBLE_MT);
        self.builder.write_u64(LOADER_HANDLE, loader_allocator.as_u64());
        addr
    }

    pub fn thread(&mut self, os_id: u32, alloc_ptr: Address, alloc_limit: Address) -> Address {
        let address = Address::new(THREAD_RECORDS + self.threads.len() as u64 * 0x100);
        self.threads.push((
            address,
            ThreadData {
                os_thread_id: os_id,
                alloc_context_ptr: alloc_ptr,
                alloc_context_limit: alloc_limit,
                ..Default::default()
            },
        ));
        address
    }

    pub fn stack_ref(&mut self, os_id: u32, object: Address, interior: bool) {
        let source = Address::new(0x7ff0_0000 + self.stack_refs.len() as u64 * 8);
        self.stack_refs.push((
            os_id,
            StackRef {
                source,
                object,
                interior,
                pinned: false,
            },
        ));
    }

    pub fn gen0_alloc_context(&mut self, ptr: Address, limit: Address) {
        let gen0 = &mut self.details.generation_table[0];
        gen0.alloc_context_ptr = ptr;
        gen0.alloc_context_limit = limit;
    }

    pub fn global_alloc_context(&mut self, ptr: Address, limit: Address) {
        self.builder.global_alloc_context(AllocContextData {
            alloc_ptr: ptr,
            alloc_limit: limit,
        });
    }

    pub fn handle(&mut self, kind: HandleKind, object: Address, secondary: Address) -> Address {
        let handle = Address::new(self.next_handle);
        self.next_handle += 8;
        self.builder.write_u64(handle, object.as_u64());
        let strong = matches!(
            kind,
            HandleKind::Strong | HandleKind::Pinned | HandleKind::AsyncPinned | HandleKind::SizedRef | HandleKind::RefCounted
        );
        self.builder.handle(HandleData {
            handle,
            kind,
            secondary,
            strong,
        });
        handle
    }

    fn queue_segment_of_generation(gen: u32) -> usize {
        (MAX_GEN + 1 - gen) as usize
    }

    pub fn finalizable(&mut self, gen: u32, object: Address) {
        self.finalize[Self::queue_segment_of_generation(gen)].push(object);
    }

    pub fn ready_for_finalization(&mut self, object: Address) {
        self.finalize[MAX_GEN as usize + 3].push(object);
    }

    fn init_card_table(&mut self) {
        let lowest = LOWEST_ADDRESS.as_u64();
        self.builder
            .map_zeroed(Address::new(CARD_TABLE_PAGE), 0x1000)
            .write_u64(Address::new(CARD_TABLE_PAGE + 8), lowest)
            .write_u64(Address::new(CARD_TABLE - 8), 0);
        // the heap records the table translated by the first covered word
        let first_word = (lowest / 256) / 32;
        self.details.card_table = Address::new(CARD_TABLE - first_word * 4);
    }

    pub fn set_card(&mut self, addr: Address) {
        let card = (addr.as_u64() - LOWEST_ADDRESS.as_u64()) / 256;
        let word = Address::new(CARD_TABLE + (card / 32) * 4);
        *self.bit_words.entry(word).or_insert(0) |= 1 << (card % 32);
    }

    /// Background GC in its planning phase with the sweep at `sweep_position`.
    pub fn background_planning(&mut self, sweep_position: Address) {
        let lowest = LOWEST_ADDRESS.as_u64();
        self.details.current_gc_state = GcPhase::Planning;
        self.details.next_sweep_obj = sweep_position;
        self.details.mark_array = Address::new(MARK_ARRAY_PAGE - (lowest / 256) * 4);
        self.details.background_saved_lowest_address = LOWEST_ADDRESS;
        self.details.background_saved_highest_address = Address::new(0x40_0000);
        self.builder.map_zeroed(Address::new(MARK_ARRAY_PAGE), 0xc000);
    }

    pub fn set_mark(&mut self, addr: Address) {
        let word = self.details.mark_array + (addr.as_u64() / 256) * 4;
        *self.bit_words.entry(word).or_insert(0) |= 1 << ((addr.as_u64() / 8) % 32);
    }

    pub fn build_target(&self) -> ReplayTarget {
        let mut builder = self.builder.clone();
        let mut details = self.details.clone();

        for (gen, list) in self.lists.iter().enumerate() {
            let mut chain = list.clone();
            if gen == MAX_GEN as usize {
                chain.extend(self.ephemeral);
            }
            for i in 0..chain.len() {
                let next = chain.get(i + 1).map(|s| s.address).unwrap_or_default();
                chain[i].next = next;
                builder.segment(chain[i]);
            }
            details.generation_table[gen].start_segment = chain.first().map(|s| s.address).unwrap_or_default();
        }
        if let Some(ephemeral) = self.ephemeral.filter(|_| !details.has_regions) {
            for gen in 0..MAX_GEN as usize {
                details.generation_table[gen].start_segment = ephemeral.address;
            }
        }

        let mut fill = Vec::new();
        let mut cursor = FINALIZE_QUEUE;
        for entries in &self.finalize {
            for entry in entries {
                builder.write_u64(Address::new(cursor), entry.as_u64());
                cursor += 8;
            }
            fill.push(Address::new(cursor));
        }
        builder.map_zeroed(Address::new(FINALIZE_QUEUE), 8);
        details.finalization_fill_pointers = fill;

        let mut first_thread = Address::NULL;
        for (address, data) in self.threads.iter().rev() {
            let mut data = *data;
            data.next_thread = first_thread;
            let refs = self
                .stack_refs
                .iter()
                .filter(|(os_id, _)| *os_id == data.os_thread_id)
                .map(|(_, r)| *r)
                .collect();
            builder.thread(*address, data, refs);
            first_thread = *address;
        }
        builder.thread_store(ThreadStoreData {
            first_thread,
            thread_count: self.threads.len() as u32,
        });

        for (word, bits) in &self.bit_words {
            builder.write_u32(*word, *bits);
        }

        builder.heap(details);
        builder.build()
    }

    pub fn session(&self) -> HeapSession {
        let target = Arc::new(self.build_target());
        HeapSession::open(target.clone(), target, self.config.clone()).unwrap()
    }
}

fn mt_data(base_size: u32, contains_pointers: bool) -> MethodTableData {
    MethodTableData {
        base_size,
        contains_pointers,
        ..Default::default()
    }
}
