// Tue Jan 13 2026 - Alex

use crate::memory::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsefulGlobals {
    pub free_method_table: Address,
    pub string_method_table: Address,
    pub array_method_table: Address,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcHeapData {
    pub server_mode: bool,
    pub heap_count: u32,
    pub max_generation: u32,
    pub structures_valid: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationData {
    pub start_segment: Address,
    pub allocation_start: Address,
    pub alloc_context_ptr: Address,
    pub alloc_context_limit: Address,
}

/// Background GC phase as reported for a heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GcPhase {
    Marking,
    Planning,
    #[default]
    Free,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcHeapDetailsData {
    pub heap_address: Address,
    pub alloc_allocated: Address,
    pub ephemeral_heap_segment: Address,
    pub card_table: Address,
    pub lowest_address: Address,
    pub highest_address: Address,
    pub mark_array: Address,
    pub current_gc_state: GcPhase,
    pub next_sweep_obj: Address,
    pub saved_sweep_ephemeral_seg: Address,
    pub saved_sweep_ephemeral_start: Address,
    pub background_saved_lowest_address: Address,
    pub background_saved_highest_address: Address,
    /// Indexed by generation: `0..=max_gen` small, then LOH, then POH.
    pub generation_table: Vec<GenerationData>,
    /// Finalize queue boundaries: queue segment `s` spans `[fill[s-1], fill[s])`.
    pub finalization_fill_pointers: Vec<Address>,
    pub has_regions: bool,
    pub has_poh: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentData {
    pub address: Address,
    pub gc_heap: Address,
    pub mem: Address,
    pub allocated: Address,
    pub high_alloc_mark: Address,
    pub committed: Address,
    pub reserved: Address,
    pub next: Address,
    pub flags: u64,
    pub background_allocated: Address,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodTableData {
    pub base_size: u32,
    pub component_size: u32,
    pub contains_pointers: bool,
    pub parent_method_table: Address,
    pub module: Address,
    pub token: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectibleData {
    pub collectible: bool,
    pub loader_allocator_handle: Address,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadStoreData {
    pub first_thread: Address,
    pub thread_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadData {
    pub next_thread: Address,
    pub os_thread_id: u32,
    pub alloc_context_ptr: Address,
    pub alloc_context_limit: Address,
    pub domain: Address,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocContextData {
    pub alloc_ptr: Address,
    pub alloc_limit: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    WeakShort,
    WeakLong,
    Strong,
    Pinned,
    RefCounted,
    Dependent,
    AsyncPinned,
    SizedRef,
    WeakWinRT,
}

impl HandleKind {
    pub const ALL: [HandleKind; 9] = [
        HandleKind::WeakShort,
        HandleKind::WeakLong,
        HandleKind::Strong,
        HandleKind::Pinned,
        HandleKind::RefCounted,
        HandleKind::Dependent,
        HandleKind::AsyncPinned,
        HandleKind::SizedRef,
        HandleKind::WeakWinRT,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HandleKind::WeakShort => "weak short",
            HandleKind::WeakLong => "weak long",
            HandleKind::Strong => "strong",
            HandleKind::Pinned => "pinned",
            HandleKind::RefCounted => "ref counted",
            HandleKind::Dependent => "dependent",
            HandleKind::AsyncPinned => "async pinned",
            HandleKind::SizedRef => "sized ref",
            HandleKind::WeakWinRT => "weak WinRT",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One handle table entry. The handle address holds the object pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleData {
    pub handle: Address,
    pub kind: HandleKind,
    #[serde(default)]
    pub secondary: Address,
    #[serde(default)]
    pub strong: bool,
}

/// A slot found by the stack walker. `source` is the stack or register
/// location, `object` the value it held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackRef {
    pub source: Address,
    pub object: Address,
    pub interior: bool,
    pub pinned: bool,
}
