// Wed Jan 15 2026 - Alex

use crate::dac::{
    AllocContextData, CollectibleData, DacError, GcHeapData, GcHeapDetailsData, HandleData,
    HandleKind, MethodTableData, SegmentData, StackRef, ThreadData, ThreadStoreData, UsefulGlobals,
};
use crate::memory::Address;

/// Runtime data requests answered by the host's data access layer.
///
/// Raw memory reads go through [`crate::memory::MemoryReader`]; everything
/// here returns already-decoded runtime structures.
pub trait DataAccess: Send + Sync {
    fn useful_globals(&self) -> Result<UsefulGlobals, DacError>;

    fn gc_heap_data(&self) -> Result<GcHeapData, DacError>;

    /// Per-heap addresses. Only meaningful for server GC.
    fn gc_heap_list(&self) -> Result<Vec<Address>, DacError>;

    /// `None` asks for the single workstation heap.
    fn gc_heap_details(&self, heap: Option<Address>) -> Result<GcHeapDetailsData, DacError>;

    fn heap_segment_data(&self, segment: Address, heap: Option<Address>) -> Result<SegmentData, DacError>;

    fn method_table_data(&self, mt: Address) -> Result<MethodTableData, DacError>;

    /// Optional. Targets that cannot answer are treated as having no
    /// collectible types.
    fn method_table_collectible_data(&self, mt: Address) -> Result<CollectibleData, DacError> {
        let _ = mt;
        Err(DacError::NotSupported("method table collectible data"))
    }

    fn method_table_name(&self, mt: Address) -> Option<String> {
        let _ = mt;
        None
    }

    fn thread_store(&self) -> Result<ThreadStoreData, DacError>;

    fn thread_data(&self, thread: Address) -> Result<ThreadData, DacError>;

    fn enumerate_handles(&self, filter: Option<&[HandleKind]>) -> Result<Vec<HandleData>, DacError>;

    fn enumerate_stack_references(&self, os_thread_id: u32) -> Result<Vec<StackRef>, DacError>;

    fn global_allocation_context(&self) -> Result<Option<AllocContextData>, DacError> {
        Ok(None)
    }
}
