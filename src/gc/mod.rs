// Tue Jan 13 2026 - Alex

pub mod alloc_context;
pub mod details;
pub mod error;
pub mod gcdesc;
pub mod generations;
pub mod interrupt;
pub mod layout;
pub mod locate;
pub mod mt_cache;
pub mod object;
pub mod segment;
pub mod snapshot;
pub mod traverse;
pub mod walker;

pub use alloc_context::AllocationContexts;
pub use details::{FinalizeQueue, HeapDetails};
pub use error::HeapError;
pub use gcdesc::{GcDesc, GcSeries, ObjectReference, ReferenceIter, ReferenceKind, ValueSeriesItem};
pub use generations::{collect_heap_segments, segments_in_generation, SegmentChain, SegmentQuery};
pub use interrupt::InterruptFlag;
pub use layout::ObjectLayout;
pub use locate::{locate, Location};
pub use mt_cache::{MethodTableCache, MethodTableInfo, TypeAncestors};
pub use object::{ObjectReader, ObjectView};
pub use segment::{HeapSegment, SegmentFlags, SegmentKind};
pub use snapshot::HeapSnapshot;
pub use traverse::{HeapObject, HeapTraverser, ObjectVisitor, TraversalSummary};
pub use walker::{ObjectWalker, WalkStep};
