// Tue Jan 13 2026 - Alex

pub mod error;
pub mod traits;
pub mod types;

pub use error::DacError;
pub use traits::DataAccess;
pub use types::{
    AllocContextData, CollectibleData, GcHeapData, GcHeapDetailsData, GcPhase, GenerationData,
    HandleData, HandleKind, MethodTableData, SegmentData, StackRef, ThreadData, ThreadStoreData,
    UsefulGlobals,
};
