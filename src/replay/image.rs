// Tue Jan 13 2026 - Alex

use crate::config::Architecture;
use crate::dac::{
    AllocContextData, CollectibleData, GcHeapData, GcHeapDetailsData, HandleData, MethodTableData,
    SegmentData, StackRef, ThreadData, ThreadStoreData, UsefulGlobals,
};
use crate::memory::Address;
use serde::{Deserialize, Serialize};

/// A frozen target serialized to disk: raw memory plus the answers the
/// runtime's data access layer would give.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetImage {
    pub architecture: Architecture,
    pub memory: Vec<MemoryBlock>,
    pub globals: UsefulGlobals,
    pub gc_heap: GcHeapData,
    pub heaps: Vec<GcHeapDetailsData>,
    pub segments: Vec<SegmentData>,
    pub method_tables: Vec<MethodTableRecord>,
    pub thread_store: ThreadStoreData,
    pub threads: Vec<ThreadRecord>,
    pub handles: Vec<HandleData>,
    pub global_alloc_context: Option<AllocContextData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub address: Address,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodTableRecord {
    pub address: Address,
    pub data: MethodTableData,
    #[serde(default)]
    pub collectible: Option<CollectibleData>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub address: Address,
    pub data: ThreadData,
    #[serde(default)]
    pub stack_refs: Vec<StackRef>,
}

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::fmt::Write;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            let _ = write!(out, "{:02x}", b);
        }
        serializer.serialize_str(&out)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.len() % 2 != 0 {
            return Err(de::Error::custom("odd number of hex digits"));
        }
        (0..text.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&text[i..i + 2], 16).map_err(de::Error::custom))
            .collect()
    }
}
