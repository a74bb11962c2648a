// Tue Jan 13 2026 - Alex

pub mod finalization;
pub mod heap_stat;
pub mod usage;

pub use finalization::{summarize as summarize_finalization, FinalizerSummary, QueueList, QueueRange};
pub use heap_stat::{HeapStat, StatEntry};
pub use usage::{GenerationUsage, HeapUsage, UsageCollector};
