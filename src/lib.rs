// Tue Jan 15 2026 - Alex

#![allow(unused_variables)]
#![allow(dead_code)]
#![allow(ambiguous_glob_reexports)]

pub mod config;
pub mod dac;
pub mod gc;
pub mod memory;
pub mod replay;
pub mod roots;
pub mod session;
pub mod stats;
pub mod ui;
pub mod utils;
pub mod validation;

pub use config::{Architecture, HeapConfig};
pub use dac::DataAccess;
pub use gc::{HeapError, HeapObject, HeapSnapshot, ObjectVisitor, TraversalSummary};
pub use memory::{Address, MemoryReader};
pub use replay::ReplayTarget;
pub use roots::{LiveSet, RootPath, RootSet};
pub use session::HeapSession;
pub use stats::{HeapStat, HeapUsage};
pub use validation::VerificationReport;
