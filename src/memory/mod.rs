// Tue Jan 13 2026 - Alex

pub mod address;
pub mod cache;
pub mod error;
pub mod range;
pub mod traits;

pub use address::Address;
pub use cache::{PageCache, DEFAULT_WINDOW_SIZE};
pub use error::MemoryError;
pub use range::MemoryRange;
pub use traits::MemoryReader;
