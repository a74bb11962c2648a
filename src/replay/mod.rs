// Tue Jan 13 2026 - Alex

pub mod builder;
pub mod image;
pub mod target;

#[cfg(test)]
pub mod fixture;

pub use builder::ImageBuilder;
pub use image::{MemoryBlock, MethodTableRecord, TargetImage, ThreadRecord};
pub use target::{ReplayError, ReplayTarget};
