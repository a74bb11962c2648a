// Tue Jan 13 2026 - Alex

use crate::memory::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Read failed at address {0}")]
    ReadFailed(Address),
    #[error("Short read at address {address}: wanted {wanted} bytes, got {got}")]
    ShortRead { address: Address, wanted: usize, got: usize },
    #[error("Address range overflows at {0}")]
    Overflow(Address),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl MemoryError {
    /// The address the failed request started at, when there is one.
    pub fn address(&self) -> Option<Address> {
        match self {
            MemoryError::ReadFailed(addr) | MemoryError::Overflow(addr) => Some(*addr),
            MemoryError::ShortRead { address, .. } => Some(*address),
            MemoryError::InvalidAddress(_) => None,
        }
    }
}
