// Tue Jan 13 2026 - Alex

use crate::dac::DacError;
use crate::memory::{Address, MemoryError};
use thiserror::Error;

fn last_good_suffix(last_good: &Option<Address>) -> String {
    match last_good {
        Some(addr) => format!(", last good object {}", addr),
        None => String::new(),
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("Unreadable memory at {address}")]
    Unreadable { address: Address },
    #[error("Corrupt object at {address}: {reason}{}", last_good_suffix(.last_good))]
    CorruptObject {
        address: Address,
        last_good: Option<Address>,
        reason: String,
    },
    #[error("Unknown type: method table {0} could not be resolved")]
    UnknownType(Address),
    #[error("Missing card: {parent} references younger object {child}")]
    WriteBarrierMissing { parent: Address, child: Address },
    #[error("Out of memory: {0}")]
    OutOfMemory(String),
    #[error("Interrupted")]
    Interrupted,
    #[error("Invariant broken: {0}")]
    InvariantBroken(String),
    #[error(transparent)]
    DataAccess(#[from] DacError),
}

impl HeapError {
    pub fn corrupt(address: Address, last_good: Option<Address>, reason: impl Into<String>) -> Self {
        HeapError::CorruptObject {
            address,
            last_good,
            reason: reason.into(),
        }
    }

    /// Kinds that are confined to one object or segment; the caller reports
    /// them and moves on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HeapError::Unreadable { .. }
                | HeapError::CorruptObject { .. }
                | HeapError::UnknownType(_)
                | HeapError::WriteBarrierMissing { .. }
                | HeapError::DataAccess(_)
        )
    }

    pub fn address(&self) -> Option<Address> {
        match self {
            HeapError::Unreadable { address } | HeapError::CorruptObject { address, .. } => Some(*address),
            HeapError::UnknownType(mt) => Some(*mt),
            HeapError::WriteBarrierMissing { parent, .. } => Some(*parent),
            _ => None,
        }
    }
}

impl From<MemoryError> for HeapError {
    fn from(err: MemoryError) -> Self {
        HeapError::Unreadable {
            address: err.address().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_message_mentions_last_good() {
        let err = HeapError::corrupt(Address::new(0x2000), Some(Address::new(0x1fe8)), "bad method table");
        let msg = err.to_string();
        assert!(msg.contains("0x0000000000002000"));
        assert!(msg.contains("last good object 0x0000000000001fe8"));

        let err = HeapError::corrupt(Address::new(0x2000), None, "bad method table");
        assert!(!err.to_string().contains("last good"));
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(HeapError::UnknownType(Address::new(1)).is_recoverable());
        assert!(!HeapError::Interrupted.is_recoverable());
        assert!(!HeapError::OutOfMemory("x".into()).is_recoverable());
        assert!(!HeapError::InvariantBroken("x".into()).is_recoverable());
    }

    #[test]
    fn test_memory_error_keeps_address() {
        let err: HeapError = MemoryError::ReadFailed(Address::new(0xdead_beef)).into();
        assert_eq!(err.address(), Some(Address::new(0xdead_beef)));
    }
}
