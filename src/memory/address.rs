// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A target-process virtual address. Never dereferenced on the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address {
    value: u64,
}

impl Address {
    pub const NULL: Address = Address { value: 0 };

    pub const fn new(value: u64) -> Self {
        Self { value }
    }

    pub fn zero() -> Self {
        Self::NULL
    }

    pub fn as_u64(&self) -> u64 {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value == 0
    }

    pub fn is_aligned(&self, alignment: u64) -> bool {
        self.value % alignment == 0
    }

    pub fn align_down(&self, alignment: u64) -> Self {
        Self { value: self.value & !(alignment - 1) }
    }

    pub fn align_up(&self, alignment: u64) -> Self {
        Self { value: (self.value + alignment - 1) & !(alignment - 1) }
    }

    pub fn checked_add(&self, rhs: u64) -> Option<Self> {
        self.value.checked_add(rhs).map(Self::new)
    }

    pub fn wrapping_sub(&self, rhs: u64) -> Self {
        Self { value: self.value.wrapping_sub(rhs) }
    }

    /// Bytes from `other` up to `self`, zero when `other` is above.
    pub fn distance_from(&self, other: Address) -> u64 {
        self.value.saturating_sub(other.value)
    }

    pub fn is_within_range(&self, start: Self, end: Self) -> bool {
        self.value >= start.value && self.value < end.value
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl Add<u64> for Address {
    type Output = Self;
    fn add(self, rhs: u64) -> Self::Output {
        Self { value: self.value.wrapping_add(rhs) }
    }
}

impl Sub<u64> for Address {
    type Output = Self;
    fn sub(self, rhs: u64) -> Self::Output {
        Self { value: self.value.wrapping_sub(rhs) }
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.value
    }
}
