// Tue Jan 13 2026 - Alex

use crate::memory::Address;
use indexmap::IndexMap;

/// Secondaries kept alive by dependent handles, grouped by primary.
#[derive(Debug, Clone, Default)]
pub struct DependentHandleMap {
    entries: IndexMap<Address, Vec<Address>>,
}

impl DependentHandleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Secondaries keep handle order, one entry per handle. Pairs with a
    /// null end are ignored.
    pub fn insert(&mut self, primary: Address, secondary: Address) {
        if primary.is_null() || secondary.is_null() {
            return;
        }
        self.entries.entry(primary).or_default().push(secondary);
    }

    pub fn secondaries(&self, primary: Address) -> &[Address] {
        self.entries.get(&primary).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, &[Address])> + '_ {
        self.entries.iter().map(|(primary, secondaries)| (*primary, secondaries.as_slice()))
    }

    /// Number of primaries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
