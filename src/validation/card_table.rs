// Tue Jan 13 2026 - Alex

use crate::gc::{HeapDetails, HeapError, ObjectLayout};
use crate::memory::{Address, MemoryReader, PageCache};
use ahash::AHashSet;

/// Reader for a heap's card table chain.
///
/// The heap records the table translated so that indexing by absolute
/// card number works. Each table in the chain keeps its lowest covered
/// address one word into its page and a link to the next table one word
/// before the bits.
pub struct CardTable<'a> {
    memory: &'a PageCache,
    layout: ObjectLayout,
}

impl<'a> CardTable<'a> {
    pub fn new(memory: &'a PageCache, layout: ObjectLayout) -> Self {
        Self { memory, layout }
    }

    pub fn is_present(heap: &HeapDetails) -> bool {
        !heap.card_table().is_null()
    }

    /// True if the card covering `addr` is set in any table of the chain.
    pub fn is_card_set(&self, heap: &HeapDetails, addr: Address) -> Result<bool, HeapError> {
        let layout = &self.layout;
        let ptr = layout.pointer_size();
        let first_word = layout.card_word(layout.card_of(heap.lowest_address()));
        let mut table = heap.card_table() + first_word * 4;
        let mut seen = AHashSet::new();

        while !table.is_null() && seen.insert(table) {
            let lowest = self.memory.read_ptr(table.align_down(layout.page_size()) + ptr)?;
            let next = self.memory.read_ptr(table - ptr)?;

            if let Some(offset) = addr.as_u64().checked_sub(lowest.as_u64()) {
                let card = offset / layout.card_size();
                let word = self.memory.read_u32(table + layout.card_word(card) * 4)?;
                if word & (1u32 << (card % layout.card_word_width())) != 0 {
                    return Ok(true);
                }
            }
            table = next;
        }
        Ok(false)
    }

    /// True if any card covering `[start, start + size)` is set.
    pub fn any_card_set(&self, heap: &HeapDetails, start: Address, size: u64) -> Result<bool, HeapError> {
        let card_size = self.layout.card_size();
        let end = start.as_u64().saturating_add(size);
        let mut addr = start.as_u64();
        while addr < end {
            if self.is_card_set(heap, Address::new(addr))? {
                return Ok(true);
            }
            addr = addr.saturating_add(card_size);
        }

        let last_slot = end.saturating_sub(self.layout.pointer_size());
        if last_slot >= start.as_u64() {
            return self.is_card_set(heap, Address::new(last_slot));
        }
        Ok(false)
    }
}
