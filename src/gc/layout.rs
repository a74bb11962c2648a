// Tue Jan 13 2026 - Alex

use crate::config::HeapConfig;
use crate::memory::Address;

const OS_PAGE_SIZE: u64 = 0x1000;
const CARD_WORD_WIDTH: u64 = 32;

/// Size and alignment rules of the target's object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLayout {
    pointer_size: u64,
    align_const: u64,
    large_align_const: u64,
}

impl ObjectLayout {
    pub fn new(pointer_size: usize, large_alignment: u64) -> Self {
        let pointer_size = pointer_size as u64;
        Self {
            pointer_size,
            align_const: pointer_size - 1,
            large_align_const: large_alignment.max(pointer_size) - 1,
        }
    }

    pub fn from_config(config: &HeapConfig) -> Self {
        Self::new(config.pointer_size(), config.large_object_alignment)
    }

    pub fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    /// The object header (sync block) precedes the method table slot.
    pub fn header_size(&self) -> u64 {
        self.pointer_size
    }

    pub fn min_object_size(&self) -> u64 {
        3 * self.pointer_size
    }

    pub fn aligned_min_object_size(&self) -> u64 {
        self.align(self.min_object_size())
    }

    pub fn align(&self, size: u64) -> u64 {
        size.saturating_add(self.align_const) & !self.align_const
    }

    pub fn align_large(&self, size: u64) -> u64 {
        size.saturating_add(self.large_align_const) & !self.large_align_const
    }

    pub fn alignment(&self, large: bool) -> u64 {
        if large {
            self.large_align_const + 1
        } else {
            self.align_const + 1
        }
    }

    /// Low bits of the method table slot carry GC mark state.
    pub fn strip_method_table(&self, raw: Address) -> Address {
        Address::new(raw.as_u64() & !self.align_const)
    }

    /// Offset of the component count in arrays and strings.
    pub fn component_count_offset(&self) -> u64 {
        self.pointer_size
    }

    pub fn string_chars_offset(&self) -> u64 {
        self.pointer_size + 4
    }

    /// Bytes of heap covered by one card.
    pub fn card_size(&self) -> u64 {
        (self.pointer_size / 4) * OS_PAGE_SIZE / CARD_WORD_WIDTH
    }

    pub fn card_word_width(&self) -> u64 {
        CARD_WORD_WIDTH
    }

    pub fn card_of(&self, addr: Address) -> u64 {
        addr.as_u64() / self.card_size()
    }

    pub fn card_word(&self, card: u64) -> u64 {
        card / CARD_WORD_WIDTH
    }

    pub fn page_size(&self) -> u64 {
        OS_PAGE_SIZE
    }
}
