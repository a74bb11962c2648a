// Tue Jan 13 2026 - Alex

use crate::gc::{HeapError, ObjectLayout};
use crate::memory::{Address, MemoryReader, PageCache};
use std::sync::Arc;

/// One run of pointer slots. `size` is stored relative to the object size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcSeries {
    pub size: i64,
    pub offset: u64,
}

/// One repeating element pattern of a value-type array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSeriesItem {
    pub nptrs: u32,
    pub skip: u32,
}

/// Decoded GC descriptor: the trailer stored just before a method table.
///
/// The signed word at `mt - ptr` holds the series count. Series records
/// grow downward from `mt - ptr`; the record nearest the method table is
/// walked first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcDesc {
    Series(Vec<GcSeries>),
    ValueArray {
        start_offset: u64,
        items: Vec<ValueSeriesItem>,
    },
}

impl GcDesc {
    pub fn read(memory: &PageCache, layout: &ObjectLayout, mt: Address) -> Result<Self, HeapError> {
        let ptr = layout.pointer_size();
        let count = memory.read_isize(mt - ptr)?;
        let magnitude = count.unsigned_abs();
        if count == 0 {
            return Ok(GcDesc::Series(Vec::new()));
        }

        // count word + 2 words per series, or count + offset + one word per item
        let slots = if count >= 0 {
            magnitude.checked_mul(2).and_then(|n| n.checked_add(1))
        } else {
            magnitude.checked_add(2)
        };
        let bytes = slots
            .and_then(|n| n.checked_mul(ptr))
            .filter(|n| *n <= mt.as_u64())
            .ok_or_else(|| HeapError::OutOfMemory(format!("GC descriptor of {} has {} series", mt, count)))?;

        let mut buffer: Vec<u8> = Vec::new();
        buffer
            .try_reserve_exact(bytes as usize)
            .map_err(|_| HeapError::OutOfMemory(format!("GC descriptor of {} needs {} bytes", mt, bytes)))?;
        buffer.resize(bytes as usize, 0);
        memory.read_exact(mt - bytes, &mut buffer)?;

        let desc = DescBuffer {
            bytes: &buffer,
            ptr: ptr as usize,
        };
        // byte offset of the series record nearest the method table
        let highest = buffer.len() - ptr as usize - 2 * ptr as usize;

        if count >= 0 {
            let series = (0..magnitude as usize)
                .map(|i| {
                    let at = highest - i * 2 * ptr as usize;
                    GcSeries {
                        size: desc.word(at) as i64,
                        offset: desc.word(at + ptr as usize),
                    }
                })
                .collect();
            Ok(GcDesc::Series(series))
        } else {
            let start_offset = desc.word(highest + ptr as usize);
            let items = (0..magnitude as usize)
                .map(|i| desc.half_pair(highest - i * ptr as usize))
                .collect();
            Ok(GcDesc::ValueArray { start_offset, items })
        }
    }

    pub fn is_value_array(&self) -> bool {
        matches!(self, GcDesc::ValueArray { .. })
    }
}

struct DescBuffer<'a> {
    bytes: &'a [u8],
    ptr: usize,
}

impl<'a> DescBuffer<'a> {
    fn word(&self, at: usize) -> u64 {
        let raw = &self.bytes[at..at + self.ptr];
        if self.ptr == 4 {
            u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i32 as i64 as u64
        } else {
            u64::from_le_bytes([raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7]])
        }
    }

    fn half_pair(&self, at: usize) -> ValueSeriesItem {
        let raw = &self.bytes[at..at + self.ptr];
        if self.ptr == 4 {
            ValueSeriesItem {
                nptrs: u16::from_le_bytes([raw[0], raw[1]]) as u32,
                skip: u16::from_le_bytes([raw[2], raw[3]]) as u32,
            }
        } else {
            ValueSeriesItem {
                nptrs: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
                skip: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Field,
    /// Synthetic edge from an instance of a collectible type to its loader
    /// allocator object.
    LoaderAllocator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectReference {
    pub offset: u64,
    pub slot: Address,
    pub target: Address,
    pub kind: ReferenceKind,
}

enum Cursor {
    Empty,
    Series {
        desc: Arc<GcDesc>,
        next_series: usize,
        parm: u64,
        stop: u64,
    },
    ValueArray {
        desc: Arc<GcDesc>,
        item: usize,
        remaining: u32,
        parm: u64,
        stop: u64,
        cycle_start: u64,
    },
}

/// Pull iterator over the outbound references of one object.
///
/// Field slots come first in increasing offset order, then the loader
/// allocator edge for collectible types. A failed read ends the sequence
/// after yielding the error.
pub struct ReferenceIter<'a> {
    memory: &'a PageCache,
    object: Address,
    object_end: u64,
    ptr: u64,
    cursor: Cursor,
    loader_allocator: Option<Address>,
    done: bool,
}

impl<'a> ReferenceIter<'a> {
    /// `desc` is `None` for types without pointer fields.
    pub fn new(
        memory: &'a PageCache,
        layout: &ObjectLayout,
        object: Address,
        size: u64,
        desc: Option<Arc<GcDesc>>,
        loader_allocator: Option<Address>,
    ) -> Self {
        let ptr = layout.pointer_size();
        let obj = object.as_u64();
        let object_end = obj.saturating_add(size);

        let cursor = match desc {
            None => Cursor::Empty,
            Some(desc) => {
                let value_start = match desc.as_ref() {
                    GcDesc::ValueArray { start_offset, .. } => Some(*start_offset),
                    GcDesc::Series(_) => None,
                };
                match value_start {
                    None => Cursor::Series {
                        desc,
                        next_series: 0,
                        parm: 0,
                        stop: 0,
                    },
                    Some(start_offset) => {
                        let parm = obj.saturating_add(start_offset);
                        let stop = object_end.saturating_sub(layout.header_size());
                        Cursor::ValueArray {
                            desc,
                            item: 0,
                            remaining: 0,
                            parm,
                            stop,
                            cycle_start: parm,
                        }
                    }
                }
            }
        };

        Self {
            memory,
            object,
            object_end,
            ptr,
            cursor,
            loader_allocator,
            done: false,
        }
    }

    pub fn empty(memory: &'a PageCache, object: Address) -> Self {
        Self {
            memory,
            object,
            object_end: object.as_u64(),
            ptr: memory.pointer_size() as u64,
            cursor: Cursor::Empty,
            loader_allocator: None,
            done: false,
        }
    }

    fn next_slot(&mut self) -> Option<u64> {
        let ptr = self.ptr;
        let obj = self.object.as_u64();
        let object_end = self.object_end;

        match &mut self.cursor {
            Cursor::Empty => None,
            Cursor::Series {
                desc,
                next_series,
                parm,
                stop,
            } => loop {
                if *parm < *stop {
                    let slot = *parm;
                    *parm += ptr;
                    return Some(slot);
                }
                let series = match desc.as_ref() {
                    GcDesc::Series(series) => series,
                    GcDesc::ValueArray { .. } => return None,
                };
                let current = series.get(*next_series)?;
                *next_series += 1;
                *parm = obj.saturating_add(current.offset);
                let run = current.size.wrapping_add((object_end - obj) as i64);
                *stop = if run > 0 {
                    parm.saturating_add(run as u64).min(object_end)
                } else {
                    *parm
                };
            },
            Cursor::ValueArray {
                desc,
                item,
                remaining,
                parm,
                stop,
                cycle_start,
            } => {
                let items = match desc.as_ref() {
                    GcDesc::ValueArray { items, .. } => items,
                    GcDesc::Series(_) => return None,
                };
                loop {
                    if *remaining > 0 {
                        let slot = *parm;
                        if slot >= object_end {
                            return None;
                        }
                        *parm += ptr;
                        *remaining -= 1;
                        if *remaining == 0 {
                            *parm = parm.saturating_add(items[*item].skip as u64);
                            *item += 1;
                        }
                        return Some(slot);
                    }

                    if *item >= items.len() {
                        if *parm >= *stop || *parm == *cycle_start {
                            return None;
                        }
                        *item = 0;
                        *cycle_start = *parm;
                    } else if *item == 0 && *parm >= *stop {
                        return None;
                    }

                    let current = items[*item];
                    if current.nptrs == 0 {
                        *parm = parm.saturating_add(current.skip as u64);
                        *item += 1;
                    } else {
                        *remaining = current.nptrs;
                    }
                }
            }
        }
    }
}

impl<'a> Iterator for ReferenceIter<'a> {
    type Item = Result<ObjectReference, HeapError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(slot) = self.next_slot() {
            let slot = Address::new(slot);
            return match self.memory.read_ptr(slot) {
                Ok(target) => Some(Ok(ObjectReference {
                    offset: slot.distance_from(self.object),
                    slot,
                    target,
                    kind: ReferenceKind::Field,
                })),
                Err(_) => {
                    self.done = true;
                    Some(Err(HeapError::Unreadable { address: slot }))
                }
            };
        }

        self.done = true;
        let handle = self.loader_allocator.take()?;
        match self.memory.read_ptr(handle) {
            Ok(target) if target.is_null() => None,
            Ok(target) => Some(Ok(ObjectReference {
                offset: 0,
                slot: handle,
                target,
                kind: ReferenceKind::LoaderAllocator,
            })),
            Err(_) => Some(Err(HeapError::Unreadable { address: handle })),
        }
    }
}
