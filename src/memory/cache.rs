// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const DEFAULT_WINDOW_SIZE: usize = 0x1000;

struct Window {
    start: u64,
    data: Vec<u8>,
    valid: usize,
    populated: bool,
}

impl Window {
    fn covers(&self, addr: u64, len: usize) -> bool {
        if !self.populated || addr < self.start {
            return false;
        }
        let offset = addr - self.start;
        offset
            .checked_add(len as u64)
            .map_or(false, |end| end <= self.valid as u64)
    }
}

/// Single-slot read-through cache over a raw reader.
///
/// A miss refills the whole window starting at the requested address, so
/// forward linear sweeps hit on almost every read. Requests bigger than the
/// window go straight to the reader. The target is frozen, so the window is
/// never invalidated while a session is open.
pub struct PageCache {
    reader: Arc<dyn MemoryReader>,
    window: Mutex<Window>,
    window_size: usize,
    pointer_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PageCache {
    pub fn new(reader: Arc<dyn MemoryReader>, pointer_size: usize) -> Self {
        Self::with_window_size(reader, pointer_size, DEFAULT_WINDOW_SIZE)
    }

    pub fn with_window_size(reader: Arc<dyn MemoryReader>, pointer_size: usize, window_size: usize) -> Self {
        let window_size = window_size.max(pointer_size);
        Self {
            reader,
            window: Mutex::new(Window {
                start: 0,
                data: vec![0u8; window_size],
                valid: 0,
                populated: false,
            }),
            window_size,
            pointer_size,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn pointer_size(&self) -> usize {
        self.pointer_size
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Reads a target pointer, honoring the target's pointer width.
    pub fn read_ptr(&self, addr: Address) -> Result<Address, MemoryError> {
        if self.pointer_size == 4 {
            Ok(Address::new(self.read_u32(addr)? as u64))
        } else {
            Ok(Address::new(self.read_u64(addr)?))
        }
    }

    /// Reads a signed pointer-sized integer.
    pub fn read_isize(&self, addr: Address) -> Result<i64, MemoryError> {
        if self.pointer_size == 4 {
            Ok(self.read_i32(addr)? as i64)
        } else {
            self.read_i64(addr)
        }
    }

    pub fn clear(&self) {
        let mut window = self.window.lock();
        window.populated = false;
        window.valid = 0;
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    fn refill(&self, window: &mut Window, addr: u64) -> Result<(), MemoryError> {
        let size = self.window_size as u64;
        let mut start = addr;
        if start.checked_add(size).is_none() {
            start = u64::MAX - size + 1;
        }

        window.populated = false;
        window.start = start;
        let got = self.reader.read_into(Address::new(start), &mut window.data)?;
        window.valid = got;
        window.populated = true;
        Ok(())
    }
}

impl MemoryReader for PageCache {
    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<usize, MemoryError> {
        if buf.len() > self.window_size {
            return self.reader.read_into(addr, buf);
        }

        let mut window = self.window.lock();
        if window.covers(addr.as_u64(), buf.len()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            self.refill(&mut window, addr.as_u64())?;
        }

        let offset = (addr.as_u64() - window.start) as usize;
        if offset >= window.valid {
            return Ok(0);
        }
        let count = buf.len().min(window.valid - offset);
        buf[..count].copy_from_slice(&window.data[offset..offset + count]);
        Ok(count)
    }
}
