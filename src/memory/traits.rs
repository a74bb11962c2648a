// Wed Jan 15 2026 - Alex

use crate::memory::{Address, MemoryError};

/// Raw read-virtual access to a frozen target.
///
/// Implementors only supply `read_into`; the typed readers are built on top
/// and decode little-endian values.
pub trait MemoryReader: Send + Sync {
    /// Copies up to `buf.len()` bytes starting at `addr` and returns how many
    /// were copied. A short count is not an error at this level.
    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<usize, MemoryError>;

    fn read_exact(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        let got = self.read_into(addr, buf)?;
        if got < buf.len() {
            return Err(MemoryError::ShortRead {
                address: addr,
                wanted: buf.len(),
                got,
            });
        }
        Ok(())
    }

    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0u8; len];
        self.read_exact(addr, &mut buf)?;
        Ok(buf)
    }

    fn read_u8(&self, addr: Address) -> Result<u8, MemoryError> {
        let mut buf = [0u8; 1];
        self.read_exact(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&self, addr: Address) -> Result<u16, MemoryError> {
        let mut buf = [0u8; 2];
        self.read_exact(addr, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&self, addr: Address) -> Result<u32, MemoryError> {
        let mut buf = [0u8; 4];
        self.read_exact(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&self, addr: Address) -> Result<u64, MemoryError> {
        let mut buf = [0u8; 8];
        self.read_exact(addr, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_i32(&self, addr: Address) -> Result<i32, MemoryError> {
        Ok(self.read_u32(addr)? as i32)
    }

    fn read_i64(&self, addr: Address) -> Result<i64, MemoryError> {
        Ok(self.read_u64(addr)? as i64)
    }
}
