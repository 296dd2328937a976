//! WebAssembly linear memory implementation
//!
//! A byte vector sized in 64KiB pages. Every access goes through
//! `check_bounds`, which rejects any range whose end overflows or passes the
//! current length; such accesses trap with `MemoryOutOfBounds`.
//!
//! Addresses are taken as `u64` so that `base + offset` of two `u32`s can be
//! formed without wrapping.

use super::RuntimeError;
use byteorder::{ByteOrder, LittleEndian};

/// WebAssembly page size in bytes (64KiB)
pub const PAGE_SIZE: usize = 65536;

/// Maximum number of pages addressable with 32-bit addresses (4GiB)
pub const MAX_PAGES: u32 = 65536;

#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
    max_pages: Option<u32>,
}

impl Memory {
    /// Allocate `initial_pages` zeroed pages.
    ///
    /// # Errors
    /// `MemoryError` if the initial size is larger than the maximum or than
    /// the 4GiB address space.
    pub fn new(initial_pages: u32, max_pages: Option<u32>) -> Result<Self, RuntimeError> {
        if initial_pages > MAX_PAGES {
            return Err(RuntimeError::MemoryError(format!(
                "initial size {initial_pages} pages exceeds limit of {MAX_PAGES} pages"
            )));
        }
        if let Some(max) = max_pages {
            if initial_pages > max {
                return Err(RuntimeError::MemoryError(format!(
                    "initial size {initial_pages} pages exceeds declared maximum {max}"
                )));
            }
        }
        Ok(Memory {
            data: vec![0u8; initial_pages as usize * PAGE_SIZE],
            max_pages,
        })
    }

    /// Current size in pages
    pub fn size(&self) -> u32 {
        (self.data.len() / PAGE_SIZE) as u32
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    /// Grow by `delta_pages`, returning the previous size in pages or -1 if
    /// the new size would pass the declared maximum (or `MAX_PAGES`).
    pub fn grow(&mut self, delta_pages: u32) -> i32 {
        let current = self.size();
        let Some(new_pages) = current.checked_add(delta_pages) else {
            return -1;
        };
        if new_pages > self.max_pages.unwrap_or(MAX_PAGES).min(MAX_PAGES) {
            return -1;
        }
        let new_len = new_pages as usize * PAGE_SIZE;
        if self.data.try_reserve(new_len - self.data.len()).is_err() {
            return -1;
        }
        self.data.resize(new_len, 0);
        current as i32
    }

    #[inline]
    fn check_bounds(&self, addr: u64, size: usize) -> Result<usize, RuntimeError> {
        let end = addr
            .checked_add(size as u64)
            .ok_or(RuntimeError::MemoryOutOfBounds)?;
        if end > self.data.len() as u64 {
            return Err(RuntimeError::MemoryOutOfBounds);
        }
        Ok(addr as usize)
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> Result<&[u8], RuntimeError> {
        let start = self.check_bounds(addr, len)?;
        Ok(&self.data[start..start + len])
    }

    pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u8(&self, addr: u64) -> Result<u8, RuntimeError> {
        let start = self.check_bounds(addr, 1)?;
        Ok(self.data[start])
    }

    pub fn read_u16(&self, addr: u64) -> Result<u16, RuntimeError> {
        Ok(LittleEndian::read_u16(self.read_bytes(addr, 2)?))
    }

    pub fn read_u32(&self, addr: u64) -> Result<u32, RuntimeError> {
        Ok(LittleEndian::read_u32(self.read_bytes(addr, 4)?))
    }

    pub fn read_u64(&self, addr: u64) -> Result<u64, RuntimeError> {
        Ok(LittleEndian::read_u64(self.read_bytes(addr, 8)?))
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 1)?;
        self.data[start] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, addr: u64, value: u16) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 2)?;
        LittleEndian::write_u16(&mut self.data[start..start + 2], value);
        Ok(())
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 4)?;
        LittleEndian::write_u32(&mut self.data[start..start + 4], value);
        Ok(())
    }

    pub fn write_u64(&mut self, addr: u64, value: u64) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 8)?;
        LittleEndian::write_u64(&mut self.data[start..start + 8], value);
        Ok(())
    }
}
