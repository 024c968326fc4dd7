//! Flat byte-addressable memory.
//!
//! The machine sees exactly 1 MiB. Every address is reduced into the
//! 20-bit space before it touches the backing store, so an access can
//! never land outside memory: addresses past the top simply wrap.

use thiserror::Error;

/// Memory size in bytes (2^20).
pub const MEMORY_SIZE: usize = 1 << 20;

/// Mask that reduces any address into the 20-bit space.
pub const ADDR_MASK: u32 = 0xF_FFFF;

/// Reduce an address into the 20-bit space.
#[inline]
pub const fn wrap(addr: u32) -> u32 {
    addr & ADDR_MASK
}

/// Machine memory: 2^20 zero-initialized bytes.
#[derive(Clone)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Allocate a zeroed memory.
    ///
    /// Allocation failure is reported instead of aborting the process.
    pub fn new() -> Result<Self, MemoryError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(MEMORY_SIZE)
            .map_err(|_| MemoryError::AllocationFailed { size: MEMORY_SIZE })?;
        bytes.resize(MEMORY_SIZE, 0);
        Ok(Self { bytes })
    }

    #[inline]
    pub fn read_byte(&self, addr: u32) -> u8 {
        self.bytes[wrap(addr) as usize]
    }

    #[inline]
    pub fn write_byte(&mut self, addr: u32, value: u8) {
        self.bytes[wrap(addr) as usize] = value;
    }

    /// Read a little-endian 16-bit word. The high byte wraps independently.
    #[inline]
    pub fn read_word(&self, addr: u32) -> u16 {
        let low = self.read_byte(addr);
        let high = self.read_byte(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    /// Write a little-endian 16-bit word.
    #[inline]
    pub fn write_word(&mut self, addr: u32, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_byte(addr, low);
        self.write_byte(addr.wrapping_add(1), high);
    }

    /// Read a 20-bit address stored in three bytes; only the low nibble
    /// of the third byte is significant.
    pub fn read_addr20(&self, addr: u32) -> u32 {
        let b0 = self.read_byte(addr) as u32;
        let b1 = self.read_byte(addr.wrapping_add(1)) as u32;
        let b2 = self.read_byte(addr.wrapping_add(2)) as u32;
        b0 | (b1 << 8) | ((b2 & 0x0F) << 16)
    }

    /// Copy `data` into memory starting at `origin`, wrapping at the top.
    pub fn load(&mut self, origin: u32, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            self.write_byte(origin.wrapping_add(offset as u32), byte);
        }
    }

    /// Read a NUL-terminated string starting at `addr`.
    ///
    /// The terminator is not included. The scan wraps around the top of
    /// memory and gives up after one full pass if no NUL byte exists.
    pub fn read_cstring(&self, addr: u32) -> Vec<u8> {
        let mut out = Vec::new();
        for offset in 0..MEMORY_SIZE as u32 {
            let byte = self.read_byte(addr.wrapping_add(offset));
            if byte == 0 {
                break;
            }
            out.push(byte);
        }
        out
    }

    /// Write `data` followed by a NUL terminator, wrapping at the top.
    pub fn write_cstring(&mut self, addr: u32, data: &[u8]) {
        self.load(addr, data);
        self.write_byte(addr.wrapping_add(data.len() as u32), 0);
    }

    /// Zero every byte.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Dump `count` bytes starting at `start` (wrapping), for inspection.
    pub fn dump(&self, start: u32, count: usize) -> Vec<(u32, u8)> {
        (0..count as u32)
            .map(|i| {
                let addr = wrap(start.wrapping_add(i));
                (addr, self.read_byte(addr))
            })
            .collect()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.bytes.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_bytes", &non_zero)
            .field("total_bytes", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur while creating memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("failed to allocate {size} bytes of machine memory")]
    AllocationFailed { size: usize },
}
