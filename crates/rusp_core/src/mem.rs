//! # Local store
//!
//! The unit's two private 4 KiB memories, instruction and data. They are not
//! part of the host's address space; the host fills them before starting a
//! task and may read them back afterwards.
//!
//! The unit sees both banks big-endian, but each 32-bit word is stored in
//! native order so that aligned word accesses are single reads. That means a
//! byte of the big-endian stream at address `a` lives at index `a ^ 3`, and a
//! halfword at index `a - 2 * ((a & 3) - 1)` as long as it doesn't straddle
//! its containing word. Accesses that do straddle a word (or the end of the
//! bank) are split into independently masked smaller accesses, so every
//! address is valid and nothing ever faults.

use thiserror::Error;

/// Size of each bank in bytes.
pub const BANK_SIZE: usize = 4096;

/// Mask applied to every address before use.
const ADDR_MASK: u32 = 0xfff;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} bytes at offset {1:#x} overruns the 4 KiB bank")]
    Overrun(usize, usize),
}

/// One 4 KiB byte-addressable memory bank.
pub struct Bank {
    data: Box<[u8; BANK_SIZE]>,
}

impl Bank {
    pub fn new() -> Self {
        Self { data: Box::new([0x0; BANK_SIZE]) }
    }

    /// Copy a big-endian byte stream into the bank, as the host does when
    /// handing the unit a microcode task.
    pub fn copy_from(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError> {
        if offset + bytes.len() > BANK_SIZE {
            return Err(StoreError::Overrun(bytes.len(), offset));
        }
        for (i, byte) in bytes.iter().enumerate() {
            self.data[(offset + i) ^ 3] = *byte;
        }
        Ok(())
    }

    /// Index of the byte at big-endian address `addr`.
    fn flip(addr: u32) -> usize {
        ((addr & ADDR_MASK) ^ 3) as usize
    }

    /// Index of the first storage byte of the halfword at `addr`. Only valid
    /// when the halfword doesn't straddle its containing word.
    fn pair(addr: u32) -> usize {
        let addr = (addr & ADDR_MASK) as i32;
        (addr - 2 * ((addr & 3) - 1)) as usize
    }

    pub fn load_byte(&self, addr: u32) -> u8 {
        self.data[Self::flip(addr)]
    }

    pub fn store_byte(&mut self, addr: u32, val: u8) {
        self.data[Self::flip(addr)] = val;
    }

    pub fn load_half(&self, addr: u32) -> u16 {
        let addr = addr & ADDR_MASK;
        if addr % 4 == 3 {
            // Straddles the word boundary. The two bytes are fetched
            // individually since the second one may wrap around the bank.
            let hi = self.load_byte(addr);
            let lo = self.load_byte(addr.wrapping_add(1) & ADDR_MASK);
            u16::from(hi) << 8 | u16::from(lo)
        } else {
            let idx = Self::pair(addr);
            u16::from(self.data[idx]) | u16::from(self.data[idx + 1]) << 8
        }
    }

    pub fn store_half(&mut self, addr: u32, val: u16) {
        let addr = addr & ADDR_MASK;
        if addr % 4 == 3 {
            self.store_byte(addr, (val >> 8) as u8);
            self.store_byte(addr.wrapping_add(1) & ADDR_MASK, val as u8);
        } else {
            let idx = Self::pair(addr);
            self.data[idx] = val as u8;
            self.data[idx + 1] = (val >> 8) as u8;
        }
    }

    pub fn load_word(&self, addr: u32) -> u32 {
        let addr = addr & ADDR_MASK;
        if addr % 4 == 0 {
            let idx = addr as usize;
            (0..4).fold(0, |val, byte| {
                val | u32::from(self.data[idx + byte]) << (8 * byte)
            })
        } else {
            // Misaligned words decompose into two halfword accesses, which
            // in turn handle any word straddle of their own.
            let hi = self.load_half(addr);
            let lo = self.load_half(addr.wrapping_add(2) & ADDR_MASK);
            u32::from(hi) << 16 | u32::from(lo)
        }
    }

    pub fn store_word(&mut self, addr: u32, val: u32) {
        let addr = addr & ADDR_MASK;
        if addr % 4 == 0 {
            let idx = addr as usize;
            for byte in 0..4 {
                self.data[idx + byte] = (val >> (8 * byte)) as u8;
            }
        } else {
            self.store_half(addr, (val >> 16) as u16);
            self.store_half(addr.wrapping_add(2) & ADDR_MASK, val as u16);
        }
    }
}

/// The instruction and data banks together.
pub struct LocalStore {
    pub imem: Bank,
    pub dmem: Bank,
}

impl LocalStore {
    pub fn new() -> Self {
        Self { imem: Bank::new(), dmem: Bank::new() }
    }
}
