//! Word-addressed memory fabric implementing the bus handshake.
//!
//! A test collaborator for the core: flat RAM with a per-byte write mask and
//! configurable read/write completion latency. The fabric decodes only the
//! low address bits, mirroring the RAM across the address space the way
//! small SoC fabrics do. `rdata` stays stable from the cycle a read
//! completes until the next read completes, satisfying the bus contract.
//!
//! The truncation warnings are allowed because this is a 32-bit fabric that
//! reduces addresses modulo its size by construction.

#![allow(clippy::cast_possible_truncation)]

use serde::{Deserialize, Serialize};

use crate::cpu::bus::{BusInput, BusOutput};

/// RAM fabric with configurable completion latency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Backing storage, one u32 per bus word.
    words: Vec<u32>,
    /// Cycles between a read strobe and data-valid (0 = zero wait state).
    read_latency: u32,
    /// Cycles a write holds `wbusy` after the data is captured.
    write_latency: u32,
    /// In-flight read: captured address and cycles left.
    pending_read: Option<(u32, u32)>,
    rdata: u32,
    wbusy_left: u32,
}

impl Memory {
    /// Create a zero-wait-state RAM of `size_bytes` (rounded up to a word).
    #[must_use]
    pub fn new(size_bytes: u32) -> Self {
        Self::with_latency(size_bytes, 0, 0)
    }

    /// Create a RAM that completes reads and writes after the given number
    /// of cycles. Latencies 0 and 1 are indistinguishable to the core (the
    /// FSM has one cycle of slack between strobe and sample).
    #[must_use]
    pub fn with_latency(size_bytes: u32, read_latency: u32, write_latency: u32) -> Self {
        let words = size_bytes.div_ceil(4).max(1);
        Memory {
            words: vec![0u32; words as usize],
            read_latency,
            write_latency,
            pending_read: None,
            rdata: 0,
            wbusy_left: 0,
        }
    }

    /// Size of the backing storage in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.words.len() as u32 * 4
    }

    fn index(&self, addr: u32) -> usize {
        (addr as usize >> 2) % self.words.len()
    }

    /// Read the word containing `addr` (low two address bits ignored).
    #[must_use]
    pub fn read_word(&self, addr: u32) -> u32 {
        self.words[self.index(addr)]
    }

    /// Overwrite the word containing `addr`.
    pub fn write_word(&mut self, addr: u32, value: u32) {
        let index = self.index(addr);
        self.words[index] = value;
    }

    /// Write `value` under a per-byte enable mask, as a store cycle does.
    pub fn write_masked(&mut self, addr: u32, value: u32, mask: u8) {
        let index = self.index(addr);
        let mut bytes = self.words[index].to_le_bytes();
        let new = value.to_le_bytes();
        for i in 0..4 {
            if mask & (1 << i) != 0 {
                bytes[i] = new[i];
            }
        }
        self.words[index] = u32::from_le_bytes(bytes);
    }

    /// Preload consecutive words starting at `addr` (program images).
    pub fn load_words(&mut self, addr: u32, words: &[u32]) {
        for (i, &word) in words.iter().enumerate() {
            self.write_word(addr.wrapping_add(i as u32 * 4), word);
        }
    }

    /// Store a byte slice starting at `addr`, little-endian within words.
    pub fn store_bytes(&mut self, addr: u32, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            let byte_addr = addr.wrapping_add(i as u32);
            let index = self.index(byte_addr);
            let shift = (byte_addr & 3) * 8;
            let word = self.words[index] & !(0xFF << shift);
            self.words[index] = word | (u32::from(byte) << shift);
        }
    }

    /// Process one cycle of bus activity and produce the core's next inputs.
    ///
    /// Writes capture their data on the cycle the mask is driven; `wbusy`
    /// then holds for the configured latency. Reads complete `read_latency`
    /// cycles after the strobe, holding `rbusy` until the data is valid.
    pub fn respond(&mut self, out: &BusOutput) -> BusInput {
        if out.wmask != 0 {
            self.write_masked(out.addr, out.wdata, out.wmask);
            self.wbusy_left = self.write_latency;
        } else if self.wbusy_left > 0 {
            self.wbusy_left -= 1;
        }

        if out.rstrb {
            if self.read_latency == 0 {
                self.rdata = self.read_word(out.addr);
                self.pending_read = None;
            } else {
                self.pending_read = Some((out.addr, self.read_latency));
            }
        } else if let Some((addr, left)) = self.pending_read {
            if left <= 1 {
                self.rdata = self.read_word(addr);
                self.pending_read = None;
            } else {
                self.pending_read = Some((addr, left - 1));
            }
        }

        BusInput {
            rdata: self.rdata,
            rbusy: self.pending_read.is_some(),
            wbusy: self.wbusy_left > 0,
            reset: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_read_write() {
        let mut mem = Memory::new(256);
        mem.write_word(0x10, 0x1234_5678);
        assert_eq!(mem.read_word(0x10), 0x1234_5678);
        // Low two address bits are ignored
        assert_eq!(mem.read_word(0x12), 0x1234_5678);
    }

    #[test]
    fn test_masked_write() {
        let mut mem = Memory::new(64);
        mem.write_word(0, 0xAAAA_AAAA);
        mem.write_masked(0, 0x1234_5678, 0b0011);
        assert_eq!(mem.read_word(0), 0xAAAA_5678);
        mem.write_masked(0, 0x1234_5678, 0b1000);
        assert_eq!(mem.read_word(0), 0x12AA_5678);
    }

    #[test]
    fn test_store_bytes_little_endian() {
        let mut mem = Memory::new(64);
        mem.store_bytes(0, &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(mem.read_word(0), 0x1234_5678);
        // Unaligned byte runs span words
        mem.store_bytes(2, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(mem.read_word(0), 0xBBAA_5678);
        assert_eq!(mem.read_word(4) & 0xFF, 0xCC);
    }

    #[test]
    fn test_address_mirroring() {
        let mut mem = Memory::new(64);
        mem.write_word(0, 0xDEAD_BEEF);
        assert_eq!(mem.read_word(64), 0xDEAD_BEEF);
    }

    #[test]
    fn test_zero_wait_read() {
        let mut mem = Memory::new(64);
        mem.write_word(8, 42);
        let input = mem.respond(&BusOutput {
            addr: 8,
            rstrb: true,
            ..BusOutput::default()
        });
        assert!(!input.rbusy);
        assert_eq!(input.rdata, 42);
    }

    #[test]
    fn test_latent_read_holds_rbusy() {
        let mut mem = Memory::with_latency(64, 2, 0);
        mem.write_word(8, 42);
        let strobe = BusOutput {
            addr: 8,
            rstrb: true,
            ..BusOutput::default()
        };
        let idle = BusOutput::default();

        assert!(mem.respond(&strobe).rbusy);
        assert!(mem.respond(&idle).rbusy);
        let done = mem.respond(&idle);
        assert!(!done.rbusy);
        assert_eq!(done.rdata, 42);

        // Data stays stable after completion
        assert_eq!(mem.respond(&idle).rdata, 42);
    }

    #[test]
    fn test_write_capture_and_wbusy() {
        let mut mem = Memory::with_latency(64, 0, 2);
        let store = BusOutput {
            addr: 16,
            wdata: 0xCAFE_F00D,
            wmask: 0b1111,
            ..BusOutput::default()
        };
        let idle = BusOutput::default();

        let input = mem.respond(&store);
        // Data lands immediately; completion is what lags.
        assert_eq!(mem.read_word(16), 0xCAFE_F00D);
        assert!(input.wbusy);
        assert!(mem.respond(&idle).wbusy);
        assert!(!mem.respond(&idle).wbusy);
    }
}
