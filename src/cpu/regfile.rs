//! Architectural register file.

use serde::{Deserialize, Serialize};

/// 32 × 32-bit register file.
///
/// Register x0 is hardwired to zero per the RISC-V specification: reads
/// return 0 without consulting storage and writes are silently dropped.
/// Two read ports and one write port; the core latches both operands on the
/// decode edge and writes back on later clock edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    /// General-purpose registers x0-x31.
    x: [u32; 32],
}

impl RegisterFile {
    /// Create a register file with all 32 slots zeroed.
    ///
    /// RISC-V only requires x0 to read zero, but reset zeroes everything for
    /// determinism.
    #[must_use]
    pub fn new() -> Self {
        RegisterFile { x: [0u32; 32] }
    }

    /// Read a register. x0 always returns 0.
    #[inline]
    #[must_use]
    pub fn read(&self, reg: u8) -> u32 {
        if reg == 0 { 0 } else { self.x[reg as usize] }
    }

    /// Write a register. Writes to x0 are ignored.
    #[inline]
    pub fn write(&mut self, reg: u8, value: u32) {
        if reg != 0 {
            self.x[reg as usize] = value;
        }
    }

    /// Zero every slot (reset behavior).
    pub fn reset(&mut self) {
        self.x = [0u32; 32];
    }

    /// View the whole file (for testing/debugging).
    #[must_use]
    pub fn registers(&self) -> &[u32; 32] {
        &self.x
    }

    /// Set the entire file (for testing/differential comparison).
    pub fn set_all(&mut self, regs: [u32; 32]) {
        self.x = regs;
        // Enforce x0 = 0 invariant
        self.x[0] = 0;
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
