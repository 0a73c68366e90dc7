//! Error types for the core model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Memory access width, for fault reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessWidth {
    /// 8-bit access (LB/LBU/SB).
    Byte,
    /// 16-bit access (LH/LHU/SH).
    Half,
    /// 32-bit access (LW/SW).
    Word,
}

/// Silent faults observed by the core.
///
/// None of these trap or alter control flow at this layer: an illegal
/// instruction retires as a NOP and an unaligned access goes through the
/// deterministic mask/slice tables. The core records the most recent fault
/// for diagnostics only. Trapping policy belongs to an external privilege
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoftFault {
    /// No instruction class matches bits 6:2 of the fetched word.
    IllegalInstruction(u32),
    /// Half/word load or store with nonzero low address bits.
    UnalignedAccess {
        /// The effective address of the access.
        addr: u32,
        /// The access width implied by funct3.
        width: AccessWidth,
    },
}

impl fmt::Display for SoftFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftFault::IllegalInstruction(word) => {
                write!(f, "illegal instruction: {word:#010x}")
            }
            SoftFault::UnalignedAccess { addr, width } => {
                write!(f, "unaligned {width:?} access at {addr:#010x}")
            }
        }
    }
}

impl std::error::Error for SoftFault {}

/// Construction-time configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `addr_width` outside the supported [12, 32] range.
    AddrWidthOutOfRange(u32),
    /// `reset_addr` with nonzero low two bits (the core does not implement C).
    MisalignedResetAddr(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::AddrWidthOutOfRange(width) => {
                write!(f, "addr_width {width} outside supported range [12, 32]")
            }
            ConfigError::MisalignedResetAddr(addr) => {
                write!(f, "reset_addr {addr:#010x} is not 4-byte aligned")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_fault_display() {
        let fault = SoftFault::IllegalInstruction(0xFFFF_FFFF);
        assert_eq!(format!("{fault}"), "illegal instruction: 0xffffffff");

        let fault = SoftFault::UnalignedAccess {
            addr: 0x101,
            width: AccessWidth::Word,
        };
        assert!(format!("{fault}").contains("0x00000101"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::AddrWidthOutOfRange(8);
        assert!(format!("{err}").contains('8'));
    }
}
