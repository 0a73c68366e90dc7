//! Memory bus signal bundles.
//!
//! The core is the sole bus master. Inputs are sampled on each clock edge;
//! outputs are a pure function of the post-edge core state and drive the
//! fabric during the following cycle.

use serde::{Deserialize, Serialize};

/// Signals sampled by the core on a clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusInput {
    /// Read data; valid on the cycle `rbusy` transitions 1 → 0 and required
    /// to stay stable for at least one clock afterwards.
    pub rdata: u32,
    /// Read transaction not complete.
    pub rbusy: bool,
    /// Write transaction not complete.
    pub wbusy: bool,
    /// Active-high synchronous reset, sampled with the other inputs.
    pub reset: bool,
}

/// Signals driven by the core for the next cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusOutput {
    /// Byte address of the current request, masked to the configured
    /// address width.
    pub addr: u32,
    /// Store data.
    pub wdata: u32,
    /// Per-byte write enable; nonzero means a write cycle.
    pub wmask: u8,
    /// Read request strobe.
    pub rstrb: bool,
}

impl BusInput {
    /// An idle bus: no data, not busy, reset deasserted.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }
}
