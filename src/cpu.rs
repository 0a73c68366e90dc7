//! Cycle-level core: register file, ALU, load/store aligner, CSRs, control FSM.

pub mod alu;
pub mod bus;
pub mod csr;
pub mod lsu;
pub mod quark;
pub mod regfile;

pub use alu::Alu;
pub use bus::{BusInput, BusOutput};
pub use csr::Csr;
pub use quark::{CoreConfig, Quark, State};
pub use regfile::RegisterFile;
