// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! quark32: a cycle-level functional model of the FemtoRV32 "Quark" core.
//!
//! A single-issue, multi-cycle RV32I (+RDCYCLE) processor driven by a
//! four-state control machine over a flat, word-addressed memory bus. The
//! model is a deterministic pure state machine: one [`Quark::step`] call is
//! one clock edge, taking the sampled bus inputs and returning the bus
//! outputs that drive the next cycle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │      System (core + fabric)         │
//! ├─────────────────────────────────────┤
//! │  Quark: FSM + PC ── ALU/shifter     │
//! │         │ decode (isa) │ LSU │ CSR  │
//! ├─────────┴──────────────┴─────┴──────┤
//! │   Memory fabric (bus handshake)     │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use quark32::{CoreConfig, Memory, Quark, System};
//!
//! let core = Quark::new(CoreConfig::default()).unwrap();
//! let mut mem = Memory::new(0x1000);
//! // addi x1, x0, 5 ; jal x0, 0
//! mem.load_words(0, &[0x00500093, 0x0000006F]);
//!
//! let mut sys = System::new(core, mem);
//! sys.run(32);
//! assert_eq!(sys.core.reg(1), 5);
//! ```

pub mod cpu;
pub mod elf;
pub mod error;
pub mod isa;
pub mod mem;
pub mod system;

pub use cpu::{BusInput, BusOutput, CoreConfig, Quark, State};
pub use elf::{ElfLoadError, load_elf};
pub use error::{AccessWidth, ConfigError, SoftFault};
pub use isa::{Instr, OpClass};
pub use mem::Memory;
pub use system::System;
