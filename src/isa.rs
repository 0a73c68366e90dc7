//! RV32I instruction word decoding.

mod instruction;

pub use instruction::{Instr, OpClass};
