//! The Quark core: a single-issue, multi-cycle RV32I state machine.
//!
//! One [`Quark::step`] call models one rising clock edge. All derived
//! signals (decode, immediates, ALU, branch predicate, load/store align,
//! writeback selection) are computed from the pre-edge architectural state
//! plus the sampled bus inputs; the clocked update then applies atomically:
//! cycle counter, shifter substep, register writeback, PC, state. The
//! returned bus outputs are a pure function of the post-edge state and drive
//! the fabric for the following cycle, so core and memory compose without a
//! combinational loop.
//!
//! ```text
//!  reset ──► WAIT_ALU_OR_MEM ──► FETCH_INSTR ──► WAIT_INSTR ──► EXECUTE
//!                 ▲    (idle & bus ready)           (!rbusy)       │
//!                 └────────────── (load/store/shift) ◄─────────────┘
//!                                        else ──► FETCH_INSTR
//! ```
//!
//! The sign-loss casts below are intentional: immediates are sign-extended
//! i32 values folded into 32-bit wrapping address/data arithmetic.

#![allow(clippy::cast_sign_loss)]

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::cpu::alu::{self, Alu};
use crate::cpu::bus::{BusInput, BusOutput};
use crate::cpu::csr::Csr;
use crate::cpu::lsu;
use crate::cpu::regfile::RegisterFile;
use crate::error::{ConfigError, SoftFault};
use crate::isa::{Instr, OpClass};

/// Control FSM states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// Drive `rstrb` with PC on the bus.
    FetchInstr,
    /// Hold until the fabric returns the instruction word.
    WaitInstr,
    /// Retire the latched instruction: writeback, PC update, bus requests.
    Execute,
    /// Hold until the shifter and the fabric are both idle.
    WaitAluOrMem,
}

/// Construction-time core configuration, immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// PC value out of reset.
    pub reset_addr: u32,
    /// Number of low-order address bits driven on the bus, in [12, 32].
    pub addr_width: u32,
    /// Advance the shifter 4 bits per cycle while at least 4 remain.
    pub two_level_shifter: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            reset_addr: 0,
            addr_width: 24,
            two_level_shifter: false,
        }
    }
}

/// Derived per-cycle signals, all functions of pre-edge state + bus inputs.
struct Signals {
    class: OpClass,
    alu_busy: bool,
    need_to_wait: bool,
    write_back: bool,
    write_back_data: u32,
    latch_shift: bool,
    alu_in1: u32,
    alu_in2: u32,
    jalr_target: u32,
    take_jump: bool,
    ea: u32,
}

/// Cycle-level model of the FemtoRV32 Quark core.
///
/// All architectural state lives here; the memory/IO fabric is an external
/// collaborator reached only through [`BusInput`]/[`BusOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quark {
    config: CoreConfig,
    state: State,
    pc: u32,
    regs: RegisterFile,
    csr: Csr,
    alu: Alu,
    /// Last fetched instruction word, stable from capture through EXECUTE
    /// and any wait cycles.
    instr: Instr,
    /// Source operands, latched with the instruction so wait-cycle
    /// writebacks cannot disturb an in-flight effective address.
    rs1_val: u32,
    rs2_val: u32,
    last_fault: Option<SoftFault>,
}

impl Quark {
    /// Create a core in its reset state.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `addr_width` is outside [12, 32] or
    /// `reset_addr` is not 4-byte aligned.
    pub fn new(config: CoreConfig) -> Result<Self, ConfigError> {
        if !(12..=32).contains(&config.addr_width) {
            return Err(ConfigError::AddrWidthOutOfRange(config.addr_width));
        }
        if config.reset_addr & 3 != 0 {
            return Err(ConfigError::MisalignedResetAddr(config.reset_addr));
        }
        Ok(Quark {
            config,
            state: State::WaitAluOrMem,
            pc: config.reset_addr,
            regs: RegisterFile::new(),
            csr: Csr::new(),
            alu: Alu::new(config.two_level_shifter),
            instr: Instr::new(0),
            rs1_val: 0,
            rs2_val: 0,
            last_fault: None,
        })
    }

    /// Return to the reset state (also reached by asserting
    /// [`BusInput::reset`] for a cycle).
    pub fn reset(&mut self) {
        self.state = State::WaitAluOrMem;
        self.pc = self.config.reset_addr;
        self.regs.reset();
        self.csr.reset();
        self.alu.reset();
        self.instr = Instr::new(0);
        self.rs1_val = 0;
        self.rs2_val = 0;
        self.last_fault = None;
    }

    /// Advance the core by one clock edge.
    pub fn step(&mut self, input: BusInput) -> BusOutput {
        if input.reset {
            self.reset();
            return self.drive_bus();
        }

        self.csr.tick();
        let sig = self.derive(&input);

        // Shifter substep: latch on the EXECUTE edge of a shift, advance
        // otherwise. Runs every clock, independent of the FSM.
        if sig.latch_shift {
            self.alu.latch(sig.alu_in1, sig.alu_in2);
        } else {
            self.alu.advance(self.instr.funct3(), self.instr.bit30());
        }

        // Writeback. Repeats on every wait cycle; the last write wins once
        // the data source settles.
        if sig.write_back {
            self.regs.write(self.instr.rd(), sig.write_back_data);
        }

        // PC update and fault bookkeeping, only on the edge leaving EXECUTE.
        if self.state == State::Execute {
            self.observe_faults(&sig);
            self.pc = if sig.class == OpClass::Jalr {
                trace!("jalr to {:#010x}", sig.jalr_target);
                sig.jalr_target
            } else if sig.take_jump {
                let imm = if sig.class == OpClass::Jal {
                    self.instr.imm_j()
                } else {
                    self.instr.imm_b()
                };
                self.pc.wrapping_add(imm as u32)
            } else {
                self.pc.wrapping_add(4)
            };
        }

        // State transition, from pre-edge observations.
        self.state = match self.state {
            State::FetchInstr => State::WaitInstr,
            State::WaitInstr => {
                if input.rbusy {
                    State::WaitInstr
                } else {
                    self.instr = Instr::new(input.rdata);
                    self.rs1_val = self.regs.read(self.instr.rs1());
                    self.rs2_val = self.regs.read(self.instr.rs2());
                    State::Execute
                }
            }
            State::Execute => {
                if sig.need_to_wait {
                    State::WaitAluOrMem
                } else {
                    State::FetchInstr
                }
            }
            State::WaitAluOrMem => {
                if !sig.alu_busy && !input.rbusy && !input.wbusy {
                    State::FetchInstr
                } else {
                    State::WaitAluOrMem
                }
            }
        };

        self.drive_bus()
    }

    /// Evaluate every derived signal from pre-edge state and bus inputs.
    fn derive(&self, input: &BusInput) -> Signals {
        let instr = self.instr;
        let class = instr.class();
        let funct3 = instr.funct3();

        let alu_in1 = self.rs1_val;
        let alu_in2 = if matches!(class, OpClass::AluReg | OpClass::Branch) {
            self.rs2_val
        } else {
            instr.imm_i() as u32
        };
        let comb = self.alu.eval(
            alu_in1,
            alu_in2,
            funct3,
            instr.bit30(),
            class == OpClass::AluReg,
        );
        let is_shift = class.is_alu() && alu::funct3_is_shift(funct3);

        let predicate = match funct3 {
            0b000 => comb.eq,
            0b001 => !comb.eq,
            0b100 => comb.lt,
            0b101 => !comb.lt,
            0b110 => comb.ltu,
            0b111 => !comb.ltu,
            _ => false,
        };

        let offset = if class == OpClass::Store {
            instr.imm_s()
        } else {
            instr.imm_i()
        };
        let ea = self.rs1_val.wrapping_add(offset as u32);

        let write_back = !matches!(class, OpClass::Branch | OpClass::Store)
            && matches!(self.state, State::Execute | State::WaitAluOrMem);
        let write_back_data = match class {
            OpClass::Lui => instr.imm_u() as u32,
            OpClass::Auipc => self.pc.wrapping_add(instr.imm_u() as u32),
            OpClass::Jal | OpClass::Jalr => self.pc.wrapping_add(4),
            OpClass::Load => lsu::load_value(funct3, ea, input.rdata),
            OpClass::AluImm | OpClass::AluReg => comb.out,
            OpClass::System => self.csr.read(instr.csr()),
            OpClass::Store | OpClass::Branch | OpClass::Illegal => 0,
        };

        Signals {
            class,
            alu_busy: self.alu.busy(),
            need_to_wait: matches!(class, OpClass::Load | OpClass::Store) || is_shift,
            write_back,
            write_back_data,
            latch_shift: self.state == State::Execute && is_shift,
            alu_in1,
            alu_in2,
            jalr_target: comb.plus & !1,
            take_jump: class == OpClass::Jal || (class == OpClass::Branch && predicate),
            ea,
        }
    }

    /// Record silent faults for the instruction leaving EXECUTE.
    fn observe_faults(&mut self, sig: &Signals) {
        if sig.class == OpClass::Illegal {
            let fault = SoftFault::IllegalInstruction(self.instr.word());
            debug!("{fault}, retiring as nop at pc {:#010x}", self.pc);
            self.last_fault = Some(fault);
        } else if matches!(sig.class, OpClass::Load | OpClass::Store) {
            if let Some(fault) = lsu::check_alignment(self.instr.funct3(), sig.ea) {
                debug!("{fault} at pc {:#010x}", self.pc);
                self.last_fault = Some(fault);
            }
        }
    }

    /// Bus outputs for the cycle following this edge.
    fn drive_bus(&self) -> BusOutput {
        let class = self.instr.class();
        let is_mem = matches!(class, OpClass::Load | OpClass::Store);
        let offset = if class == OpClass::Store {
            self.instr.imm_s()
        } else {
            self.instr.imm_i()
        };
        let ea = self.rs1_val.wrapping_add(offset as u32);

        let addr = match self.state {
            State::FetchInstr | State::WaitInstr => self.pc,
            State::Execute if !is_mem => self.pc,
            _ => ea,
        };

        BusOutput {
            addr: addr & self.addr_mask(),
            wdata: self.rs2_val,
            wmask: if self.state == State::Execute && class == OpClass::Store {
                lsu::store_mask(self.instr.funct3(), ea)
            } else {
                0
            },
            rstrb: self.state == State::FetchInstr
                || (self.state == State::Execute && class == OpClass::Load),
        }
    }

    fn addr_mask(&self) -> u32 {
        if self.config.addr_width == 32 {
            u32::MAX
        } else {
            (1 << self.config.addr_width) - 1
        }
    }

    /// The configuration this core was built with.
    #[must_use]
    pub fn config(&self) -> CoreConfig {
        self.config
    }

    /// Current FSM state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Current program counter.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Low 32 bits of the free-running cycle counter.
    #[must_use]
    pub fn cycles(&self) -> u32 {
        self.csr.cycles()
    }

    /// Read an architectural register.
    #[must_use]
    pub fn reg(&self, index: u8) -> u32 {
        self.regs.read(index)
    }

    /// View the whole register file.
    #[must_use]
    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Set the entire register file (for testing/differential comparison).
    pub fn set_registers(&mut self, regs: [u32; 32]) {
        self.regs.set_all(regs);
    }

    /// True while a multi-cycle shift is in flight.
    #[must_use]
    pub fn alu_busy(&self) -> bool {
        self.alu.busy()
    }

    /// The most recent silent fault, if any. Never affects control flow.
    #[must_use]
    pub fn last_fault(&self) -> Option<SoftFault> {
        self.last_fault
    }
}
