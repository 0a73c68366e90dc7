//! Core + fabric harness.

use serde::{Deserialize, Serialize};

use crate::cpu::bus::{BusInput, BusOutput};
use crate::cpu::quark::Quark;
use crate::mem::Memory;

/// One core wired to one memory fabric.
///
/// `clock()` runs a full cycle: the core samples the latched bus inputs and
/// takes its clock edge, then the fabric processes the resulting outputs and
/// produces the inputs for the next cycle. The whole system state (core,
/// RAM, latched bus) serializes, so a simulation can be snapshotted and
/// resumed bit-exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    /// The core under simulation.
    pub core: Quark,
    /// The memory fabric.
    pub mem: Memory,
    bus: BusInput,
}

impl System {
    /// Wire a core to a fabric. The first clock samples an idle bus.
    #[must_use]
    pub fn new(core: Quark, mem: Memory) -> Self {
        System {
            core,
            mem,
            bus: BusInput::idle(),
        }
    }

    /// Run one clock cycle; returns the bus outputs the core drove.
    pub fn clock(&mut self) -> BusOutput {
        let out = self.core.step(self.bus);
        self.bus = self.mem.respond(&out);
        out
    }

    /// Run `cycles` clock cycles.
    pub fn run(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock();
        }
    }

    /// Assert reset for one cycle. RAM contents survive; an in-flight fabric
    /// transaction drains on its own schedule and the core waits it out.
    pub fn reset(&mut self) {
        let out = self.core.step(BusInput {
            reset: true,
            ..self.bus
        });
        self.bus = self.mem.respond(&out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::quark::{CoreConfig, State};

    fn system(words: &[u32]) -> System {
        let core = Quark::new(CoreConfig::default()).unwrap();
        let mut mem = Memory::new(0x1000);
        mem.load_words(0, words);
        System::new(core, mem)
    }

    #[test]
    fn test_single_instruction_runs() {
        // addi x1, x0, 5; jal x0, 0
        let mut sys = system(&[0x00500093, 0x0000006F]);
        sys.run(32);
        assert_eq!(sys.core.reg(1), 5);
        assert_eq!(sys.core.pc(), 4);
    }

    #[test]
    fn test_reset_restarts_program() {
        let mut sys = system(&[0x00500093, 0x0000006F]);
        sys.run(32);
        assert_eq!(sys.core.reg(1), 5);

        sys.reset();
        assert_eq!(sys.core.state(), State::WaitAluOrMem);
        assert_eq!(sys.core.reg(1), 0);
        assert_eq!(sys.core.cycles(), 0);

        sys.run(32);
        assert_eq!(sys.core.reg(1), 5);
    }
}
