#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use quark32::{CoreConfig, Memory, Quark, System};

/// Structured input for whole-system fuzzing.
#[derive(Arbitrary, Debug)]
struct StepInput {
    /// Program words preloaded at address 0.
    words: Vec<u32>,
    /// Fabric read latency.
    read_latency: u8,
    /// Fabric write latency.
    write_latency: u8,
    /// Shifter mode.
    two_level: bool,
    /// Cycles to run.
    cycles: u16,
}

fuzz_target!(|input: StepInput| {
    // Cap inputs to keep individual runs fast
    let cycles = u32::from(input.cycles).min(4096);
    let words: Vec<u32> = input.words.iter().copied().take(64).collect();

    let core = match Quark::new(CoreConfig {
        reset_addr: 0,
        addr_width: 16,
        two_level_shifter: input.two_level,
    }) {
        Ok(core) => core,
        Err(_) => return,
    };

    let mut mem = Memory::with_latency(
        0x1000,
        u32::from(input.read_latency % 4),
        u32::from(input.write_latency % 4),
    );
    mem.load_words(0, &words);

    let mut sys = System::new(core, mem);
    let mut last_cycles = sys.core.cycles();

    for _ in 0..cycles {
        sys.clock();

        // x0 stays zero, PC stays even, the counter never stops.
        assert_eq!(sys.core.reg(0), 0);
        assert_eq!(sys.core.pc() & 1, 0);
        assert!(sys.core.cycles() > last_cycles);
        last_cycles = sys.core.cycles();
    }
});
