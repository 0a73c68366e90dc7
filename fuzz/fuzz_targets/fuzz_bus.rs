#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use quark32::{BusInput, CoreConfig, Quark};

/// One cycle of raw bus behavior, contract violations included.
#[derive(Arbitrary, Debug, Clone, Copy)]
struct BusCycle {
    rdata: u32,
    rbusy: bool,
    wbusy: bool,
    reset: bool,
}

fuzz_target!(|cycles: Vec<BusCycle>| {
    // A hostile fabric: data changes under the core, busy lines glitch,
    // reset pulses at random. The core must never panic and must hold its
    // hard invariants regardless.
    let Ok(mut core) = Quark::new(CoreConfig::default()) else {
        return;
    };

    for cycle in cycles.iter().take(4096) {
        let out = core.step(BusInput {
            rdata: cycle.rdata,
            rbusy: cycle.rbusy,
            wbusy: cycle.wbusy,
            reset: cycle.reset,
        });

        assert_eq!(core.reg(0), 0);
        assert_eq!(core.pc() & 1, 0);
        // Write and read strobes never overlap on this bus.
        assert!(!(out.rstrb && out.wmask != 0));
    }
});
