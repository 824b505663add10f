#![no_main]

use libfuzzer_sys::fuzz_target;

use cmdstream::command::CommandKind;
use cmdstream::nopstrip::{strip_nops_fixed, strip_nops_packed};
use cmdstream::opcode::SpeedDial;
use cmdstream::reloc::relocate_packed;

fuzz_target!(|data: &[u8]| {
    let mut dial = SpeedDial::default();
    for (i, slot) in dial.cmds.iter_mut().enumerate() {
        *slot = CommandKind::ALL[i % CommandKind::ALL.len()] as u8;
    }
    dial.delays = [1, 2, 3, 4, 5, 6, 8, 10, 12, 16, 20, 24, 32, 48, 64, 96];

    // Walkers must reject malformed streams with an error, never panic.
    let _ = strip_nops_fixed(data);
    let _ = strip_nops_packed(data, &dial);

    let mut buf = data.to_vec();
    let _ = relocate_packed(&mut buf, 0, 0x40, &dial);
});
