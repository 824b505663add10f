// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::*;

use cmdstream::errors::PipelineError;
use cmdstream::nopstrip::{strip_nops_fixed, strip_nops_packed};

#[test]
fn stripping_a_clean_stream_is_identity() {
    let stream = records(&[
        &[0x42],
        &[opcodes::WAIT_ONE],
        &[opcodes::CMD_PREFIX, CommandKind::FmTl as u8, 1, 2],
    ]);
    let mut stream = stream;
    stream.extend(jump_record(8));

    let stripped = strip_nops_fixed(&stream).unwrap();
    assert_eq!(stripped, stream);
}

#[test]
fn nops_are_removed_and_jumps_relocated() {
    let mut stream = records(&[&[0x42], &[opcodes::NOP], &[0x43]]);
    stream.extend(jump_record(16));

    let stripped = strip_nops_fixed(&stream).unwrap();
    assert_eq!(stripped.len(), 3 * RECORD_SIZE);
    assert_eq!(stripped[0], 0x42);
    assert_eq!(stripped[RECORD_SIZE], 0x43);

    let addr = u32::from_le_bytes(stripped[17..21].try_into().unwrap());
    assert_eq!(addr, 8);
}

#[test]
fn jump_into_a_nop_slot_is_an_error() {
    let mut stream = records(&[&[0x42], &[opcodes::NOP]]);
    stream.extend(jump_record(8));

    assert_eq!(
        strip_nops_fixed(&stream),
        Err(PipelineError::NopTarget { addr: 8, pos: 16 })
    );
}

#[test]
fn jump_out_of_bounds_is_an_error() {
    let stream = jump_record(0x100);

    assert_eq!(
        strip_nops_fixed(&stream),
        Err(PipelineError::OutOfRangeAddress {
            addr: 0x100,
            len: 8
        })
    );
}

#[test]
fn call_by_symbol_ids_are_not_remapped() {
    let mut stream = records(&[&[opcodes::NOP]]);
    stream.extend(record(&[opcodes::CALL_SYMBOL, 3, 0, 0, 0]));

    let stripped = strip_nops_fixed(&stream).unwrap();
    assert_eq!(stripped, record(&[opcodes::CALL_SYMBOL, 3, 0, 0, 0]));
}

#[test]
fn unaligned_stream_is_an_error() {
    assert!(matches!(
        strip_nops_fixed(&[opcodes::NOP, 0, 0]),
        Err(PipelineError::UnalignedStream { len: 3 })
    ));
}

// Packed form
// ===========

#[test]
fn packed_strip_removes_call_narrowing_fillers() {
    let dial = SpeedDial::default();

    // call 0xf8 -> offset 7 (the wait), two fillers, a note, a wait
    let stream = vec![
        opcodes::CALL_SHORT,
        7,
        0,
        opcodes::NOP,
        opcodes::NOP,
        0x42,
        0x43,
        opcodes::WAIT_ONE,
    ];

    let stripped = strip_nops_packed(&stream, &dial).unwrap();
    assert_eq!(
        stripped,
        vec![opcodes::CALL_SHORT, 5, 0, 0x42, 0x43, opcodes::WAIT_ONE]
    );
}

/// Pins the lenient contract: an unmappable address in the packed form is
/// left unrewritten instead of failing the pass.
#[test]
fn packed_strip_keeps_unmappable_addresses() {
    let dial = SpeedDial::default();

    // the call targets the middle of the wait-short instruction
    let stream = vec![
        opcodes::CALL_SHORT,
        6,
        0,
        opcodes::NOP,
        opcodes::NOP,
        opcodes::WAIT_SHORT,
        30,
    ];

    let stripped = strip_nops_packed(&stream, &dial).unwrap();
    assert_eq!(
        stripped,
        vec![opcodes::CALL_SHORT, 6, 0, opcodes::WAIT_SHORT, 30]
    );
}

#[test]
fn packed_strip_rejects_unknown_opcodes() {
    let dial = SpeedDial::default();

    assert!(matches!(
        strip_nops_packed(&[0xf2], &dial),
        Err(PipelineError::LengthUndeterminable { opcode: 0xf2, .. })
    ));
}

#[test]
fn packed_strip_needs_the_speed_dial_table() {
    // 0xd0 alias without a populated table
    let dial = SpeedDial::default();
    assert!(matches!(
        strip_nops_packed(&[0xd0, 1], &dial),
        Err(PipelineError::LengthUndeterminable { opcode: 0xd0, .. })
    ));

    let mut dial = SpeedDial::default();
    dial.cmds[0] = CommandKind::WaveTable as u8;
    assert_eq!(
        strip_nops_packed(&[0xd0, 1], &dial).unwrap(),
        vec![0xd0, 1]
    );
}
