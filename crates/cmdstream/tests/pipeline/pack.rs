// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::*;

use cmdstream::errors::PipelineError;
use cmdstream::nopstrip::strip_nops_packed;
use cmdstream::pack::{pack_stream, SHORT_CALL_LIMIT};

#[test]
fn packing_never_grows_a_stream() {
    let mut stream = records(&[
        &[0x42],
        &[opcodes::WAIT_ONE],
        &[opcodes::CMD_PREFIX, CommandKind::FmTl as u8, 1, 2],
        &[opcodes::HINT_BASE + CommandKind::HintVolume as u8, 0x40],
    ]);
    stream.extend(jump_record(0));

    let dial = SpeedDial::default();
    let packed = pack_stream(&stream, &dial).unwrap();

    assert!(packed.len() <= stream.len());
    assert_eq!(packed.len(), 1 + 1 + 4 + 2 + 5);
}

#[test]
fn jump_addresses_are_remapped_to_packed_offsets() {
    // jump to the third record
    let mut stream = records(&[&[0x42], &[opcodes::WAIT_ONE], &[0x43]]);
    stream.extend(jump_record(16));

    let dial = SpeedDial::default();
    let packed = pack_stream(&stream, &dial).unwrap();

    assert_eq!(packed[0], 0x42);
    assert_eq!(packed[1], opcodes::WAIT_ONE);
    assert_eq!(packed[2], 0x43);
    assert_eq!(packed[3], opcodes::JUMP);
    assert_eq!(u32::from_le_bytes(packed[4..8].try_into().unwrap()), 2);
}

#[test]
fn nearby_calls_are_narrowed_with_fillers() {
    let mut stream = call_record(8);
    stream.extend(record(&[0x42]));
    stream.extend(record(&[opcodes::RETURN]));

    let dial = SpeedDial::default();
    let packed = pack_stream(&stream, &dial).unwrap();

    // the narrowed call keeps its 5-byte slot until the packed strip
    assert_eq!(
        packed,
        vec![
            opcodes::CALL_SHORT,
            5,
            0,
            opcodes::NOP,
            opcodes::NOP,
            0x42,
            opcodes::RETURN
        ]
    );

    let stripped = strip_nops_packed(&packed, &dial).unwrap();
    assert_eq!(
        stripped,
        vec![opcodes::CALL_SHORT, 3, 0, 0x42, opcodes::RETURN]
    );
}

#[test]
fn distant_calls_stay_long() {
    // enough rate records to push the target past the short-call limit
    let filler = 1 + (SHORT_CALL_LIMIT as usize / 5);

    let mut stream = Vec::new();
    let target = ((filler + 1) * RECORD_SIZE) as u32;
    stream.extend(call_record(target));
    for _ in 0..filler {
        stream.extend(record(&[opcodes::RATE, 60, 0, 1, 0]));
    }
    stream.extend(record(&[opcodes::RETURN]));

    let dial = SpeedDial::default();
    let packed = pack_stream(&stream, &dial).unwrap();

    assert_eq!(packed[0], opcodes::CALL_LONG);
    let addr = u32::from_le_bytes(packed[1..5].try_into().unwrap());
    assert_eq!(addr as usize, 5 + filler * 5);
    assert!(addr >= SHORT_CALL_LIMIT);
}

#[test]
fn short_call_in_the_input_is_an_error() {
    let stream = record(&[opcodes::CALL_SHORT, 8, 0]);

    assert_eq!(
        pack_stream(&stream, &SpeedDial::default()),
        Err(PipelineError::ShortCallBeforePack { pos: 0 })
    );
}

#[test]
fn unresolved_symbol_in_the_input_is_an_error() {
    let stream = record(&[opcodes::CALL_SYMBOL, 2, 0, 0, 0]);

    assert!(matches!(
        pack_stream(&stream, &SpeedDial::default()),
        Err(PipelineError::UnresolvedSymbol { id: 2, .. })
    ));
}

#[test]
fn speed_dial_records_pack_through_the_table() {
    let mut dial = SpeedDial::default();
    dial.cmds[2] = CommandKind::FmTl as u8;

    // a speed-dial alias record carrying FmTl's two operand bytes
    let stream = records(&[&[0xd2, 9, 8], &[opcodes::STOP]]);
    let packed = pack_stream(&stream, &dial).unwrap();

    assert_eq!(packed, vec![0xd2, 9, 8, opcodes::STOP]);
}
